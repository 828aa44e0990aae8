// tests/watch_bindings.rs

mod common;
use crate::common::write_file;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use sitedag::config::{ConfigFile, WatchBindingConfig};
use sitedag::dag::TaskRegistry;
use sitedag::engine::Runner;
use sitedag::fs::mock::MockFileSystem;
use sitedag::fs::{FileSystem, RealFileSystem};
use sitedag::watch::{
    BindingProfile, HashStore, MemoryHashStore, WatchTrigger, build_binding_profiles,
    dispatch_trigger, process_file_change, spawn_dispatcher, spawn_watcher,
};
use sitedag_test_utils::builders::ConfigFileBuilder;
use sitedag_test_utils::recording::{ActionLog, failing_action, recording_action};
use sitedag_test_utils::{init_tracing, with_timeout};

fn default_profiles() -> Vec<BindingProfile> {
    build_binding_profiles(ConfigFile::default().watch_bindings()).unwrap()
}

fn new_store() -> Arc<Mutex<Box<dyn HashStore>>> {
    Arc::new(Mutex::new(Box::new(MemoryHashStore::new())))
}

/// Feed one changed path through the event handler and collect triggers.
async fn triggers_for(
    fs: &MockFileSystem,
    profiles: &[BindingProfile],
    store: Arc<Mutex<Box<dyn HashStore>>>,
    rel: &str,
) -> Vec<WatchTrigger> {
    let (tx, mut rx) = mpsc::channel(16);
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    let root = Path::new("/site");

    process_file_change(fs, root, &root.join(rel), profiles, &tx, store).await;
    drop(tx);

    let mut out = Vec::new();
    while let Some(trigger) = rx.recv().await {
        out.push(trigger);
    }
    out
}

#[tokio::test]
async fn top_level_stylesheet_triggers_two_independent_bindings() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/site/src/main.scss", "a { b: c; }");

    let triggers = triggers_for(&fs, &default_profiles(), new_store(), "src/main.scss").await;

    let globs: Vec<_> = triggers.iter().map(|t| t.glob.as_str()).collect();
    assert_eq!(globs, vec!["src/*.scss", "src/**/*.scss"]);
    assert!(triggers.iter().all(|t| t.tasks == vec!["sass:watch".to_string()]));
    assert!(triggers.iter().all(|t| t.path == "src/main.scss"));
}

#[tokio::test]
async fn nested_template_triggers_once() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/site/src/bio/ada.jade", "x");

    let triggers = triggers_for(&fs, &default_profiles(), new_store(), "src/bio/ada.jade").await;

    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].tasks, vec!["jade:watch".to_string()]);
}

#[tokio::test]
async fn excluded_and_foreign_paths_do_not_trigger_assets() {
    init_tracing();
    let fs = MockFileSystem::new();
    let profiles = default_profiles();

    let image = triggers_for(&fs, &profiles, new_store(), "src/assets/logo.png").await;
    assert_eq!(image.len(), 1);
    assert_eq!(image[0].tasks, vec!["assets".to_string()]);

    let sheet = triggers_for(&fs, &profiles, new_store(), "src/assets/x.scss").await;
    assert!(sheet.iter().all(|t| t.tasks != vec!["assets".to_string()]));

    let output = triggers_for(&fs, &profiles, new_store(), "build/main.css").await;
    assert!(output.is_empty());
}

#[tokio::test]
async fn use_hash_binding_skips_unchanged_content() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/site/src/notes.txt", "v1");
    let mut binding = WatchBindingConfig::new("src/*.txt", &["assets"]);
    binding.use_hash = true;
    let profiles = build_binding_profiles(&[binding]).unwrap();
    let store = new_store();

    let first = triggers_for(&fs, &profiles, store.clone(), "src/notes.txt").await;
    let unchanged = triggers_for(&fs, &profiles, store.clone(), "src/notes.txt").await;
    fs.add_file("/site/src/notes.txt", "v2");
    let changed = triggers_for(&fs, &profiles, store.clone(), "src/notes.txt").await;

    assert_eq!(first.len(), 1);
    assert!(unchanged.is_empty());
    assert_eq!(changed.len(), 1);
}

#[tokio::test]
async fn dispatched_trigger_runs_tasks_in_sequence() {
    init_tracing();
    let log = ActionLog::new();
    let mut registry = TaskRegistry::new();
    registry.register("first", &[], Some(recording_action(&log, "first")));
    registry.register("second", &[], Some(recording_action(&log, "second")));
    let runner = Runner::new(registry);

    let job = dispatch_trigger(
        runner,
        WatchTrigger {
            glob: "src/**/*".into(),
            tasks: vec!["first".into(), "second".into()],
            path: "src/a.txt".into(),
        },
    );
    with_timeout(job).await.unwrap();

    assert_eq!(log.events(), vec!["first", "second"]);
}

#[tokio::test]
async fn failed_run_ends_its_sequence_but_not_the_dispatcher() {
    init_tracing();
    let log = ActionLog::new();
    let mut registry = TaskRegistry::new();
    registry.register("broken", &[], Some(failing_action(&log, "broken", "nope")));
    registry.register("after", &[], Some(recording_action(&log, "after")));
    registry.register("other", &[], Some(recording_action(&log, "other")));
    let runner = Runner::new(registry);

    let (tx, rx) = mpsc::channel(4);
    let dispatcher = spawn_dispatcher(runner, rx);

    tx.send(WatchTrigger {
        glob: "a".into(),
        tasks: vec!["broken".into(), "after".into()],
        path: "src/a".into(),
    })
    .await
    .unwrap();
    tx.send(WatchTrigger {
        glob: "b".into(),
        tasks: vec!["other".into()],
        path: "src/b".into(),
    })
    .await
    .unwrap();

    with_timeout(async {
        while log.count("other") == 0 || log.count("broken") == 0 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    // Give a wrongly-continued sequence time to show up.
    sleep(Duration::from_millis(50)).await;

    assert_eq!(log.count("after"), 0);
    drop(tx);
    with_timeout(dispatcher).await.unwrap();
}

#[tokio::test]
async fn real_watcher_triggers_on_source_changes_only() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "src/.keep", "");
    write_file(dir.path(), "build/.keep", "");

    let cfg = ConfigFileBuilder::new()
        .watch(WatchBindingConfig::new("src/**/*.scss", &["sass:watch"]))
        .watch(WatchBindingConfig::new("build/**/*", &["never"]))
        .build();
    let profiles = build_binding_profiles(cfg.watch_bindings()).unwrap();

    let (tx, mut rx) = mpsc::channel(64);
    let _handle = spawn_watcher(
        Arc::new(RealFileSystem),
        dir.path(),
        &cfg.source_root(dir.path()),
        profiles,
        tx,
    )
    .unwrap();

    // Let the backend settle before producing events.
    sleep(Duration::from_millis(200)).await;
    write_file(dir.path(), "build/out.css", "ignored");
    write_file(dir.path(), "src/main.scss", "a { b: c; }");

    let trigger = timeout(Duration::from_secs(5), async {
        loop {
            let trigger = rx.recv().await.expect("watcher channel closed");
            if trigger.path == "src/main.scss" {
                return trigger;
            }
        }
    })
    .await
    .expect("no trigger for src/main.scss");

    assert_eq!(trigger.tasks, vec!["sass:watch".to_string()]);
    while let Ok(other) = rx.try_recv() {
        assert_ne!(other.tasks, vec!["never".to_string()]);
    }
}
