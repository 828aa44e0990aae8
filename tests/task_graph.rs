// tests/task_graph.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Barrier;

use sitedag::dag::TaskRegistry;
use sitedag::engine::Runner;
use sitedag::errors::SitedagError;
use sitedag::exec::action_fn;
use sitedag_test_utils::fake_executor::FakeExecutor;
use sitedag_test_utils::recording::{ActionLog, failing_action, recording_action, slow_action};
use sitedag_test_utils::{init_tracing, with_timeout};

/// The shape of the site's `build` task, with recording actions.
fn build_shaped_registry(log: &ActionLog) -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry.register("build", &["build:jade"], Some(recording_action(log, "build")));
    registry.register("build:jade", &["build:sass", "jade"], None);
    registry.register("build:sass", &["build:assets", "sass"], None);
    registry.register("build:assets", &["assets"], None);
    registry.register("assets", &[], Some(recording_action(log, "assets")));
    registry.register("sass", &[], Some(recording_action(log, "sass")));
    registry.register("jade", &[], Some(recording_action(log, "jade")));
    registry
}

#[tokio::test]
async fn build_runs_every_prerequisite_exactly_once_and_before_build() {
    init_tracing();
    let log = ActionLog::new();
    let runner = Runner::new(build_shaped_registry(&log));

    let report = with_timeout(runner.run("build")).await.unwrap();

    for task in ["assets", "sass", "jade", "build"] {
        assert_eq!(log.count(task), 1, "{task} should run once: {:?}", log.events());
    }
    let build_at = log.position("build").unwrap();
    for task in ["assets", "sass", "jade"] {
        assert!(log.position(task).unwrap() < build_at);
    }
    // Grouping tasks take part in the run too.
    assert_eq!(report.completed.len(), 7);
    assert_eq!(report.executed().last(), Some(&"build"));
}

#[tokio::test]
async fn diamond_prerequisite_runs_once() {
    init_tracing();
    let log = ActionLog::new();
    let mut registry = TaskRegistry::new();
    registry.register("top", &["left", "right"], Some(recording_action(&log, "top")));
    registry.register("left", &["base"], Some(recording_action(&log, "left")));
    registry.register("right", &["base"], Some(recording_action(&log, "right")));
    registry.register("base", &[], Some(recording_action(&log, "base")));

    with_timeout(Runner::new(registry).run("top")).await.unwrap();

    assert_eq!(log.count("base"), 1);
    assert_eq!(log.events().first().map(String::as_str), Some("base"));
    assert_eq!(log.events().last().map(String::as_str), Some("top"));
}

#[tokio::test]
async fn separate_runs_each_execute_their_prerequisites() {
    init_tracing();
    let log = ActionLog::new();
    let runner = Runner::new(build_shaped_registry(&log));

    let first = with_timeout(runner.run("build:assets")).await.unwrap();
    let second = with_timeout(runner.run("build:assets")).await.unwrap();

    assert_eq!(log.count("assets"), 2);
    assert!(second.run_id > first.run_id);
}

#[tokio::test]
async fn unknown_task_fails_without_side_effects() {
    init_tracing();
    let log = ActionLog::new();
    let runner = Runner::new(build_shaped_registry(&log));

    let err = with_timeout(runner.run("nonexistent")).await.unwrap_err();

    assert!(matches!(&err, SitedagError::UnknownTask(name) if name == "nonexistent"));
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn unknown_prerequisite_is_detected_before_any_action() {
    init_tracing();
    let log = ActionLog::new();
    let mut registry = TaskRegistry::new();
    registry.register("site", &["fine", "missing"], None);
    registry.register("fine", &[], Some(recording_action(&log, "fine")));

    let err = with_timeout(Runner::new(registry).run("site")).await.unwrap_err();

    assert!(matches!(err, SitedagError::UnknownTask(msg) if msg.contains("missing")));
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn two_task_cycle_is_rejected() {
    init_tracing();
    let log = ActionLog::new();
    let mut registry = TaskRegistry::new();
    registry.register("a", &["b"], Some(recording_action(&log, "a")));
    registry.register("b", &["a"], Some(recording_action(&log, "b")));

    assert!(matches!(
        registry.validate(),
        Err(SitedagError::CyclicDependency(_))
    ));

    let err = with_timeout(Runner::new(registry).run("a")).await.unwrap_err();
    assert!(matches!(err, SitedagError::CyclicDependency(path) if path == "a -> b -> a"));
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn failing_prerequisite_stops_dependent() {
    init_tracing();
    let log = ActionLog::new();
    let mut registry = TaskRegistry::new();
    registry.register("reload", &["compile"], Some(recording_action(&log, "reload")));
    registry.register("compile", &[], Some(failing_action(&log, "compile", "syntax error")));

    let err = with_timeout(Runner::new(registry).run("reload")).await.unwrap_err();

    match err {
        SitedagError::ActionFailure { task, message } => {
            assert_eq!(task, "compile");
            assert!(message.contains("syntax error"));
        }
        other => panic!("expected ActionFailure, got {other:?}"),
    }
    assert_eq!(log.events(), vec!["compile"]);
}

#[tokio::test]
async fn failure_waits_for_running_siblings_and_skips_the_rest() {
    init_tracing();
    let log = ActionLog::new();
    let mut registry = TaskRegistry::new();
    registry.register("all", &["slow", "bad", "after_slow"], None);
    registry.register("slow", &[], Some(slow_action(&log, "slow", Duration::from_millis(100))));
    registry.register("after_slow", &["slow"], Some(recording_action(&log, "after_slow")));
    registry.register("bad", &[], Some(failing_action(&log, "bad", "boom")));

    let err = with_timeout(Runner::new(registry).run("all")).await.unwrap_err();

    assert!(matches!(err, SitedagError::ActionFailure { task, .. } if task == "bad"));
    // The in-flight sibling finished before the run reported.
    assert_eq!(log.count("slow"), 1);
    assert_eq!(log.count("after_slow"), 0);
}

#[tokio::test]
async fn panicking_action_is_an_action_failure() {
    init_tracing();
    let mut registry = TaskRegistry::new();
    registry.register(
        "explode",
        &[],
        Some(action_fn(|_ctx| async {
            let explode = true;
            if explode {
                panic!("kaboom");
            }
            Ok(())
        })),
    );

    let err = with_timeout(Runner::new(registry).run("explode")).await.unwrap_err();

    assert!(matches!(err, SitedagError::ActionFailure { task, .. } if task == "explode"));
}

#[tokio::test]
async fn reregistering_replaces_the_task() {
    init_tracing();
    let log = ActionLog::new();
    let mut registry = TaskRegistry::new();
    registry.register("t", &[], Some(recording_action(&log, "old")));
    let previous = registry.register("t", &[], Some(recording_action(&log, "new")));
    assert!(previous.is_some());

    with_timeout(Runner::new(registry).run("t")).await.unwrap();

    assert_eq!(log.events(), vec!["new"]);
}

#[tokio::test]
async fn concurrent_runs_with_disjoint_prerequisites_both_succeed() {
    init_tracing();
    let log = ActionLog::new();
    let mut registry = TaskRegistry::new();
    registry.register("styles", &["sass"], Some(recording_action(&log, "styles")));
    registry.register("sass", &[], Some(slow_action(&log, "sass", Duration::from_millis(50))));
    registry.register("pages", &["jade"], Some(recording_action(&log, "pages")));
    registry.register("jade", &[], Some(slow_action(&log, "jade", Duration::from_millis(50))));
    let runner = Runner::new(registry);

    let (a, b) = with_timeout(async { tokio::join!(runner.run("styles"), runner.run("pages")) }).await;

    assert_eq!(a.unwrap().executed(), vec!["sass", "styles"]);
    assert_eq!(b.unwrap().executed(), vec!["jade", "pages"]);
}

#[tokio::test]
async fn independent_prerequisites_run_concurrently() {
    init_tracing();
    // Each side waits for the other; this only completes if both actions
    // are in flight at the same time.
    let barrier = Arc::new(Barrier::new(2));
    let mut registry = TaskRegistry::new();
    for name in ["left", "right"] {
        let barrier = Arc::clone(&barrier);
        registry.register(
            name,
            &[],
            Some(action_fn(move |_ctx| {
                let barrier = Arc::clone(&barrier);
                async move {
                    barrier.wait().await;
                    Ok(())
                }
            })),
        );
    }
    registry.register("both", &["left", "right"], None);

    with_timeout(Runner::new(registry).run("both")).await.unwrap();
}

#[tokio::test]
async fn spawned_run_signals_completion_through_its_handle() {
    init_tracing();
    let log = ActionLog::new();
    let runner = Runner::new(build_shaped_registry(&log));

    let handle = runner.spawn("build");
    assert_eq!(handle.task(), "build");
    let report = with_timeout(handle.wait()).await.unwrap();

    assert_eq!(report.target, "build");
    assert_eq!(log.count("build"), 1);
}

#[tokio::test]
async fn actions_can_start_nested_runs_through_their_context() {
    init_tracing();
    let log = ActionLog::new();
    let mut registry = build_shaped_registry(&log);
    registry.register(
        "outer",
        &[],
        Some(action_fn(|ctx| async move {
            ctx.runner.run("sass").await?;
            anyhow::Ok(())
        })),
    );

    with_timeout(Runner::new(registry).run("outer")).await.unwrap();

    assert_eq!(log.events(), vec!["sass"]);
}

#[tokio::test]
async fn fake_executor_sees_dependency_order_without_running_actions() {
    init_tracing();
    let log = ActionLog::new();
    let executor = FakeExecutor::new();
    let runner = Runner::with_executor(build_shaped_registry(&log), executor.clone());

    with_timeout(runner.run("build")).await.unwrap();

    let executed = executor.executed();
    assert_eq!(executed.len(), 7);
    let pos = |t: &str| executed.iter().position(|e| e == t).unwrap();
    assert!(pos("assets") < pos("build:assets"));
    assert!(pos("build:assets") < pos("build:sass"));
    assert!(pos("sass") < pos("build:sass"));
    assert!(pos("build:jade") < pos("build"));
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn fake_executor_failure_skips_the_remaining_tasks() {
    init_tracing();
    let log = ActionLog::new();
    let executor = FakeExecutor::failing(&["assets"]);
    let runner = Runner::with_executor(build_shaped_registry(&log), executor.clone());

    let err = with_timeout(runner.run("build")).await.unwrap_err();

    assert!(matches!(err, SitedagError::ActionFailure { task, .. } if task == "assets"));
    let executed = executor.executed();
    assert!(!executed.contains(&"build".to_string()));
    assert!(!executed.contains(&"build:assets".to_string()));
}

#[tokio::test]
async fn run_sequence_reruns_shared_prerequisites_and_stops_at_first_failure() {
    init_tracing();
    let log = ActionLog::new();
    let mut registry = TaskRegistry::new();
    registry.register("base", &[], Some(recording_action(&log, "base")));
    registry.register("first", &["base"], Some(recording_action(&log, "first")));
    registry.register("broken", &["base"], Some(failing_action(&log, "broken", "nope")));
    registry.register("never", &[], Some(recording_action(&log, "never")));
    let runner = Runner::new(registry);

    let reports = with_timeout(runner.run_sequence(&["first".to_string(), "first".to_string()]))
        .await
        .unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(log.count("base"), 2);

    let err = with_timeout(runner.run_sequence(&["broken".to_string(), "never".to_string()]))
        .await
        .unwrap_err();
    assert!(matches!(err, SitedagError::ActionFailure { task, .. } if task == "broken"));
    assert_eq!(log.count("never"), 0);
}
