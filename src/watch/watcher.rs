// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::fs::FileSystem;
use crate::watch::event_handler::{WatchTrigger, process_file_change};
use crate::watch::hash::{HashStore, MemoryHashStore};
use crate::watch::patterns::BindingProfile;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    watched: PathBuf,
}

impl WatcherHandle {
    /// Directory being watched (recursively).
    pub fn watched(&self) -> &Path {
        &self.watched
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("watched", &self.watched)
            .finish()
    }
}

/// Watch `source_root` recursively and send a [`WatchTrigger`] for every
/// binding whose patterns match a changed path.
///
/// - `project_root` is the directory all binding globs are relative to.
/// - Only `source_root` is watched, so output written to the build root
///   never re-triggers tasks.
pub fn spawn_watcher(
    fs: Arc<dyn FileSystem>,
    project_root: &Path,
    source_root: &Path,
    profiles: Vec<BindingProfile>,
    trigger_tx: mpsc::Sender<WatchTrigger>,
) -> Result<WatcherHandle> {
    // Canonicalize once so event paths and the root share a prefix.
    let root = project_root
        .canonicalize()
        .unwrap_or_else(|_| project_root.to_path_buf());
    let watched = source_root
        .canonicalize()
        .with_context(|| format!("source root {:?} does not exist", source_root))?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    // Called synchronously on notify's thread.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // The receiver only goes away on shutdown.
                let _ = event_tx.send(event);
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )?;

    watcher
        .watch(&watched, RecursiveMode::Recursive)
        .with_context(|| format!("watching {:?}", watched))?;

    info!(path = ?watched, bindings = profiles.len(), "file watcher started");

    tokio::spawn(async move {
        let hash_store: Arc<Mutex<Box<dyn HashStore>>> =
            Arc::new(Mutex::new(Box::new(MemoryHashStore::new())));

        'events: while let Some(event) = event_rx.recv().await {
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            debug!(?event, "received notify event");

            for path in &event.paths {
                let open = process_file_change(
                    fs.clone(),
                    &root,
                    path,
                    &profiles,
                    &trigger_tx,
                    Arc::clone(&hash_store),
                )
                .await;
                if !open {
                    break 'events;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        watched,
    })
}
