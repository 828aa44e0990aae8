// src/watch/event_handler.rs

//! Turns one changed path into binding triggers.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::TaskName;
use crate::fs::FileSystem;
use crate::watch::hash::{HashStore, compute_file_hash};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::BindingProfile;

/// A binding matched a changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTrigger {
    pub glob: String,
    /// Tasks to run in sequence.
    pub tasks: Vec<TaskName>,
    /// Changed path relative to the project root.
    pub path: String,
}

/// Process a single file change and emit one trigger per matching binding.
///
/// Bindings are independent: overlapping bindings each fire, and nothing is
/// coalesced. A `use_hash` binding is skipped when the file's content hash
/// equals the one seen at its previous trigger. Returns `false` once the
/// trigger channel is closed.
pub async fn process_file_change(
    fs: Arc<dyn FileSystem>,
    root: &Path,
    path: &Path,
    profiles: &[BindingProfile],
    trigger_tx: &mpsc::Sender<WatchTrigger>,
    hash_store: Arc<Mutex<Box<dyn HashStore>>>,
) -> bool {
    let Some(rel_str) = relative_str(root, path) else {
        warn!(
            path = ?path,
            root = ?root,
            "could not relativize path against project root"
        );
        return true;
    };

    debug!(path = %rel_str, "normalized event path");

    for profile in profiles.iter().filter(|p| p.matches(&rel_str)) {
        if profile.use_hash()
            && !content_changed(fs.clone(), path, &rel_str, profile, hash_store.clone()).await
        {
            info!(
                glob = %profile.glob(),
                path = %rel_str,
                "content unchanged; skipping trigger"
            );
            continue;
        }

        info!(
            glob = %profile.glob(),
            path = %rel_str,
            tasks = ?profile.tasks(),
            "watch match -> triggering tasks"
        );

        let trigger = WatchTrigger {
            glob: profile.glob().to_string(),
            tasks: profile.tasks().to_vec(),
            path: rel_str.clone(),
        };
        if trigger_tx.send(trigger).await.is_err() {
            warn!("trigger channel closed; stopping watch event processing");
            return false;
        }
    }

    true
}

/// Hash the changed file and compare it with the binding's previous hash.
///
/// Errors (e.g. the file was deleted) count as a change.
async fn content_changed(
    fs: Arc<dyn FileSystem>,
    abs_path: &Path,
    rel_path: &str,
    profile: &BindingProfile,
    hash_store: Arc<Mutex<Box<dyn HashStore>>>,
) -> bool {
    let abs_path: PathBuf = abs_path.to_path_buf();
    let key = profile.hash_key(rel_path);

    tokio::task::spawn_blocking(move || {
        let hash = match compute_file_hash(fs.as_ref(), &abs_path) {
            Ok(h) => h,
            Err(err) => {
                debug!(path = ?abs_path, error = %err, "could not hash file; triggering anyway");
                return true;
            }
        };
        let mut store = hash_store.lock().unwrap_or_else(PoisonError::into_inner);
        store.check_and_update(&key, &hash)
    })
    .await
    .unwrap_or(true)
}
