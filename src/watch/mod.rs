// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling watch binding globs (and their excludes).
//! - Wiring up a cross-platform filesystem watcher (`notify`) on the source
//!   root.
//! - Optionally suppressing triggers whose file content did not change.
//! - Running each trigger's tasks as an independent background job.

pub mod dispatch;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use dispatch::{dispatch_trigger, spawn_dispatcher};
pub use event_handler::{WatchTrigger, process_file_change};
pub use hash::{HashStore, MemoryHashStore, compute_file_hash};
pub use patterns::{BindingProfile, build_binding_profiles};
pub use watcher::{WatcherHandle, spawn_watcher};
