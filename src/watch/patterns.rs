// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::WatchBindingConfig;
use crate::engine::TaskName;

/// Compiled form of one watch binding.
///
/// Patterns are relative to the project root; the watcher passes relative
/// paths with forward slashes (e.g. `"src/styles/main.scss"`) into
/// [`matches`](Self::matches). `*` does not cross directory separators, so
/// `src/*.scss` only sees top-level files while `src/**/*.scss` sees all.
#[derive(Clone)]
pub struct BindingProfile {
    glob: String,
    tasks: Vec<TaskName>,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
    use_hash: bool,
}

impl fmt::Debug for BindingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingProfile")
            .field("glob", &self.glob)
            .field("tasks", &self.tasks)
            .field("use_hash", &self.use_hash)
            .finish_non_exhaustive()
    }
}

impl BindingProfile {
    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// Tasks to run, in order, for every matching change.
    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    /// Key under which this binding's last content hash is stored.
    pub(crate) fn hash_key(&self, rel_path: &str) -> String {
        format!("{}\u{0}{}", self.glob, rel_path)
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Compile every configured binding, keeping their order.
pub fn build_binding_profiles(bindings: &[WatchBindingConfig]) -> Result<Vec<BindingProfile>> {
    bindings
        .iter()
        .map(|binding| {
            let watch_set = build_globset(std::slice::from_ref(&binding.glob))
                .with_context(|| format!("building watch globset for '{}'", binding.glob))?;

            let exclude_set = if binding.exclude.is_empty() {
                None
            } else {
                Some(build_globset(&binding.exclude).with_context(|| {
                    format!("building exclude globset for '{}'", binding.glob)
                })?)
            };

            Ok(BindingProfile {
                glob: binding.glob.clone(),
                tasks: binding.tasks.clone(),
                watch_set,
                exclude_set,
                use_hash: binding.use_hash,
            })
        })
        .collect()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
