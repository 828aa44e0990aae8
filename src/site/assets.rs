// src/site/assets.rs

use anyhow::Result;
use tracing::{debug, error, info};

use crate::fs::walk_files;

use super::{SiteContext, finish_batch};

impl SiteContext {
    /// Mirror every configured asset subtree (`assets/`, `views/`, `bio/` by
    /// default) from the source root into the build root.
    ///
    /// Missing subtrees are skipped. A file that fails to copy is logged and
    /// the rest are still copied.
    pub fn copy_assets(&self) -> Result<usize> {
        let source_root = self.source_root();
        let build_root = self.build_root();

        let mut copied = 0;
        let mut failed = Vec::new();
        for dir in &self.config().paths().asset_dirs {
            let from_dir = source_root.join(dir);
            if !self.fs().is_dir(&from_dir) {
                debug!(path = ?from_dir, "asset directory missing; skipping");
                continue;
            }

            for file in walk_files(self.fs().as_ref(), &from_dir)? {
                let Ok(rel) = file.strip_prefix(&source_root) else {
                    continue;
                };
                let dest = build_root.join(rel);
                match self.fs().copy(&file, &dest) {
                    Ok(()) => copied += 1,
                    Err(err) => {
                        error!(path = ?file, error = %format!("{err:#}"), "failed to copy asset; skipping");
                        failed.push(file.display().to_string());
                    }
                }
            }
        }

        info!(copied, failed = failed.len(), "assets copied");
        finish_batch("assets", copied, failed)
    }
}
