// src/site/styles.rs

//! Style sheet compilation (`sass` task).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, info};

use crate::fs::FileSystem;
use crate::types::StyleOutput;

use super::{SiteContext, finish_batch, top_level_sources};

/// Source text -> compiled CSS, or a compile error.
pub trait StyleCompiler: Send + Sync {
    /// `path` is used for diagnostics; `load_path` resolves `@import`/`@use`.
    fn compile(&self, path: &Path, source: &str, load_path: &Path) -> Result<String>;
}

/// [`StyleCompiler`] backed by `grass`, reading imports through [`FileSystem`].
#[derive(Debug)]
pub struct GrassCompiler {
    fs: Arc<dyn FileSystem>,
    style: StyleOutput,
}

impl GrassCompiler {
    pub fn new(fs: Arc<dyn FileSystem>, style: StyleOutput) -> Self {
        Self { fs, style }
    }
}

impl StyleCompiler for GrassCompiler {
    fn compile(&self, path: &Path, source: &str, load_path: &Path) -> Result<String> {
        let bridge = GrassFs(self.fs.as_ref());
        let options = grass::Options::default()
            .style(self.style.into())
            .load_path(load_path)
            .fs(&bridge);

        grass::from_string(source.to_owned(), &options)
            .map_err(|err| anyhow!("{err}"))
            .with_context(|| format!("compiling {}", path.display()))
    }
}

#[derive(Debug)]
struct GrassFs<'a>(&'a dyn FileSystem);

impl grass::Fs for GrassFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        self.0.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.0.is_file(path)
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        self.0
            .read(path)
            .map_err(|err| std::io::Error::other(format!("{err:#}")))
    }
}

impl SiteContext {
    /// Compile every top-level style sheet of the source root into
    /// `<build>/<stem>.css`. Partials (`_name.scss`) are only imported.
    ///
    /// A sheet that fails to compile is logged and skipped; the call still
    /// fails afterwards so that a chained reload does not fire.
    pub fn compile_styles(&self) -> Result<usize> {
        let source_root = self.source_root();
        let build_root = self.build_root();
        let sources = top_level_sources(
            self.fs().as_ref(),
            &source_root,
            &self.config().styles().extension,
        )?;

        let mut compiled = 0;
        let mut failed = Vec::new();
        for path in &sources {
            match self.compile_style(path, &source_root, &build_root) {
                Ok(dest) => {
                    debug!(path = ?path, dest = ?dest, "compiled style sheet");
                    compiled += 1;
                }
                Err(err) => {
                    error!(path = ?path, error = %format!("{err:#}"), "style sheet failed to compile; skipping");
                    failed.push(path.display().to_string());
                }
            }
        }

        info!(compiled, failed = failed.len(), "style sheets done");
        finish_batch("style sheets", compiled, failed)
    }

    fn compile_style(&self, path: &Path, source_root: &Path, build_root: &Path) -> Result<PathBuf> {
        let source = self.fs().read_to_string(path)?;
        let css = self.style_compiler().compile(path, &source, source_root)?;

        let stem = path
            .file_stem()
            .with_context(|| format!("{} has no file name", path.display()))?;
        let mut dest = build_root.join(stem);
        dest.set_extension("css");
        self.fs().write(&dest, css.as_bytes())?;
        Ok(dest)
    }
}
