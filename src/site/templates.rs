// src/site/templates.rs

//! Template rendering (`jade` task).
//!
//! Templates keep their configured extension (`.jade` by default) but are
//! rendered with minijinja, so `{{ title }}`, `{% include %}` and
//! `{% extends %}` are available. Includes resolve against the source root.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use minijinja::{Environment, ErrorKind};
use tracing::{debug, error, info};

use crate::config::Locals;
use crate::fs::FileSystem;

use super::{SiteContext, finish_batch, top_level_sources};

/// Template text + key/value context -> rendered text, or an error.
pub trait TemplateCompiler: Send + Sync {
    /// `name` is the template's path relative to the source root.
    fn render(&self, name: &str, source: &str, locals: &Locals) -> Result<String>;
}

/// minijinja-backed [`TemplateCompiler`].
#[derive(Debug)]
pub struct MiniJinjaCompiler {
    fs: Arc<dyn FileSystem>,
    include_root: PathBuf,
}

impl MiniJinjaCompiler {
    pub fn new(fs: Arc<dyn FileSystem>, include_root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            include_root: include_root.into(),
        }
    }
}

impl TemplateCompiler for MiniJinjaCompiler {
    fn render(&self, name: &str, source: &str, locals: &Locals) -> Result<String> {
        let mut env = Environment::new();
        let fs = Arc::clone(&self.fs);
        let root = self.include_root.clone();
        env.set_loader(move |included| load_template(fs.as_ref(), &root, included));

        env.render_named_str(name, source, locals)
            .with_context(|| format!("rendering template {name}"))
    }
}

fn load_template(
    fs: &dyn FileSystem,
    root: &Path,
    name: &str,
) -> std::result::Result<Option<String>, minijinja::Error> {
    if name.split(['/', '\\']).any(|segment| segment == "..") {
        return Ok(None);
    }
    let path = root.join(name);
    if !fs.is_file(&path) {
        return Ok(None);
    }
    fs.read_to_string(&path).map(Some).map_err(|err| {
        minijinja::Error::new(
            ErrorKind::InvalidOperation,
            format!("could not read {name}: {err:#}"),
        )
    })
}

impl SiteContext {
    /// Render top-level templates into the build root, and the templates
    /// directly inside each configured template subtree into the mirrored
    /// subtree. Deeper directories are not rendered.
    ///
    /// Failures are logged per file and summarized in the returned error.
    pub fn render_templates(&self) -> Result<usize> {
        let source_root = self.source_root();
        let build_root = self.build_root();
        let templates = self.config().templates();

        let mut sources = top_level_sources(self.fs().as_ref(), &source_root, &templates.extension)?;
        for dir in &self.config().paths().template_dirs {
            sources.extend(top_level_sources(
                self.fs().as_ref(),
                &source_root.join(dir),
                &templates.extension,
            )?);
        }

        let mut rendered = 0;
        let mut failed = Vec::new();
        for path in &sources {
            match self.render_template(path, &source_root, &build_root) {
                Ok(dest) => {
                    debug!(path = ?path, dest = ?dest, "rendered template");
                    rendered += 1;
                }
                Err(err) => {
                    error!(path = ?path, error = %format!("{err:#}"), "template failed to render; skipping");
                    failed.push(path.display().to_string());
                }
            }
        }

        info!(rendered, failed = failed.len(), "templates done");
        finish_batch("templates", rendered, failed)
    }

    fn render_template(&self, path: &Path, source_root: &Path, build_root: &Path) -> Result<PathBuf> {
        let rel = path
            .strip_prefix(source_root)
            .with_context(|| format!("{} is outside the source root", path.display()))?;
        let name = rel.to_string_lossy().replace('\\', "/");

        let source = self.fs().read_to_string(path)?;
        let html = self
            .template_compiler()
            .render(&name, &source, &self.config().templates().locals)?;

        let mut dest = build_root.join(rel);
        dest.set_extension(&self.config().templates().output_extension);
        self.fs().write(&dest, html.as_bytes())?;
        Ok(dest)
    }
}
