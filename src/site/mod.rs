// src/site/mod.rs

//! The site tasks: copy assets, compile style sheets, render templates,
//! serve the build root with live reload, and the grouping tasks built on
//! top of them.
//!
//! All work goes through narrow seams ([`FileSystem`], [`StyleCompiler`],
//! [`TemplateCompiler`], [`ReloadServer`]) held by a [`SiteContext`], which
//! [`register_site_tasks`] shares between the task actions.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result, bail};
use tokio::sync::mpsc;
use tracing::info;

use crate::config::ConfigFile;
use crate::dag::{TaskDef, TaskRegistry};
use crate::engine::Runner;
use crate::exec::{TaskAction, action_fn};
use crate::fs::{FileSystem, RealFileSystem};
use crate::serve::{DevServer, ReloadServer};
use crate::watch::{build_binding_profiles, spawn_dispatcher, spawn_watcher};

pub mod assets;
pub mod session;
pub mod styles;
pub mod templates;

pub use session::DevSession;
pub use styles::{GrassCompiler, StyleCompiler};
pub use templates::{MiniJinjaCompiler, TemplateCompiler};

/// Capacity of the channel between the watcher and the dispatcher.
const TRIGGER_CHANNEL_CAPACITY: usize = 64;

/// Everything the site tasks need, shared by their actions.
pub struct SiteContext {
    project_root: PathBuf,
    config: ConfigFile,
    fs: Arc<dyn FileSystem>,
    styles: Arc<dyn StyleCompiler>,
    templates: Arc<dyn TemplateCompiler>,
    server: Arc<dyn ReloadServer>,
    watch: bool,
    session: Mutex<DevSession>,
}

impl std::fmt::Debug for SiteContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteContext")
            .field("project_root", &self.project_root)
            .field("watch", &self.watch)
            .finish_non_exhaustive()
    }
}

impl SiteContext {
    /// Production context: real filesystem, grass, minijinja and the axum
    /// dev server, with paths resolved against `project_root`.
    pub fn new(project_root: impl Into<PathBuf>, config: ConfigFile) -> Self {
        let project_root = project_root.into();
        let server = Arc::new(DevServer::new(config.server()));
        let mut site = Self {
            fs: Arc::new(RealFileSystem),
            styles: Arc::new(GrassCompiler::new(
                Arc::new(RealFileSystem),
                config.styles().output_style,
            )),
            templates: Arc::new(MiniJinjaCompiler::new(
                Arc::new(RealFileSystem),
                config.source_root(&project_root),
            )),
            server,
            watch: true,
            session: Mutex::new(DevSession::default()),
            project_root,
            config,
        };
        site.reset_compilers();
        site
    }

    /// Swap the filesystem. The default compilers are rebuilt on top of it,
    /// so call this before `with_style_compiler` / `with_template_compiler`.
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self.reset_compilers();
        self
    }

    pub fn with_style_compiler(mut self, styles: Arc<dyn StyleCompiler>) -> Self {
        self.styles = styles;
        self
    }

    pub fn with_template_compiler(mut self, templates: Arc<dyn TemplateCompiler>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_reload_server(mut self, server: Arc<dyn ReloadServer>) -> Self {
        self.server = server;
        self
    }

    /// Serve without starting the file watcher.
    pub fn without_watcher(mut self) -> Self {
        self.watch = false;
        self
    }

    fn reset_compilers(&mut self) {
        self.styles = Arc::new(GrassCompiler::new(
            Arc::clone(&self.fs),
            self.config.styles().output_style,
        ));
        self.templates = Arc::new(MiniJinjaCompiler::new(
            Arc::clone(&self.fs),
            self.source_root(),
        ));
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn source_root(&self) -> PathBuf {
        self.config.source_root(&self.project_root)
    }

    pub fn build_root(&self) -> PathBuf {
        self.config.build_root(&self.project_root)
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn style_compiler(&self) -> &Arc<dyn StyleCompiler> {
        &self.styles
    }

    pub fn template_compiler(&self) -> &Arc<dyn TemplateCompiler> {
        &self.templates
    }

    pub fn server(&self) -> &Arc<dyn ReloadServer> {
        &self.server
    }

    /// Lock the dev session state.
    pub fn session(&self) -> MutexGuard<'_, DevSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start serving the build root and, once per process, start watching
    /// the source root with the configured bindings.
    pub async fn start_dev_session(&self, runner: Runner) -> Result<()> {
        let build_root = self.build_root();
        let addr = self
            .server
            .start(&build_root)
            .await
            .context("starting dev server")?;
        println!("[sitedag] Serving {} at http://{addr}", build_root.display());

        let mut session = self.session();
        session.set_addr(addr);
        if !self.watch || session.is_watching() {
            return Ok(());
        }

        let profiles = build_binding_profiles(self.config.watch_bindings())?;
        let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_CHANNEL_CAPACITY);
        let watcher = spawn_watcher(
            Arc::clone(&self.fs),
            &self.project_root,
            &self.source_root(),
            profiles,
            trigger_tx,
        )?;
        let dispatcher = spawn_dispatcher(runner, trigger_rx);
        session.attach_watch(watcher, dispatcher);
        Ok(())
    }

    /// Stop the watcher and the server.
    pub fn shutdown(&self) {
        self.session().shutdown();
        self.server.stop();
    }
}

/// Register the site's task table into `registry`.
pub fn register_site_tasks(registry: &mut TaskRegistry, site: Arc<SiteContext>) {
    let defs = [
        TaskDef::new("assets")
            .describe("copy asset subtrees from the source root to the build root")
            .with_action(blocking_action(&site, |s| s.copy_assets().map(drop))),
        TaskDef::new("sass")
            .describe("compile top-level style sheets to CSS")
            .with_action(blocking_action(&site, |s| s.compile_styles().map(drop))),
        TaskDef::new("jade")
            .describe("render templates to HTML")
            .with_action(blocking_action(&site, |s| s.render_templates().map(drop))),
        TaskDef::new("browser-sync")
            .describe("serve the build root with live reload and watch the sources")
            .with_action(dev_session_action(&site)),
        TaskDef::new("sass:watch")
            .after(["sass"])
            .describe("recompile style sheets, then reload browsers")
            .with_action(reload_action(&site)),
        TaskDef::new("jade:watch")
            .after(["jade"])
            .describe("re-render templates, then reload browsers")
            .with_action(reload_action(&site)),
        TaskDef::new("build:assets").after(["assets"]),
        TaskDef::new("build:sass").after(["build:assets", "sass"]),
        TaskDef::new("build:jade").after(["build:sass", "jade"]),
        TaskDef::new("build")
            .after(["build:jade"])
            .describe("full one-shot build")
            .with_action(build_done_action(&site)),
        TaskDef::new("dev")
            .after(["assets", "sass", "jade", "browser-sync"])
            .describe("build, serve and watch until Ctrl-C"),
    ];

    for def in defs {
        registry.insert(def);
    }
}

/// Run synchronous site work on the blocking pool.
fn blocking_action<F>(site: &Arc<SiteContext>, work: F) -> Arc<dyn TaskAction>
where
    F: Fn(&SiteContext) -> Result<()> + Send + Sync + Copy + 'static,
{
    let site = Arc::clone(site);
    action_fn(move |ctx| {
        let site = Arc::clone(&site);
        async move {
            tokio::task::spawn_blocking(move || work(&site))
                .await
                .with_context(|| format!("task '{}' did not complete", ctx.task))?
        }
    })
}

fn dev_session_action(site: &Arc<SiteContext>) -> Arc<dyn TaskAction> {
    let site = Arc::clone(site);
    action_fn(move |ctx| {
        let site = Arc::clone(&site);
        async move { site.start_dev_session(ctx.runner).await }
    })
}

fn reload_action(site: &Arc<SiteContext>) -> Arc<dyn TaskAction> {
    let site = Arc::clone(site);
    action_fn(move |_ctx| {
        let site = Arc::clone(&site);
        async move {
            site.server().reload();
            Ok(())
        }
    })
}

fn build_done_action(site: &Arc<SiteContext>) -> Arc<dyn TaskAction> {
    let site = Arc::clone(site);
    action_fn(move |ctx| {
        let build_root = site.build_root();
        async move {
            info!(run_id = ctx.run_id, path = ?build_root, "build complete");
            println!("[sitedag] Build complete: {}", build_root.display());
            Ok(())
        }
    })
}

/// Files directly inside `dir` with extension `ext`, partials excluded.
pub(crate) fn top_level_sources(fs: &dyn FileSystem, dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    if !fs.is_dir(dir) {
        return Ok(Vec::new());
    }
    Ok(fs
        .read_dir(dir)?
        .into_iter()
        .filter(|p| fs.is_file(p))
        .filter(|p| p.extension().is_some_and(|e| e == ext))
        .filter(|p| !is_partial(p))
        .collect())
}

/// `_name.ext` files are only meant to be imported or included.
pub(crate) fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

/// Turn per-file failures into one error after the whole batch ran.
pub(crate) fn finish_batch(kind: &str, done: usize, failed: Vec<String>) -> Result<usize> {
    if failed.is_empty() {
        return Ok(done);
    }
    bail!(
        "{} of {} {kind} failed: {}",
        failed.len(),
        done + failed.len(),
        failed.join(", ")
    )
}
