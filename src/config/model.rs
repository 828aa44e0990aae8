// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{StyleOutput, TaskName};

/// Key/value context handed to the template compiler (`[templates.locals]`).
pub type Locals = BTreeMap<String, toml::Value>;

/// Top-level configuration as read from `Sitedag.toml`.
///
/// ```toml
/// [paths]
/// source = "src"
/// build = "build"
///
/// [server]
/// port = 3000
///
/// [[watch]]
/// glob = "src/**/*.scss"
/// tasks = ["sass:watch"]
/// ```
///
/// All sections are optional and have reasonable defaults. This is the
/// unvalidated form; convert it into a [`ConfigFile`] with `TryFrom`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub styles: StylesSection,

    #[serde(default)]
    pub templates: TemplatesSection,

    /// Watch bindings from `[[watch]]`. `None` means "use the built-in
    /// bindings derived from `paths.source`".
    #[serde(default)]
    pub watch: Option<Vec<WatchBindingConfig>>,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// [`ConfigFile::default`], so the rest of the crate can rely on its
/// invariants.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    paths: PathsSection,
    server: ServerSection,
    styles: StylesSection,
    templates: TemplatesSection,
    watch: Vec<WatchBindingConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        let watch = match raw.watch {
            Some(bindings) => bindings,
            None => default_watch_bindings(&raw.paths, &raw.styles, &raw.templates),
        };
        Self {
            paths: raw.paths,
            server: raw.server,
            styles: raw.styles,
            templates: raw.templates,
            watch,
        }
    }

    pub fn paths(&self) -> &PathsSection {
        &self.paths
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn styles(&self) -> &StylesSection {
        &self.styles
    }

    pub fn templates(&self) -> &TemplatesSection {
        &self.templates
    }

    /// Effective watch bindings (configured, or the built-in defaults).
    pub fn watch_bindings(&self) -> &[WatchBindingConfig] {
        &self.watch
    }

    /// Override the server port (used by `--port`).
    pub fn set_port(&mut self, port: u16) {
        self.server.port = port;
    }

    /// Absolute-ish source root: `paths.source` resolved against `project_root`.
    pub fn source_root(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.paths.source)
    }

    /// Build output root: `paths.build` resolved against `project_root`.
    pub fn build_root(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.paths.build)
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        ConfigFile::new_unchecked(RawConfigFile::default())
    }
}

/// `[paths]` section: the directory layout contract.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Source root, relative to the project root.
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Build output root, relative to the project root.
    #[serde(default = "default_build")]
    pub build: PathBuf,

    /// Subtrees copied verbatim by the `assets` task.
    #[serde(default = "default_asset_dirs")]
    pub asset_dirs: Vec<String>,

    /// Subdirectories whose templates are rendered in addition to the
    /// top-level ones (into the mirrored build subdirectory).
    #[serde(default = "default_template_dirs")]
    pub template_dirs: Vec<String>,
}

fn default_source() -> PathBuf {
    PathBuf::from("src")
}

fn default_build() -> PathBuf {
    PathBuf::from("build")
}

fn default_asset_dirs() -> Vec<String> {
    vec!["assets".to_string(), "views".to_string(), "bio".to_string()]
}

fn default_template_dirs() -> Vec<String> {
    vec!["bio".to_string()]
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            source: default_source(),
            build: default_build(),
            asset_dirs: default_asset_dirs(),
            template_dirs: default_template_dirs(),
        }
    }
}

/// `[server]` section for the live-reload dev server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    /// `0` binds an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Inject the reload client script into served HTML pages.
    #[serde(default = "default_true")]
    pub inject_client: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            inject_client: true,
        }
    }
}

/// `[styles]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StylesSection {
    /// Source extension without the dot.
    #[serde(default = "default_style_extension")]
    pub extension: String,

    #[serde(default)]
    pub output_style: StyleOutput,
}

fn default_style_extension() -> String {
    "scss".to_string()
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            extension: default_style_extension(),
            output_style: StyleOutput::default(),
        }
    }
}

/// `[templates]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesSection {
    /// Template source extension without the dot.
    #[serde(default = "default_template_extension")]
    pub extension: String,

    /// Extension of rendered output files.
    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// Context passed to every template. Empty by default.
    #[serde(default)]
    pub locals: Locals,
}

fn default_template_extension() -> String {
    "jade".to_string()
}

fn default_output_extension() -> String {
    "html".to_string()
}

impl Default for TemplatesSection {
    fn default() -> Self {
        Self {
            extension: default_template_extension(),
            output_extension: default_output_extension(),
            locals: Locals::new(),
        }
    }
}

/// One `[[watch]]` entry: glob -> tasks run in sequence on every match.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WatchBindingConfig {
    /// Glob relative to the project root, e.g. `src/**/*.scss`.
    pub glob: String,

    #[serde(default)]
    pub exclude: Vec<String>,

    pub tasks: Vec<TaskName>,

    /// Skip the trigger when the changed file's content is unchanged since
    /// the previous trigger of this binding.
    #[serde(default)]
    pub use_hash: bool,
}

impl WatchBindingConfig {
    pub fn new(glob: impl Into<String>, tasks: &[&str]) -> Self {
        Self {
            glob: glob.into(),
            exclude: Vec::new(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
            use_hash: false,
        }
    }

    pub fn excluding(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }
}

/// Built-in bindings: style sheets -> `sass:watch`, templates -> `jade:watch`,
/// everything else under the source root -> `assets`.
///
/// The top-level and recursive globs overlap on purpose; a change to a
/// top-level file triggers two independent runs.
pub fn default_watch_bindings(
    paths: &PathsSection,
    styles: &StylesSection,
    templates: &TemplatesSection,
) -> Vec<WatchBindingConfig> {
    let src = paths.source.to_string_lossy().replace('\\', "/");
    let src = src.trim_end_matches('/');
    let style_ext = &styles.extension;
    let tpl_ext = &templates.extension;

    vec![
        WatchBindingConfig::new(format!("{src}/*.{style_ext}"), &["sass:watch"]),
        WatchBindingConfig::new(format!("{src}/**/*.{style_ext}"), &["sass:watch"]),
        WatchBindingConfig::new(format!("{src}/*.{tpl_ext}"), &["jade:watch"]),
        WatchBindingConfig::new(format!("{src}/**/*.{tpl_ext}"), &["jade:watch"]),
        WatchBindingConfig::new(format!("{src}/**/*"), &["assets"])
            .excluding(format!("{src}/**/*.{style_ext}"))
            .excluding(format!("{src}/**/*.{tpl_ext}")),
    ]
}
