use sitedag::config::{ConfigFile, RawConfigFile, WatchBindingConfig};
use sitedag::errors::Result;
use sitedag::types::StyleOutput;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults with the server on port 0, so tests
/// never fight over a fixed port.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.server.port = 0;
        Self { config }
    }

    pub fn source(mut self, dir: &str) -> Self {
        self.config.paths.source = dir.into();
        self
    }

    pub fn build_dir(mut self, dir: &str) -> Self {
        self.config.paths.build = dir.into();
        self
    }

    pub fn output_style(mut self, style: StyleOutput) -> Self {
        self.config.styles.output_style = style;
        self
    }

    pub fn local(mut self, key: &str, value: &str) -> Self {
        self.config
            .templates
            .locals
            .insert(key.to_string(), toml::Value::String(value.to_string()));
        self
    }

    pub fn inject_client(mut self, enabled: bool) -> Self {
        self.config.server.inject_client = enabled;
        self
    }

    /// Add a binding. The first call replaces the built-in bindings.
    pub fn watch(mut self, binding: WatchBindingConfig) -> Self {
        self.config.watch.get_or_insert_with(Vec::new).push(binding);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
