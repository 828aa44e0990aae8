// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the config for a CLI invocation.
///
/// - An explicit path must exist.
/// - Without one, `Sitedag.toml` is used if present; otherwise the built-in
///   defaults apply (the `./src` -> `./build` layout).
pub fn load_or_default(explicit: Option<&Path>) -> Result<(PathBuf, ConfigFile)> {
    if let Some(path) = explicit {
        return Ok((path.to_path_buf(), load_and_validate(path)?));
    }

    let path = default_config_path();
    if path.is_file() {
        let cfg = load_and_validate(&path)?;
        return Ok((path, cfg));
    }

    info!(?path, "no config file found; using built-in defaults");
    Ok((path, ConfigFile::default()))
}

/// Default config location: `Sitedag.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Sitedag.toml")
}
