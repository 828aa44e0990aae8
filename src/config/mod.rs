// src/config/mod.rs

//! Configuration loading and validation for sitedag.
//!
//! - `model.rs` defines the TOML-backed data model.
//! - `loader.rs` reads a config file from disk (or falls back to defaults).
//! - `validate.rs` turns a raw config into a validated [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    default_watch_bindings, ConfigFile, Locals, PathsSection, RawConfigFile, ServerSection,
    StylesSection, TemplatesSection, WatchBindingConfig,
};
pub use validate::validate_bindings_against;
