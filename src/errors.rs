// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitedagError {
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Cyclic task dependency: {0}")]
    CyclicDependency(String),

    #[error("Task '{task}' failed: {message}")]
    ActionFailure { task: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SitedagError {
    /// Configuration problems (`UnknownTask`, `CyclicDependency`, bad config)
    /// as opposed to a task that ran and failed.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SitedagError::UnknownTask(_)
                | SitedagError::CyclicDependency(_)
                | SitedagError::ConfigError(_)
                | SitedagError::TomlError(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SitedagError>;
