// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpoolError {
    #[error("Invalid job spec {path:?}: {reason}")]
    InvalidJobSpec { path: PathBuf, reason: String },

    #[error("Backend rejected job '{job}': {reason}")]
    BackendSubmission { job: String, reason: String },

    #[error("Unknown or disabled resource: {0}")]
    UnknownResource(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpoolError {
    pub(crate) fn invalid_job(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SpoolError::InvalidJobSpec {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SpoolError>;
