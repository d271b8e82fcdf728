//! Error types for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no kiln.toml found in {0} or any parent directory")]
    NotFound(PathBuf),

    #[error("invalid config value for '{field}': {hint}")]
    InvalidValue { field: String, hint: String },

    #[error("unknown profile '{0}'")]
    UnknownProfile(String),

    #[error("invalid profile override: {0}")]
    InvalidProfileOverride(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, hint: impl ToString) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            hint: hint.to_string(),
        }
    }
}
