//! Error types for leadscore.
//!
//! Library crates use [`LeadScoreError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all leadscore operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadScoreError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// CSV reading or parsing error.
    #[error("csv error: {0}")]
    Csv(String),

    /// Staging store (database) error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Model registry error (missing model, version, or artifact).
    #[error("registry error: {0}")]
    Registry(String),

    /// Model training error. Always fatal to the run.
    #[error("training error: {0}")]
    Training(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Tabular data error (missing column, arity mismatch, bad cell type).
    #[error("data error: {message}")]
    Data { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadScoreError>;

impl LeadScoreError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a data error from any displayable message.
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = LeadScoreError::config("missing staging db path");
        assert_eq!(err.to_string(), "config error: missing staging db path");

        let err = LeadScoreError::validation("column 'city_tier' not declared");
        assert!(err.to_string().contains("city_tier"));
    }
}
