//! Error types for KrishiMitra+.
//!
//! Library crates use [`KrishiMitraError`] via `thiserror`.
//! App crates (cli/server) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all KrishiMitra operations.
#[derive(Debug, thiserror::Error)]
pub enum KrishiMitraError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to an external service.
    #[error("network error: {0}")]
    Network(String),

    /// Response body or payload could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A required user input was not provided (e.g. no image selected).
    #[error("missing input: {message}")]
    InputMissing { message: String },

    /// The user has not granted access to something we need (e.g. location).
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unknown place, bad coordinates, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, KrishiMitraError>;

impl KrishiMitraError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a missing-input error from any displayable message.
    pub fn input_missing(msg: impl Into<String>) -> Self {
        Self::InputMissing {
            message: msg.into(),
        }
    }

    /// Create a permission-denied error from any displayable message.
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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

    /// The message to show inline to the user, without the category prefix.
    pub fn user_message(&self) -> String {
        match self {
            Self::InputMissing { message }
            | Self::PermissionDenied { message }
            | Self::Validation { message } => message.clone(),
            other => other.to_string(),
        }
    }
}
