//! Error types for deepdraft.
//!
//! Library crates use [`DeepDraftError`] via `thiserror`.
//! The server binary wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all deepdraft operations.
#[derive(Debug, thiserror::Error)]
pub enum DeepDraftError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level HTTP error (client build, connect, body read).
    #[error("network error: {0}")]
    Network(String),

    /// Error from the Firecrawl deep-research API (auth, quota, job failure,
    /// malformed response).
    #[error("research error: {0}")]
    Crawl(String),

    /// Error from the Gemini generation API (auth, quota, empty or malformed
    /// response).
    #[error("generation error: {0}")]
    Generation(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (blank topic, out-of-range crawl parameters).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DeepDraftError>;

impl DeepDraftError {
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

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by bad user input rather than an upstream API.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Config { .. })
    }
}
