//! Error types and handling
//!
//! This module provides the error taxonomy shared by the audit-trail engine.
//! Load failures are recovered by the view itself; store, filter and
//! normalization errors surface through [`AppError`]. Caller-supplied
//! strategy functions report [`FormatError`].

use thiserror::Error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Filter input rejected at entry (e.g. an unparsable date)
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// A raw audit entry could not be normalized
    #[error("Malformed audit entry: {0}")]
    MalformedEntry(String),

    /// A strategy function failed to produce its output
    #[error("Format error: {0}")]
    Format(String),

    /// Remote store communication error
    #[error("Audit store error: {0}")]
    Http(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        AppError::InvalidFilter(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        AppError::MalformedEntry(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        AppError::Config(msg.into())
    }

    /// Stable identifier for programmatic handling
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidFilter(_) => "invalid_filter",
            AppError::MalformedEntry(_) => "malformed_entry",
            AppError::Format(_) => "format_failure",
            AppError::Http(_) => "store_error",
            AppError::Config(_) => "config_error",
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Http("Audit store request timed out".to_string())
        } else if err.is_connect() {
            AppError::Http("Failed to connect to audit store".to_string())
        } else {
            AppError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedEntry(format!("JSON parsing error: {}", err))
    }
}

impl From<FormatError> for AppError {
    fn from(err: FormatError) -> Self {
        AppError::Format(err.to_string())
    }
}

/// Error returned by a caller-supplied formatting strategy.
///
/// The diff builder never propagates it; the failing field falls back to the
/// built-in default output instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct FormatError(String);

impl FormatError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Result type alias for engine operations
pub type AppResult<T> = Result<T, AppError>;
