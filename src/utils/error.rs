//! Error handling for vidresolve

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Caller-visible failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedPlatform,
    MissingCredential,
    Transport,
    NotFound,
    ProcessFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedPlatform => "unsupported_platform",
            ErrorKind::MissingCredential => "missing_credential",
            ErrorKind::Transport => "transport",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ProcessFailure => "process_failure",
        }
    }
}

/// Main error type for vidresolve
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No resolver accepts URL: {0}")]
    UnsupportedPlatform(String),

    #[error("Session credential not available: {0}")]
    MissingCredential(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Browser automation failed: {0}")]
    Browser(String),

    #[error("Resolution exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("yt-dlp not found. Please install yt-dlp")]
    YtDlpNotFound,

    #[error("External process failed: {0}")]
    ProcessFailure(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::UnsupportedPlatform(_) => ErrorKind::UnsupportedPlatform,
            ResolveError::MissingCredential(_) => ErrorKind::MissingCredential,
            ResolveError::YtDlpNotFound | ResolveError::ProcessFailure(_) => {
                ErrorKind::ProcessFailure
            }
            ResolveError::Transport(_)
            | ResolveError::Browser(_)
            | ResolveError::DeadlineExceeded(_)
            | ResolveError::NetworkError(_)
            | ResolveError::IoError(_)
            | ResolveError::SerializationError(_)
            | ResolveError::Config(_) => ErrorKind::Transport,
        }
    }

    /// Whether trying the same URL again later could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ResolveError::Transport(_)
                | ResolveError::Browser(_)
                | ResolveError::DeadlineExceeded(_)
                | ResolveError::NetworkError(_)
        )
    }
}
