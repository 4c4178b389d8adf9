use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by pet-store client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Base URL is not a valid absolute URL.
    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    /// Endpoint path could not be joined to the base URL.
    #[error("invalid endpoint path '{0}'")]
    InvalidPath(String),

    /// Retry policy settings are out of range.
    #[error("invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    /// HTTP transport-layer request failure. Never retried.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body could not be decoded as JSON, or did not match the
    /// expected model.
    #[error("failed to decode JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// Non-success HTTP status that the retry policy treats as terminal.
    #[error("server returned status {status} for {url}: {body}")]
    UnexpectedStatus {
        status: StatusCode,
        url: String,
        body: String,
    },

    /// A retryable status persisted through every allowed attempt.
    #[error("giving up on {url} after {attempts} attempts, last status {status}: {body}")]
    RetriesExhausted {
        attempts: u32,
        status: StatusCode,
        url: String,
        body: String,
    },

    /// The call deadline would be passed before the next attempt.
    #[error("deadline exceeded after {attempts} attempts ({elapsed:?}), last status {last_status}")]
    DeadlineExceeded {
        attempts: u32,
        elapsed: Duration,
        last_status: StatusCode,
    },
}

impl ClientError {
    /// Returns the HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::UnexpectedStatus { status, .. } | Self::RetriesExhausted { status, .. } => {
                Some(*status)
            }
            Self::DeadlineExceeded { last_status, .. } => Some(*last_status),
            Self::Transport(error) => error.status(),
            _ => None,
        }
    }
}
