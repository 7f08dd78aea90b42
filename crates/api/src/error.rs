//! Error taxonomy for the remote resource client.
//!
//! The split between transient and non-transient kinds drives the retry
//! helper: transient errors are retried with backoff, everything else is
//! surfaced immediately. The orchestrator additionally uses the `Auth`
//! variant to distinguish fatal authentication failures from per-item ones.

use thiserror::Error;

/// A failure talking to the remote tag-management service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No token could be discovered from the environment or token file.
    #[error("no API credentials found: set TAGFORGE_API_TOKEN or write a token to {hint}")]
    MissingCredentials { hint: String },

    /// The configured base URL failed validation.
    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The service rejected our credentials (HTTP 401/403).
    #[error("authentication rejected (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// HTTP 429; retried before being surfaced.
    #[error("rate limited by the remote service: {message}")]
    RateLimited { message: String },

    /// Connection, timeout, or protocol-level failure.
    #[error("request transport failed: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },

    /// The service refused the payload (HTTP 400/422 and other 4xx).
    #[error("remote service rejected the payload (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// A resource with the same name already exists (HTTP 409).
    #[error("name conflict reported by the remote service: {message}")]
    Conflict { message: String },

    /// Server-side failure (HTTP 5xx); retried before being surfaced.
    #[error("remote service error (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    /// No accessible account contains the requested container.
    #[error("could not find a container matching '{identifier}' in any accessible account")]
    ContainerNotFound { identifier: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response payload: {detail}")]
    UnexpectedPayload { detail: String },
}

impl ApiError {
    /// Whether the retry helper should attempt this call again.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::RateLimited { .. } | ApiError::Upstream { .. } => true,
            ApiError::Transport { source } => source.is_timeout() || source.is_connect(),
            _ => false,
        }
    }

    /// Classify a non-success HTTP status plus response body.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ApiError::Auth { status, message },
            409 => ApiError::Conflict { message },
            429 => ApiError::RateLimited { message },
            400..=499 => ApiError::Rejected { status, message },
            _ => ApiError::Upstream { status, message },
        }
    }
}
