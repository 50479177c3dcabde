//! Error types surfaced by the placement API client.

use thiserror::Error;

/// Fallback shown when neither the server nor the transport produced a usable message.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Errors that can occur while talking to the placement backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),

    /// The HTTP client gave up waiting for the server.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a failure status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The server rejected the payload (400/422 or `success: false`).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The session token is missing or was rejected.
    #[error("not authenticated")]
    Unauthorized,

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Message suitable for inline display, preferring whatever the server said.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { message, .. } | Self::Validation(message)
                if !message.trim().is_empty() =>
            {
                message.clone()
            }
            Self::Network(_) => {
                "Could not reach the placement server. Check your connection.".to_string()
            }
            Self::Timeout => "The placement server took too long to respond.".to_string(),
            Self::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            Self::Server { .. } | Self::Validation(_) | Self::Decode(_) => {
                GENERIC_FAILURE.to_string()
            }
        }
    }

    /// Whether a manual retry has a reasonable chance of succeeding.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Server { status, .. } => *status >= 500,
            Self::Validation(_) | Self::Unauthorized | Self::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
