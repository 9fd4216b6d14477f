//! Error types for the external adapters.

use thiserror::Error;

/// Errors raised by a [`CompletionAdapter`](super::CompletionAdapter).
///
/// "The model returned nothing" is not an error: adapters signal it with
/// `Ok(None)`. These variants cover transport and protocol failures only.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The request could not be delivered or the server answered with a failure status.
    #[error("Completion transport failed: {message}")]
    Transport {
        status_code: Option<u16>,
        message: String,
        retryable: bool,
    },

    /// The provider rejected the credentials or the request itself.
    #[error("Completion request rejected: {0}")]
    Rejected(String),

    /// The provider answered, but the body could not be understood.
    #[error("Invalid completion response: {0}")]
    InvalidResponse(String),
}

impl CompletionError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>, retryable: bool) -> Self {
        Self::Transport {
            status_code: None,
            message: message.into(),
            retryable,
        }
    }

    /// Check if this error should consume an attempt and be retried.
    ///
    /// Returns `true` for connection failures, timeouts, rate limiting and
    /// server errors, and for unreadable bodies. Returns `false` for rejected
    /// requests (bad credentials, malformed requests): retrying those cannot
    /// succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Transport { retryable, .. } => *retryable,
            CompletionError::InvalidResponse(_) => true,
            CompletionError::Rejected(_) => false,
        }
    }
}

/// Errors raised by a [`SearchAdapter`](super::SearchAdapter).
#[derive(Debug, Error)]
pub enum SearchError {
    /// The search backend failed for this query.
    #[error("Search failed for query '{query}': {message}")]
    Failed { query: String, message: String },

    /// The search backend is not configured.
    #[error("Search backend unavailable: {0}")]
    Unavailable(String),
}

impl SearchError {
    pub fn failed(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            query: query.into(),
            message: message.into(),
        }
    }
}
