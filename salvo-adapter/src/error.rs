//! Adapter error type shared by every provider crate.

use thiserror::Error;

/// Errors an `Adapter` can return from a single turn.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdapterError {
    /// The underlying HTTP request failed before a response was received,
    /// or the provider returned a transient server-side error (5xx, 408).
    /// Worth retrying.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The provider rejected the request itself — a 4xx other than 401,
    /// 403, 408, or 429 (malformed payload, unknown model, unprocessable
    /// input, …). Retrying an unchanged request will fail identically.
    #[error("request rejected: {0}")]
    RequestRejected(String),

    /// The provider returned a rate-limit response.
    #[error("rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited {
        /// Provider-suggested backoff, if it sent one.
        retry_after_ms: Option<u64>,
    },

    /// The provider rejected the request's credentials.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The provider's response didn't match the shape this adapter expects.
    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),

    /// Provider-extras failed validation before the request was sent.
    #[error("invalid provider extras: {0}")]
    InvalidExtras(String),

    /// Anything else, preserved for debugging but not specially handled.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl AdapterError {
    /// Whether a retry is worth attempting for this failure. Used by the
    /// orchestrator's backoff loop to distinguish transient infrastructure
    /// hiccups from failures that will recur identically on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdapterError::RequestFailed(_) | AdapterError::RateLimited { .. })
    }
}
