//! Scorer error types.

use thiserror::Error;

/// Errors that can occur when calling an external criterion scorer.
#[derive(Debug, Error)]
pub enum ScorerError {
    /// The service returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The service returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response body was not a valid score map.
    #[error("invalid scorer response: {0}")]
    InvalidResponse(String),
}

impl ScorerError {
    /// Whether retrying the same request cannot succeed.
    pub fn is_permanent(&self) -> bool {
        match self {
            ScorerError::AuthenticationFailed(_) | ScorerError::InvalidResponse(_) => true,
            ScorerError::ApiError { status, .. } => (400..500).contains(status),
            ScorerError::RateLimited { .. }
            | ScorerError::Timeout(_)
            | ScorerError::NetworkError(_) => false,
        }
    }
}
