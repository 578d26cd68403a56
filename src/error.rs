use serde::Serialize;
use thiserror::Error;

use crate::retry::Retryable;

/// Errors produced while building or validating rate-limit policy tables.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid rate limit policy for {provider}: {reason}")]
    InvalidPolicy { provider: String, reason: String },

    #[error("failed to parse policy table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure kinds reported by the downstream transport layer.
///
/// The retry layer never inspects provider wire formats; transports map
/// whatever their HTTP client raised into one of these variants before the
/// error reaches [`Retrier::invoke`](crate::retry::Retrier::invoke).
#[derive(Debug, Clone, Error, Serialize)]
pub enum ApiFailure {
    /// The provider explicitly rejected the request for rate-limit reasons.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Quota-style exhaustion signal (e.g. a resource-exhausted status).
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Any other HTTP-level rejection.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl Retryable for ApiFailure {
    /// Only the rate-limit class triggers backoff; everything else is the
    /// caller's problem.
    fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            ApiFailure::RateLimited(_)
                | ApiFailure::ResourceExhausted(_)
                | ApiFailure::Http { status: 429, .. }
        )
    }
}
