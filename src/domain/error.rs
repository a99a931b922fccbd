//! Gateway errors
//!
//! One taxonomy for every failure a client can observe. The HTTP layer maps
//! each variant to a status code; store failures keep their classification.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the tenant directory, query builder and gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing, malformed, unknown or mismatched API key.
    #[error("unauthorized")]
    Unauthorized,

    /// An identifier, declared type or table shape was rejected.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Update/delete payload without an `id`.
    #[error("the `id` field is required")]
    MissingKey,

    /// Body or query string could not be decoded into the expected shape.
    #[error("malformed request: {0}")]
    BadRequest(String),

    #[error("table not found")]
    TableNotFound,

    /// The caller exhausted its request budget for the current window.
    #[error("request budget exhausted, retry in {retry_after:?}")]
    Throttled { retry_after: Duration },

    #[error("store call exceeded its deadline of {0:?}")]
    StoreTimeout(Duration),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store refused a well-formed statement (unknown column, type mismatch).
    #[error("store rejected the statement: {0}")]
    StoreRejected(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Whether the caller may succeed by retrying the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::StoreTimeout(_)
                | GatewayError::StoreUnavailable(_)
                | GatewayError::Throttled { .. }
        )
    }

    pub fn invalid_schema(message: impl Into<String>) -> Self {
        GatewayError::InvalidSchema(message.into())
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_are_retryable() {
        assert!(GatewayError::StoreTimeout(Duration::from_secs(1)).is_retryable());
        assert!(GatewayError::StoreUnavailable("pool".into()).is_retryable());
        assert!(GatewayError::Throttled {
            retry_after: Duration::from_secs(3)
        }
        .is_retryable());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!GatewayError::Unauthorized.is_retryable());
        assert!(!GatewayError::MissingKey.is_retryable());
        assert!(!GatewayError::invalid_schema("bad").is_retryable());
        assert!(!GatewayError::TableNotFound.is_retryable());
    }
}
