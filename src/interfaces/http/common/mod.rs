//! Shared HTTP response types

pub mod validated_json;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::domain::GatewayError;

pub use validated_json::{JsonBody, ValidatedJson};

/// Error body: `{"status": "error", "message": "..."}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Plain acknowledgement: `{"message": "..."}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::InvalidSchema(_)
            | GatewayError::MissingKey
            | GatewayError::BadRequest(_)
            | GatewayError::StoreRejected(_) => StatusCode::BAD_REQUEST,
            GatewayError::TableNotFound => StatusCode::NOT_FOUND,
            GatewayError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::StoreTimeout(_) | GatewayError::StoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to the client. Store and internal detail stays
    /// in the logs.
    fn public_message(&self) -> String {
        match self {
            GatewayError::StoreRejected(_) => "the store rejected the request".to_string(),
            GatewayError::StoreTimeout(_) | GatewayError::StoreUnavailable(_) => {
                "service temporarily unavailable".to_string()
            }
            GatewayError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            GatewayError::Internal(detail) => error!(detail = %detail, "Request failed"),
            GatewayError::StoreTimeout(_)
            | GatewayError::StoreUnavailable(_)
            | GatewayError::StoreRejected(_) => warn!(error = %self, "Store call failed"),
            _ => {}
        }

        let mut response = (status, Json(ErrorBody::new(self.public_message()))).into_response();
        if let GatewayError::Throttled { retry_after } = &self {
            // Whole seconds, rounded up, never zero.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            if let Ok(value) = HeaderValue::from_str(&secs.max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::time::Duration;

    async fn body_of(response: Response) -> ErrorBody {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn maps_the_taxonomy_to_status_codes() {
        let cases = [
            (GatewayError::Unauthorized, StatusCode::UNAUTHORIZED),
            (GatewayError::invalid_schema("x"), StatusCode::BAD_REQUEST),
            (GatewayError::MissingKey, StatusCode::BAD_REQUEST),
            (GatewayError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (GatewayError::StoreRejected("x".into()), StatusCode::BAD_REQUEST),
            (GatewayError::TableNotFound, StatusCode::NOT_FOUND),
            (
                GatewayError::StoreTimeout(Duration::from_secs(1)),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                GatewayError::StoreUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (GatewayError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn internal_detail_is_not_returned() {
        let response = GatewayError::Internal("password=hunter2".into()).into_response();
        let body = body_of(response).await;
        assert_eq!(body.status, "error");
        assert!(!body.message.contains("hunter2"));

        let response = GatewayError::StoreRejected("no such column: secret".into()).into_response();
        assert!(!body_of(response).await.message.contains("secret"));
    }

    #[tokio::test]
    async fn throttled_carries_retry_after() {
        let response = GatewayError::Throttled {
            retry_after: Duration::from_millis(2500),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "3");

        let response = GatewayError::Throttled {
            retry_after: Duration::ZERO,
        }
        .into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }

    #[tokio::test]
    async fn client_errors_keep_their_message() {
        let body = body_of(GatewayError::MissingKey.into_response()).await;
        assert_eq!(body.message, "the `id` field is required");
    }
}
