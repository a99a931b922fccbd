//! JSON body extractors for Axum
//!
//! `JsonBody<T>` works like `axum::Json<T>` but rejects with
//! `GatewayError::BadRequest`, so a body that does not decode gets the same
//! error shape as every other failure. `ValidatedJson<T>` additionally runs
//! `validator::Validate::validate()`; a body that decodes but fails
//! validation is `InvalidSchema`. Both render as 400.

use axum::extract::FromRequest;
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::domain::GatewayError;

pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| GatewayError::BadRequest(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// An extractor that deserializes JSON and validates it.
///
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct CreateTableRequest {
///     #[validate(length(min = 1, max = 48))]
///     table_name: String,
/// }
///
/// async fn handler(ValidatedJson(body): ValidatedJson<CreateTableRequest>) {}
/// ```
pub struct ValidatedJson<T>(pub T);

fn describe(errors: &ValidationErrors) -> String {
    let field_errors: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let msg = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, msg)
            })
        })
        .collect();

    if field_errors.is_empty() {
        "validation failed".to_string()
    } else {
        field_errors.join("; ")
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;

        value
            .validate()
            .map_err(|errors| GatewayError::InvalidSchema(describe(&errors)))?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct TestBody {
        #[validate(length(min = 1, max = 10))]
        name: String,
    }

    async fn handler(ValidatedJson(body): ValidatedJson<TestBody>) -> String {
        body.name
    }

    fn app() -> Router {
        Router::new().route("/test", post(handler))
    }

    async fn send(body: &'static str) -> axum::http::Response<Body> {
        use tower::Service;
        let req = Request::builder()
            .method("POST")
            .uri("/test")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let mut svc = app().into_service();
        svc.call(req).await.unwrap()
    }

    async fn message(resp: axum::http::Response<Body>) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "error");
        json["message"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn valid_body_passes_through() {
        let resp = send(r#"{"name": "orders"}"#).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"orders");
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let resp = send("{not json").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(message(resp).await.starts_with("malformed request"));
    }

    #[tokio::test]
    async fn validation_failure_is_an_invalid_schema() {
        let resp = send(r#"{"name": "far-too-long-for-this"}"#).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let msg = message(resp).await;
        assert!(msg.starts_with("invalid schema"));
        assert!(msg.contains("name"));
    }
}
