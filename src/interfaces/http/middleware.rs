//! Tenant gateway middleware for Axum
//!
//! Every tenant route passes through `tenant_gateway`: the `API-Key` header
//! is resolved to a tenant, the caller's rate budget is charged, the request
//! is dispatched with the tenant in its extensions, and a successful
//! response is metered in the usage ledger.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::application::{RateBudget, TenantDirectory, UsageLedger};
use crate::domain::GatewayError;
use crate::infrastructure::crypto::digest_prefix;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "api-key";

/// State shared by the gateway middleware
#[derive(Clone)]
pub struct GatewayState {
    pub directory: TenantDirectory,
    pub budget: RateBudget,
    pub ledger: UsageLedger,
}

/// Ledger label for a request: method plus the route template, so
/// `/namespaces/ks_x/tables` and `/namespaces/ks_y/tables` share one label.
fn endpoint_label(request: &Request<Body>) -> String {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    format!("{} {}", request.method(), path)
}

pub async fn tenant_gateway(
    State(state): State<GatewayState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .map(String::from);
    let Some(presented) = presented else {
        return GatewayError::Unauthorized.into_response();
    };

    let tenant = match state.directory.authenticate(&presented).await {
        Ok(tenant) => tenant,
        Err(err) => return err.into_response(),
    };

    if let Err(err) = state.budget.check(&tenant.key_digest) {
        tracing::info!(
            key = digest_prefix(&tenant.key_digest),
            "Request budget exhausted"
        );
        return err.into_response();
    }

    let endpoint = endpoint_label(&request);
    let key_digest = tenant.key_digest.clone();
    request.extensions_mut().insert(tenant);

    let response = next.run(request).await;

    if response.status().is_success() {
        state.ledger.record(&key_digest, &endpoint).await;
    }
    response
}
