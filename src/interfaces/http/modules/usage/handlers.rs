//! Usage handler

use axum::{extract::State, Extension, Json};

use super::dto::UsageResponse;
use crate::application::UsageLedger;
use crate::domain::{GatewayError, Tenant};
use crate::interfaces::http::common::ErrorBody;

#[derive(Clone)]
pub struct UsageState {
    pub ledger: UsageLedger,
}

/// The figure covers calls recorded before this one; the usage request
/// itself is metered once it completes.
#[utoipa::path(
    get,
    path = "/usage",
    tag = "Usage",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Calls and cost for the caller's key", body = UsageResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    )
)]
pub async fn get_usage(
    State(state): State<UsageState>,
    Extension(tenant): Extension<Tenant>,
) -> Result<Json<UsageResponse>, GatewayError> {
    let summary = state.ledger.usage(&tenant.key_digest).await?;
    Ok(Json(summary.into()))
}
