//! Key issuance handler

use axum::{extract::State, Json};

use super::dto::IssuedKeyResponse;
use crate::application::TenantDirectory;
use crate::domain::GatewayError;
use crate::interfaces::http::common::ErrorBody;

/// Key handler state
#[derive(Clone)]
pub struct KeyState {
    pub directory: TenantDirectory,
}

#[utoipa::path(
    post,
    path = "/keys",
    tag = "Keys",
    responses(
        (status = 200, description = "Key issued", body = IssuedKeyResponse),
        (status = 503, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn issue_key(
    State(state): State<KeyState>,
) -> Result<Json<IssuedKeyResponse>, GatewayError> {
    let record = state.directory.issue().await?;
    Ok(Json(record.into()))
}
