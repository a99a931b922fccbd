//! Row handlers

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Extension, Json,
};
use indexmap::IndexMap;

use super::dto::{RowKeyPayload, RowPatchPayload, RowPayload, RowsResponse};
use crate::domain::{GatewayError, SelectQuery, Tenant};
use crate::interfaces::http::common::{ErrorBody, JsonBody, MessageResponse};
use crate::interfaces::http::modules::tables::TableState;

#[utoipa::path(
    post,
    path = "/namespaces/{ns}/tables/{table}/rows",
    tag = "Rows",
    security(("api_key" = [])),
    params(
        ("ns" = String, Path, description = "Caller's namespace"),
        ("table" = String, Path, description = "Table name")
    ),
    request_body = RowPayload,
    responses(
        (status = 200, description = "Row inserted", body = MessageResponse),
        (status = 400, description = "Invalid row", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 404, description = "Table not found", body = ErrorBody)
    )
)]
pub async fn insert_row(
    State(state): State<TableState>,
    Extension(tenant): Extension<Tenant>,
    Path((ns, table)): Path<(String, String)>,
    JsonBody(RowPayload(row)): JsonBody<RowPayload>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let namespace = tenant.scope(&ns)?;
    state.queries.insert(namespace, &table, &row).await?;
    Ok(Json(MessageResponse::new("Data inserted successfully.")))
}

/// Reserved parameters are `limit`, `offset`, `sort_by` and `order`; every
/// other parameter is an equality filter on the column of that name.
#[utoipa::path(
    get,
    path = "/namespaces/{ns}/tables/{table}/rows",
    tag = "Rows",
    security(("api_key" = [])),
    params(
        ("ns" = String, Path, description = "Caller's namespace"),
        ("table" = String, Path, description = "Table name"),
        ("limit" = Option<u64>, Query, description = "Page size, default 50"),
        ("offset" = Option<u64>, Query, description = "Rows to skip"),
        ("sort_by" = Option<String>, Query, description = "Column to sort on"),
        ("order" = Option<String>, Query, description = "asc or desc")
    ),
    responses(
        (status = 200, description = "Matching rows", body = RowsResponse),
        (status = 400, description = "Invalid query", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 404, description = "Table not found", body = ErrorBody)
    )
)]
pub async fn query_rows(
    State(state): State<TableState>,
    Extension(tenant): Extension<Tenant>,
    Path((ns, table)): Path<(String, String)>,
    params: Result<Query<IndexMap<String, String>>, QueryRejection>,
) -> Result<Json<RowsResponse>, GatewayError> {
    let namespace = tenant.scope(&ns)?;
    let Query(params) = params.map_err(|e| GatewayError::BadRequest(e.body_text()))?;
    let query = SelectQuery::from_params(params)?;

    let data = state.queries.select_all(namespace, &table, &query).await?;
    Ok(Json(RowsResponse {
        status: "success".to_string(),
        data,
    }))
}

#[utoipa::path(
    put,
    path = "/namespaces/{ns}/tables/{table}/rows",
    tag = "Rows",
    security(("api_key" = [])),
    params(
        ("ns" = String, Path, description = "Caller's namespace"),
        ("table" = String, Path, description = "Table name")
    ),
    request_body = RowPatchPayload,
    responses(
        (status = 200, description = "Row updated", body = MessageResponse),
        (status = 400, description = "Missing id or invalid fields", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 404, description = "Table not found", body = ErrorBody)
    )
)]
pub async fn update_row(
    State(state): State<TableState>,
    Extension(tenant): Extension<Tenant>,
    Path((ns, table)): Path<(String, String)>,
    JsonBody(payload): JsonBody<RowPatchPayload>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let namespace = tenant.scope(&ns)?;
    let changed = state
        .queries
        .update(namespace, &table, &payload.into())
        .await?;

    let message = if changed == 0 {
        "No row has that id; nothing was updated."
    } else {
        "Data updated successfully."
    };
    Ok(Json(MessageResponse::new(message)))
}

#[utoipa::path(
    delete,
    path = "/namespaces/{ns}/tables/{table}/rows",
    tag = "Rows",
    security(("api_key" = [])),
    params(
        ("ns" = String, Path, description = "Caller's namespace"),
        ("table" = String, Path, description = "Table name")
    ),
    request_body = RowKeyPayload,
    responses(
        (status = 200, description = "Row deleted", body = MessageResponse),
        (status = 400, description = "Missing id", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 404, description = "Table not found", body = ErrorBody)
    )
)]
pub async fn delete_row(
    State(state): State<TableState>,
    Extension(tenant): Extension<Tenant>,
    Path((ns, table)): Path<(String, String)>,
    JsonBody(payload): JsonBody<RowKeyPayload>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let namespace = tenant.scope(&ns)?;
    state
        .queries
        .delete(namespace, &table, payload.id.as_ref())
        .await?;
    Ok(Json(MessageResponse::new("Data deleted successfully.")))
}
