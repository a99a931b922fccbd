//! Schema, count and sum handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::dto::{CountResponse, SchemaResponse, SumResponse};
use crate::domain::{GatewayError, Tenant};
use crate::interfaces::http::common::ErrorBody;
use crate::interfaces::http::modules::tables::TableState;

#[utoipa::path(
    get,
    path = "/namespaces/{ns}/tables/{table}/schema",
    tag = "Aggregates",
    security(("api_key" = [])),
    params(
        ("ns" = String, Path, description = "Caller's namespace"),
        ("table" = String, Path, description = "Table name")
    ),
    responses(
        (status = 200, description = "Column types", body = SchemaResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 404, description = "Table not found", body = ErrorBody)
    )
)]
pub async fn table_schema(
    State(state): State<TableState>,
    Extension(tenant): Extension<Tenant>,
    Path((ns, table)): Path<(String, String)>,
) -> Result<Json<SchemaResponse>, GatewayError> {
    let namespace = tenant.scope(&ns)?;
    let columns = state.queries.describe_schema(namespace, &table).await?;
    Ok(Json(SchemaResponse { columns }))
}

#[utoipa::path(
    get,
    path = "/namespaces/{ns}/tables/{table}/count",
    tag = "Aggregates",
    security(("api_key" = [])),
    params(
        ("ns" = String, Path, description = "Caller's namespace"),
        ("table" = String, Path, description = "Table name")
    ),
    responses(
        (status = 200, description = "Row count", body = CountResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 404, description = "Table not found", body = ErrorBody)
    )
)]
pub async fn row_count(
    State(state): State<TableState>,
    Extension(tenant): Extension<Tenant>,
    Path((ns, table)): Path<(String, String)>,
) -> Result<Json<CountResponse>, GatewayError> {
    let namespace = tenant.scope(&ns)?;
    let count = state.queries.count(namespace, &table).await?;
    Ok(Json(CountResponse { count }))
}

#[utoipa::path(
    get,
    path = "/namespaces/{ns}/tables/{table}/sum/{column}",
    tag = "Aggregates",
    security(("api_key" = [])),
    params(
        ("ns" = String, Path, description = "Caller's namespace"),
        ("table" = String, Path, description = "Table name"),
        ("column" = String, Path, description = "Numeric column to sum")
    ),
    responses(
        (status = 200, description = "Column total", body = SumResponse),
        (status = 400, description = "Invalid column", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 404, description = "Table not found", body = ErrorBody)
    )
)]
pub async fn column_sum(
    State(state): State<TableState>,
    Extension(tenant): Extension<Tenant>,
    Path((ns, table, column)): Path<(String, String, String)>,
) -> Result<Json<SumResponse>, GatewayError> {
    let namespace = tenant.scope(&ns)?;
    let total = state.queries.sum(namespace, &table, &column).await?;
    Ok(Json(SumResponse { total }))
}
