//! Table handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::dto::{CreateTableRequest, CreateTableResponse, TableListResponse};
use crate::application::QueryBuilder;
use crate::domain::{GatewayError, Tenant};
use crate::interfaces::http::common::{ErrorBody, ValidatedJson};

/// State for every handler that reaches tenant tables
#[derive(Clone)]
pub struct TableState {
    pub queries: QueryBuilder,
}

#[utoipa::path(
    post,
    path = "/namespaces/{ns}/tables",
    tag = "Tables",
    security(("api_key" = [])),
    params(("ns" = String, Path, description = "Caller's namespace")),
    request_body = CreateTableRequest,
    responses(
        (status = 200, description = "Table exists", body = CreateTableResponse),
        (status = 400, description = "Invalid schema", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    )
)]
pub async fn create_table(
    State(state): State<TableState>,
    Extension(tenant): Extension<Tenant>,
    Path(ns): Path<String>,
    ValidatedJson(request): ValidatedJson<CreateTableRequest>,
) -> Result<Json<CreateTableResponse>, GatewayError> {
    let namespace = tenant.scope(&ns)?;
    let table = state
        .queries
        .create_table(namespace, &request.into())
        .await?;

    Ok(Json(CreateTableResponse {
        status: "success".to_string(),
        message: format!(
            "Table {} created successfully in namespace {}.",
            table.name, namespace
        ),
    }))
}

#[utoipa::path(
    get,
    path = "/namespaces/{ns}/tables",
    tag = "Tables",
    security(("api_key" = [])),
    params(("ns" = String, Path, description = "Caller's namespace")),
    responses(
        (status = 200, description = "Tables in the namespace", body = TableListResponse),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    )
)]
pub async fn list_tables(
    State(state): State<TableState>,
    Extension(tenant): Extension<Tenant>,
    Path(ns): Path<String>,
) -> Result<Json<TableListResponse>, GatewayError> {
    let namespace = tenant.scope(&ns)?;
    let tables = state.queries.list_tables(namespace).await?;
    Ok(Json(TableListResponse { tables }))
}
