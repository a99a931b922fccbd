//! API router and OpenAPI document

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::common::{ErrorBody, MessageResponse};
use super::middleware::{tenant_gateway, GatewayState};
use super::modules::metrics::{http_metrics_middleware, prometheus_metrics, MetricsState};
use super::modules::request_id::request_id_middleware;
use super::modules::{aggregates, health, keys, rows, tables, usage};
use crate::application::{PageLimits, QueryBuilder, RateBudget, TenantDirectory, UsageLedger};
use crate::infrastructure::Store;

/// Unified router state. Each handler keeps its own `State<T>` extractor
/// and receives its slice through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub directory: TenantDirectory,
    pub queries: QueryBuilder,
    pub ledger: UsageLedger,
    pub budget: RateBudget,
    pub metrics: PrometheusHandle,
    pub started_at: Arc<Instant>,
}

impl AppState {
    pub fn new(
        store: Store,
        limits: PageLimits,
        budget: RateBudget,
        cost_per_call: Decimal,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            directory: TenantDirectory::new(store.clone()),
            queries: QueryBuilder::new(store.clone(), limits),
            ledger: UsageLedger::new(store.clone(), cost_per_call),
            store,
            budget,
            metrics,
            started_at: Arc::new(Instant::now()),
        }
    }
}

impl FromRef<AppState> for GatewayState {
    fn from_ref(s: &AppState) -> Self {
        GatewayState {
            directory: s.directory.clone(),
            budget: s.budget.clone(),
            ledger: s.ledger.clone(),
        }
    }
}

impl FromRef<AppState> for keys::KeyState {
    fn from_ref(s: &AppState) -> Self {
        keys::KeyState {
            directory: s.directory.clone(),
        }
    }
}

impl FromRef<AppState> for tables::TableState {
    fn from_ref(s: &AppState) -> Self {
        tables::TableState {
            queries: s.queries.clone(),
        }
    }
}

impl FromRef<AppState> for usage::UsageState {
    fn from_ref(s: &AppState) -> Self {
        usage::UsageState {
            ledger: s.ledger.clone(),
        }
    }
}

impl FromRef<AppState> for health::HealthState {
    fn from_ref(s: &AppState) -> Self {
        health::HealthState {
            store: s.store.clone(),
            started_at: Arc::clone(&s.started_at),
        }
    }
}

impl FromRef<AppState> for MetricsState {
    fn from_ref(s: &AppState) -> Self {
        MetricsState {
            handle: s.metrics.clone(),
        }
    }
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("API-Key"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        keys::issue_key,
        tables::create_table,
        tables::list_tables,
        rows::insert_row,
        rows::query_rows,
        rows::update_row,
        rows::delete_row,
        aggregates::table_schema,
        aggregates::row_count,
        aggregates::column_sum,
        usage::get_usage,
    ),
    components(
        schemas(
            ErrorBody,
            MessageResponse,
            health::HealthResponse,
            health::ComponentHealth,
            keys::IssuedKeyResponse,
            tables::CreateTableRequest,
            tables::CreateTableResponse,
            tables::TableListResponse,
            rows::RowPayload,
            rows::RowPatchPayload,
            rows::RowKeyPayload,
            rows::RowsResponse,
            aggregates::SchemaResponse,
            aggregates::CountResponse,
            aggregates::SumResponse,
            usage::UsageResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service and store reachability"),
        (name = "Keys", description = "API key issuance; each key owns one namespace"),
        (name = "Tables", description = "Table creation and listing within a namespace"),
        (name = "Rows", description = "Row insert, query, update and delete"),
        (name = "Aggregates", description = "Table schema, row counts and column sums"),
        (name = "Usage", description = "Metered calls and cost for the caller's key"),
    ),
    info(
        title = "LinkDB Gateway API",
        version = "0.1.0",
        description = "Multi-tenant REST access to a shared data store"
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create the API router with all routes
pub fn create_api_router(state: AppState) -> Router {
    let gateway = GatewayState::from_ref(&state);

    // Everything under the tenant gateway: authenticated, budgeted, metered.
    let tenant_routes = Router::new()
        .route(
            "/namespaces/{ns}/tables",
            get(tables::list_tables).post(tables::create_table),
        )
        .route(
            "/namespaces/{ns}/tables/{table}/rows",
            get(rows::query_rows)
                .post(rows::insert_row)
                .put(rows::update_row)
                .delete(rows::delete_row),
        )
        .route(
            "/namespaces/{ns}/tables/{table}/schema",
            get(aggregates::table_schema),
        )
        .route(
            "/namespaces/{ns}/tables/{table}/count",
            get(aggregates::row_count),
        )
        .route(
            "/namespaces/{ns}/tables/{table}/sum/{column}",
            get(aggregates::column_sum),
        )
        .route("/usage", get(usage::get_usage))
        .route_layer(middleware::from_fn_with_state(gateway, tenant_gateway));

    let public_routes = Router::new()
        .route("/keys", post(keys::issue_key))
        .route("/health", get(health::health_check))
        .route("/metrics", get(prometheus_metrics))
        .route("/api-doc/openapi.json", get(openapi_json));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(tenant_routes)
        .merge(public_routes)
        .with_state(state)
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
}
