//! Query builder
//!
//! Executes planned statements against the store, scoped to one tenant
//! namespace per call.

pub mod statements;

use futures_util::stream::{BoxStream, StreamExt, TryStreamExt};
use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::QueryResult;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};
use tracing::debug;

use crate::domain::{
    ColumnType, GatewayError, GatewayResult, Identifier, Namespace, Row, RowPatch, SelectQuery,
    TableDescriptor,
};
use crate::infrastructure::Store;

pub use statements::StatementPlanner;
use statements::{COUNT_ALIAS, SUM_ALIAS};

/// Page size bounds for select (`[query]`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PageLimits {
    /// Page size when the request names none
    pub default_limit: u64,
    /// Largest page a request may ask for
    pub max_limit: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 1000,
        }
    }
}

impl PageLimits {
    /// Effective page size, always within `1..=max_limit`.
    pub fn clamp(&self, requested: Option<u64>) -> u64 {
        let max = self.max_limit.max(1);
        requested.unwrap_or(self.default_limit).clamp(1, max)
    }
}

/// Client table definition before validation.
#[derive(Debug, Clone)]
pub struct CreateTable {
    pub name: String,
    pub columns: IndexMap<String, String>,
    pub primary_key: Vec<String>,
}

#[derive(Clone)]
pub struct QueryBuilder {
    store: Store,
    limits: PageLimits,
}

impl QueryBuilder {
    pub fn new(store: Store, limits: PageLimits) -> Self {
        Self { store, limits }
    }

    fn planner<'a>(&self, namespace: &'a Namespace) -> StatementPlanner<'a> {
        StatementPlanner::new(self.store.dialect(), namespace)
    }

    /// Create the table if it does not exist yet.
    pub async fn create_table(
        &self,
        namespace: &Namespace,
        request: &CreateTable,
    ) -> GatewayResult<TableDescriptor> {
        let table = TableDescriptor::new(&request.name, &request.columns, &request.primary_key)?;
        let stmt = self.planner(namespace).create_table(&table);
        self.store.execute(stmt).await?;
        debug!(namespace = %namespace, table = %table.name, "Table ensured");
        Ok(table)
    }

    pub async fn list_tables(&self, namespace: &Namespace) -> GatewayResult<Vec<String>> {
        let stmt = self.planner(namespace).list_tables();
        let rows = self.store.query_all(stmt).await.map_err(|e| e.escalate())?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let physical: String = row
                .try_get("", "table_name")
                .map_err(|e| GatewayError::Internal(e.to_string()))?;
            if let Some(name) = self.store.dialect().tenant_table_name(namespace, &physical) {
                tables.push(name);
            }
        }
        Ok(tables)
    }

    pub async fn insert(&self, namespace: &Namespace, table: &str, row: &Row) -> GatewayResult<()> {
        let stmt = self.planner(namespace).insert(table, row)?;
        self.store.execute(stmt).await?;
        Ok(())
    }

    /// Lazily stream the selected rows. The stream is single-pass and holds
    /// a pooled connection until dropped.
    ///
    /// Filter values are typed by the table's declared columns, which costs
    /// one catalog lookup when the query has filters.
    pub async fn select<'a>(
        &'a self,
        namespace: &Namespace,
        table: &str,
        query: &SelectQuery,
    ) -> GatewayResult<BoxStream<'a, GatewayResult<JsonValue>>> {
        let limit = self.limits.clamp(query.limit);
        let filters = if query.filters.is_empty() {
            Row::new()
        } else {
            // every identifier is checked before the catalog is consulted
            std::iter::once(table)
                .chain(query.filters.keys().map(String::as_str))
                .chain(query.sort_by.as_deref())
                .try_for_each(|name| Identifier::parse(name).map(drop))?;
            let columns = self.column_types(namespace, table).await?;
            query.typed_filters(&columns)?
        };
        let stmt = self.planner(namespace).select(table, query, &filters, limit)?;
        let rows = self.store.stream_json(stmt).await?;
        Ok(rows.map(|row| row.map_err(GatewayError::from)).boxed())
    }

    /// Collect one page. Iteration shares the store deadline.
    pub async fn select_all(
        &self,
        namespace: &Namespace,
        table: &str,
        query: &SelectQuery,
    ) -> GatewayResult<Vec<JsonValue>> {
        let rows = self.select(namespace, table, query).await?;
        let deadline = self.store.deadline();
        tokio::time::timeout(deadline, rows.try_collect())
            .await
            .map_err(|_| GatewayError::StoreTimeout(deadline))?
    }

    /// Returns the number of rows changed; zero when no row has the key.
    pub async fn update(
        &self,
        namespace: &Namespace,
        table: &str,
        patch: &RowPatch,
    ) -> GatewayResult<u64> {
        let stmt = self.planner(namespace).update(table, patch)?;
        Ok(self.store.execute(stmt).await?)
    }

    pub async fn delete(
        &self,
        namespace: &Namespace,
        table: &str,
        id: Option<&JsonValue>,
    ) -> GatewayResult<u64> {
        let stmt = self.planner(namespace).delete(table, id)?;
        Ok(self.store.execute(stmt).await?)
    }

    /// Column name to declared type, in column order.
    pub async fn describe_schema(
        &self,
        namespace: &Namespace,
        table: &str,
    ) -> GatewayResult<IndexMap<String, String>> {
        let stmt = self.planner(namespace).describe_table(table)?;
        let rows = self.store.query_all(stmt).await.map_err(|e| e.escalate())?;
        if rows.is_empty() {
            return Err(GatewayError::TableNotFound);
        }

        let mut columns = IndexMap::with_capacity(rows.len());
        for row in rows {
            let name: String = row
                .try_get("", "column_name")
                .map_err(|e| GatewayError::Internal(e.to_string()))?;
            let data_type: String = row
                .try_get("", "data_type")
                .map_err(|e| GatewayError::Internal(e.to_string()))?;
            columns.insert(name, data_type.to_ascii_lowercase());
        }
        Ok(columns)
    }

    async fn column_types(
        &self,
        namespace: &Namespace,
        table: &str,
    ) -> GatewayResult<IndexMap<String, ColumnType>> {
        let schema = self.describe_schema(namespace, table).await?;
        Ok(schema
            .into_iter()
            .map(|(name, data_type)| {
                let column_type = ColumnType::from_catalog(&data_type).unwrap_or(ColumnType::Text);
                (name, column_type)
            })
            .collect())
    }

    pub async fn count(&self, namespace: &Namespace, table: &str) -> GatewayResult<u64> {
        let stmt = self.planner(namespace).count(table)?;
        let row = self
            .store
            .query_one(stmt)
            .await?
            .ok_or_else(|| GatewayError::Internal("count returned no row".to_string()))?;
        let count: i64 = row
            .try_get("", COUNT_ALIAS)
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(count.max(0) as u64)
    }

    /// Sum of a column; `null` for an empty table or an all-null column.
    pub async fn sum(
        &self,
        namespace: &Namespace,
        table: &str,
        column: &str,
    ) -> GatewayResult<JsonValue> {
        let stmt = self.planner(namespace).sum(table, column)?;
        let row = self.store.query_one(stmt).await?;
        Ok(row.as_ref().map_or(JsonValue::Null, read_total))
    }
}

/// Aggregate results come back as integer, float or numeric depending on
/// the backend and the column type.
fn read_total(row: &QueryResult) -> JsonValue {
    if let Ok(total) = row.try_get::<Option<i64>>("", SUM_ALIAS) {
        return total.map_or(JsonValue::Null, JsonValue::from);
    }
    if let Ok(total) = row.try_get::<Option<f64>>("", SUM_ALIAS) {
        return float_to_json(total);
    }
    if let Ok(total) = row.try_get::<Option<f32>>("", SUM_ALIAS) {
        return float_to_json(total.map(f64::from));
    }
    if let Ok(total) = row.try_get::<Option<Decimal>>("", SUM_ALIAS) {
        return float_to_json(total.and_then(|d| d.to_f64()));
    }
    JsonValue::Null
}

fn float_to_json(value: Option<f64>) -> JsonValue {
    value
        .and_then(Number::from_f64)
        .map_or(JsonValue::Null, JsonValue::Number)
}
