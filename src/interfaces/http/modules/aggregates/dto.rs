//! Aggregate DTOs

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SchemaResponse {
    /// Column name to store type, in column order
    #[schema(value_type = Object)]
    pub columns: IndexMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SumResponse {
    /// `null` when the table is empty or the column holds only nulls
    #[schema(value_type = Option<f64>)]
    pub total: Value,
}
