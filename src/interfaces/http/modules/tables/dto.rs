//! Table DTOs

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::CreateTable;

/// `{"table_name": "t", "columns": {"id": "int PRIMARY KEY", "name": "text"}}`
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateTableRequest {
    #[validate(length(min = 1, max = 48))]
    pub table_name: String,
    /// Column name to declared type, in order. A type may carry a
    /// `PRIMARY KEY` suffix.
    #[schema(value_type = Object)]
    pub columns: IndexMap<String, String>,
    /// Key columns, in addition to any marked `PRIMARY KEY`. The key must
    /// come out as the single column `id`.
    #[serde(default)]
    pub primary_key: Vec<String>,
}

impl From<CreateTableRequest> for CreateTable {
    fn from(request: CreateTableRequest) -> Self {
        Self {
            name: request.table_name,
            columns: request.columns,
            primary_key: request.primary_key,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateTableResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TableListResponse {
    pub tables: Vec<String>,
}
