//! Row DTOs
//!
//! Bodies are free-form column maps. Values must be JSON scalars; the query
//! builder rejects arrays and objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::{Row, RowPatch, ROW_KEY_FIELD};

/// Column values for a new row.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct RowPayload(pub Row);

/// `id` selects the row; every other field is assigned.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct RowPatchPayload(pub Row);

impl From<RowPatchPayload> for RowPatch {
    fn from(RowPatchPayload(mut fields): RowPatchPayload) -> Self {
        let id = fields.shift_remove(ROW_KEY_FIELD).filter(|id| !id.is_null());
        Self { id, fields }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RowKeyPayload {
    #[schema(value_type = Option<Object>)]
    pub id: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RowsResponse {
    pub status: String,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Value>,
}
