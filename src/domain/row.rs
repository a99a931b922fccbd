//! Row payloads and select parameters
//!
//! Rows travel as ordered JSON objects. Only scalars are storable; the
//! query string of a select is split into reserved paging/sorting keys and
//! equality filters, which stay raw until the table's column types are
//! known.

use std::str::FromStr;

use indexmap::IndexMap;
use serde_json::Value;

use super::error::GatewayError;
use super::schema::ColumnType;

/// Field name to value, in the order the client sent them.
pub type Row = IndexMap<String, Value>;

/// Name of the field that addresses a row in update and delete.
pub const ROW_KEY_FIELD: &str = "id";

/// Error for values that cannot be bound as a single scalar parameter.
pub fn not_scalar(field: &str) -> GatewayError {
    GatewayError::BadRequest(format!(
        "field {:?} must be a scalar value",
        field.chars().take(64).collect::<String>()
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortOrder::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortOrder::Desc)
        } else {
            Err(GatewayError::invalid_schema("order must be `asc` or `desc`"))
        }
    }
}

/// Unvalidated select parameters. Field names are checked when the
/// statement is planned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    /// Column name to raw query-string value.
    pub filters: IndexMap<String, String>,
    pub sort_by: Option<String>,
    pub order: SortOrder,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl SelectQuery {
    /// Split raw query parameters into paging, sorting and filters.
    /// `limit`, `offset`, `sort_by` and `order` are reserved; every other
    /// key is an equality filter.
    pub fn from_params(params: IndexMap<String, String>) -> Result<Self, GatewayError> {
        let mut query = SelectQuery::default();
        for (key, raw) in params {
            match key.as_str() {
                "limit" => query.limit = Some(parse_count("limit", &raw)?),
                "offset" => query.offset = parse_count("offset", &raw)?,
                "sort_by" => query.sort_by = Some(raw),
                "order" => query.order = raw.parse()?,
                _ => {
                    query.filters.insert(key, raw);
                }
            }
        }
        Ok(query)
    }

    /// Type each filter value by its column's declared type. A filter on a
    /// column the table does not have is `InvalidSchema`.
    pub fn typed_filters(
        &self,
        columns: &IndexMap<String, ColumnType>,
    ) -> Result<Row, GatewayError> {
        let mut typed = Row::with_capacity(self.filters.len());
        for (field, raw) in &self.filters {
            let column_type = columns.get(field).ok_or_else(|| {
                GatewayError::InvalidSchema(format!(
                    "unknown filter column {}",
                    field.chars().take(64).collect::<String>()
                ))
            })?;
            typed.insert(field.clone(), column_type.filter_value(field, raw)?);
        }
        Ok(typed)
    }
}

fn parse_count(name: &str, raw: &str) -> Result<u64, GatewayError> {
    raw.parse()
        .map_err(|_| GatewayError::BadRequest(format!("{} must be a non-negative integer", name)))
}

/// Fields to set on the row whose key is `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowPatch {
    pub id: Option<Value>,
    pub fields: Row,
}
