//! Table descriptors and declared column types

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde_json::{Number, Value};

use super::error::GatewayError;
use super::identifier::Identifier;
use super::row::ROW_KEY_FIELD;

/// Column types a tenant may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    BigInt,
    SmallInt,
    Text,
    Boolean,
    Float,
    Double,
    Decimal,
    Timestamp,
    Date,
    Uuid,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::BigInt => "bigint",
            ColumnType::SmallInt => "smallint",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Decimal => "decimal",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
            ColumnType::Uuid => "uuid",
        }
    }

    /// Classify a type name reported by the store catalog. Backends spell
    /// types their own way (`integer`, `double precision`, `uuid_text`,
    /// `timestamp with time zone`), so this matches on fragments.
    pub fn from_catalog(data_type: &str) -> Option<Self> {
        let t = data_type.to_ascii_lowercase();
        let column_type = if t.contains("uuid") {
            ColumnType::Uuid
        } else if t.contains("timestamp") || t.contains("datetime") {
            ColumnType::Timestamp
        } else if t.contains("date") {
            ColumnType::Date
        } else if t.contains("bool") {
            ColumnType::Boolean
        } else if t.contains("smallint") {
            ColumnType::SmallInt
        } else if t.contains("bigint") {
            ColumnType::BigInt
        } else if t.contains("int") {
            ColumnType::Int
        } else if t.contains("double") || t.contains("real") {
            ColumnType::Double
        } else if t.contains("float") {
            ColumnType::Float
        } else if t.contains("numeric") || t.contains("decimal") {
            ColumnType::Decimal
        } else if t.contains("char") || t.contains("text") || t.contains("clob") {
            ColumnType::Text
        } else {
            return None;
        };
        Some(column_type)
    }

    /// Convert a query-string filter value for a column of this type.
    /// Text-like columns get the string unchanged.
    pub fn filter_value(&self, column: &str, raw: &str) -> Result<Value, GatewayError> {
        let mismatch = |expected: &str| {
            GatewayError::BadRequest(format!(
                "filter on {} expects {}",
                column.chars().take(64).collect::<String>(),
                expected
            ))
        };
        match self {
            ColumnType::Int | ColumnType::BigInt | ColumnType::SmallInt => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| mismatch("an integer")),
            ColumnType::Float | ColumnType::Double | ColumnType::Decimal => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| mismatch("a number")),
            ColumnType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(mismatch("`true` or `false`")),
            },
            ColumnType::Text | ColumnType::Timestamp | ColumnType::Date | ColumnType::Uuid => {
                Ok(Value::String(raw.to_string()))
            }
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(ColumnType::Int),
            "bigint" => Ok(ColumnType::BigInt),
            "smallint" | "tinyint" => Ok(ColumnType::SmallInt),
            "text" | "varchar" | "ascii" | "string" => Ok(ColumnType::Text),
            "boolean" | "bool" => Ok(ColumnType::Boolean),
            "float" => Ok(ColumnType::Float),
            "double" => Ok(ColumnType::Double),
            "decimal" | "numeric" => Ok(ColumnType::Decimal),
            "timestamp" => Ok(ColumnType::Timestamp),
            "date" => Ok(ColumnType::Date),
            "uuid" | "timeuuid" => Ok(ColumnType::Uuid),
            other => Err(GatewayError::InvalidSchema(format!(
                "unsupported column type {:?}",
                other.chars().take(32).collect::<String>()
            ))),
        }
    }
}

/// A declared column: type plus whether the declaration carried a
/// `PRIMARY KEY` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDecl {
    pub column_type: ColumnType,
    pub primary_key: bool,
}

impl FromStr for ColumnDecl {
    type Err = GatewayError;

    /// Accepts `<type>` or `<type> PRIMARY KEY`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<String> = s
            .split_whitespace()
            .map(|t| t.to_ascii_lowercase())
            .collect();

        match tokens.as_slice() {
            [ty] => Ok(ColumnDecl {
                column_type: ty.parse()?,
                primary_key: false,
            }),
            [ty, primary, key] if primary == "primary" && key == "key" => Ok(ColumnDecl {
                column_type: ty.parse()?,
                primary_key: true,
            }),
            _ => Err(GatewayError::InvalidSchema(format!(
                "column declaration {:?} must be `<type>` or `<type> PRIMARY KEY`",
                s.chars().take(64).collect::<String>()
            ))),
        }
    }
}

/// A validated table definition, ready for statement planning.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    pub name: Identifier,
    pub columns: IndexMap<Identifier, ColumnType>,
    pub primary_key: Vec<Identifier>,
}

impl TableDescriptor {
    /// Validate a client table definition.
    ///
    /// Primary key columns are those declared with a `PRIMARY KEY` suffix,
    /// in column order, followed by any listed in `primary_key`. Every key
    /// column must be declared and none may repeat. Rows are addressed by
    /// `id` in update and delete, so the key must be exactly that column.
    pub fn new(
        name: &str,
        columns: &IndexMap<String, String>,
        primary_key: &[String],
    ) -> Result<Self, GatewayError> {
        let name = Identifier::parse(name)?;
        if columns.is_empty() {
            return Err(GatewayError::invalid_schema(
                "a table needs at least one column",
            ));
        }

        let mut declared = IndexMap::with_capacity(columns.len());
        let mut key = Vec::new();
        for (column, decl) in columns {
            let column = Identifier::parse(column)?;
            let decl: ColumnDecl = decl.parse()?;
            if decl.primary_key {
                key.push(column.clone());
            }
            declared.insert(column, decl.column_type);
        }

        for column in primary_key {
            let column = Identifier::parse(column)?;
            if !declared.contains_key(&column) {
                return Err(GatewayError::InvalidSchema(format!(
                    "primary key column {} is not declared",
                    column
                )));
            }
            if key.contains(&column) {
                return Err(GatewayError::InvalidSchema(format!(
                    "primary key column {} is listed twice",
                    column
                )));
            }
            key.push(column);
        }

        if key.is_empty() {
            return Err(GatewayError::invalid_schema(
                "a table needs a primary key",
            ));
        }
        if key.len() != 1 || key[0].as_str() != ROW_KEY_FIELD {
            return Err(GatewayError::InvalidSchema(format!(
                "the primary key must be the single column `{}`",
                ROW_KEY_FIELD
            )));
        }

        Ok(Self {
            name,
            columns: declared,
            primary_key: key,
        })
    }
}
