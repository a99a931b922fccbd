//! Statement planning
//!
//! Turns tenant requests into statements without touching the store.
//! Identifiers are allow-listed before anything else is looked at; values
//! only ever travel as bound parameters.

use sea_orm::sea_query::{
    Alias, Asterisk, ColumnDef, Cond, Expr, Func, Index, Keyword, Order, Query, SimpleExpr,
    Table, TableRef,
};
use sea_orm::{DbBackend, Statement};
use serde_json::Value as JsonValue;

use crate::domain::row::not_scalar;
use crate::domain::{
    ColumnType, GatewayError, GatewayResult, Identifier, Namespace, Row, RowPatch, SelectQuery,
    SortOrder, TableDescriptor, ROW_KEY_FIELD,
};
use crate::infrastructure::Dialect;

/// Output alias of the count aggregate.
pub const COUNT_ALIAS: &str = "count";
/// Output alias of the sum aggregate.
pub const SUM_ALIAS: &str = "total";

/// Plans statements for one namespace on one backend.
pub struct StatementPlanner<'a> {
    dialect: Dialect,
    namespace: &'a Namespace,
}

impl<'a> StatementPlanner<'a> {
    pub fn new(dialect: Dialect, namespace: &'a Namespace) -> Self {
        Self { dialect, namespace }
    }

    fn backend(&self) -> DbBackend {
        self.dialect.backend()
    }

    fn table(&self, raw: &str) -> GatewayResult<TableRef> {
        let table = Identifier::parse(raw)?;
        Ok(self.dialect.table_ref(self.namespace, &table))
    }

    pub fn create_table(&self, table: &TableDescriptor) -> Statement {
        let mut create = Table::create();
        create
            .table(self.dialect.table_ref(self.namespace, &table.name))
            .if_not_exists();

        for (name, column_type) in &table.columns {
            let mut def = ColumnDef::new(Alias::new(name.as_str()));
            apply_column_type(&mut def, *column_type);
            if table.primary_key.contains(name) {
                def.not_null();
            }
            create.col(&mut def);
        }

        let mut key = Index::create();
        for column in &table.primary_key {
            key.col(Alias::new(column.as_str()));
        }
        create.primary_key(&mut key);

        self.backend().build(&create)
    }

    pub fn insert(&self, table: &str, row: &Row) -> GatewayResult<Statement> {
        let table = self.table(table)?;
        let columns = columns(row.keys())?;
        if row.is_empty() {
            return Err(GatewayError::invalid_schema("a row needs at least one field"));
        }
        let values = row
            .iter()
            .map(|(field, value)| bind_value(field, value))
            .collect::<GatewayResult<Vec<_>>>()?;

        let mut insert = Query::insert();
        insert
            .into_table(table)
            .columns(columns)
            .values(values)
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(self.backend().build(&insert))
    }

    /// `filters` are the query's filters typed against the table's
    /// columns; `limit` is the effective page size, already clamped by the
    /// caller.
    pub fn select(
        &self,
        table: &str,
        query: &SelectQuery,
        filters: &Row,
        limit: u64,
    ) -> GatewayResult<Statement> {
        let table = self.table(table)?;
        let filter_columns = columns(filters.keys())?;
        let sort = query
            .sort_by
            .as_deref()
            .map(Identifier::parse)
            .transpose()?;
        let conditions = equality_conditions(filter_columns, filters.iter())?;

        let mut select = Query::select();
        select.column(Asterisk).from(table);
        if let Some(conditions) = conditions {
            select.cond_where(conditions);
        }
        if let Some(column) = sort {
            let order = match query.order {
                SortOrder::Asc => Order::Asc,
                SortOrder::Desc => Order::Desc,
            };
            select.order_by(Alias::new(column.as_str()), order);
        }
        select.limit(limit).offset(query.offset);
        Ok(self.backend().build(&select))
    }

    pub fn update(&self, table: &str, patch: &RowPatch) -> GatewayResult<Statement> {
        let table = self.table(table)?;
        let columns = columns(patch.fields.keys())?;
        let key = bind_key(patch.id.as_ref())?;
        if patch.fields.is_empty() {
            return Err(GatewayError::invalid_schema("no fields to update"));
        }

        let mut update = Query::update();
        update.table(table);
        for (column, (field, value)) in columns.into_iter().zip(&patch.fields) {
            update.value(column, bind_value(field, value)?);
        }
        update.and_where(Expr::col(Alias::new(ROW_KEY_FIELD)).eq(key));
        Ok(self.backend().build(&update))
    }

    pub fn delete(&self, table: &str, id: Option<&JsonValue>) -> GatewayResult<Statement> {
        let table = self.table(table)?;
        let key = bind_key(id)?;

        let mut delete = Query::delete();
        delete
            .from_table(table)
            .and_where(Expr::col(Alias::new(ROW_KEY_FIELD)).eq(key));
        Ok(self.backend().build(&delete))
    }

    pub fn count(&self, table: &str) -> GatewayResult<Statement> {
        let table = self.table(table)?;
        let mut select = Query::select();
        select
            .expr_as(Func::count(Expr::col(Asterisk)), Alias::new(COUNT_ALIAS))
            .from(table);
        Ok(self.backend().build(&select))
    }

    pub fn sum(&self, table: &str, column: &str) -> GatewayResult<Statement> {
        let table = self.table(table)?;
        let column = Identifier::parse(column)?;
        let mut select = Query::select();
        select
            .expr_as(
                Func::sum(Expr::col(Alias::new(column.as_str()))),
                Alias::new(SUM_ALIAS),
            )
            .from(table);
        Ok(self.backend().build(&select))
    }

    pub fn list_tables(&self) -> Statement {
        self.dialect.list_tables(self.namespace)
    }

    pub fn describe_table(&self, table: &str) -> GatewayResult<Statement> {
        let table = Identifier::parse(table)?;
        Ok(self.dialect.describe_table(self.namespace, &table))
    }
}

fn columns<'k>(fields: impl Iterator<Item = &'k String>) -> GatewayResult<Vec<Alias>> {
    fields
        .map(|field| Identifier::parse(field).map(|id| Alias::new(id.as_str())))
        .collect()
}

fn equality_conditions<'r>(
    columns: Vec<Alias>,
    filters: impl Iterator<Item = (&'r String, &'r JsonValue)>,
) -> GatewayResult<Option<Cond>> {
    if columns.is_empty() {
        return Ok(None);
    }
    let mut all = Cond::all();
    for (column, (field, value)) in columns.into_iter().zip(filters) {
        let predicate = match value {
            JsonValue::Null => Expr::col(column).is_null(),
            value => Expr::col(column).eq(bind_value(field, value)?),
        };
        all = all.add(predicate);
    }
    Ok(Some(all))
}

/// A JSON scalar as a statement operand. `null` is the SQL keyword; every
/// other scalar is a bound parameter.
fn bind_value(field: &str, value: &JsonValue) -> GatewayResult<SimpleExpr> {
    let bound = match value {
        JsonValue::Null => return Ok(SimpleExpr::Keyword(Keyword::Null)),
        JsonValue::Bool(b) => sea_orm::Value::from(*b),
        JsonValue::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => sea_orm::Value::from(i),
            (None, Some(f)) => sea_orm::Value::from(f),
            (None, None) => return Err(not_scalar(field)),
        },
        JsonValue::String(s) => sea_orm::Value::from(s.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => return Err(not_scalar(field)),
    };
    Ok(SimpleExpr::Value(bound))
}

fn bind_key(id: Option<&JsonValue>) -> GatewayResult<SimpleExpr> {
    match id {
        None | Some(JsonValue::Null) => Err(GatewayError::MissingKey),
        Some(value) => bind_value(ROW_KEY_FIELD, value),
    }
}

fn apply_column_type(def: &mut ColumnDef, column_type: ColumnType) {
    match column_type {
        ColumnType::Int => def.integer(),
        ColumnType::BigInt => def.big_integer(),
        ColumnType::SmallInt => def.small_integer(),
        ColumnType::Text => def.text(),
        ColumnType::Boolean => def.boolean(),
        ColumnType::Float => def.float(),
        ColumnType::Double => def.double(),
        ColumnType::Decimal => def.decimal(),
        ColumnType::Timestamp => def.timestamp_with_time_zone(),
        ColumnType::Date => def.date(),
        ColumnType::Uuid => def.uuid(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ApiKey;
    use indexmap::IndexMap;
    use serde_json::json;

    const HOSTILE: [&str; 4] = ["t; DROP TABLE api_keys", "t\"", "a b", ""];

    fn namespace() -> Namespace {
        Namespace::derive(&ApiKey::parse("2f1c7e9a-5b3d-4c8e-9f0a-1b2c3d4e5f60").unwrap())
    }

    fn row(value: serde_json::Value) -> Row {
        serde_json::from_value(value).unwrap()
    }

    fn bound_count(stmt: &Statement) -> usize {
        stmt.values.as_ref().map_or(0, |v| v.0.len())
    }

    #[test]
    fn insert_binds_every_value() {
        let ns = namespace();
        let planner = StatementPlanner::new(Dialect::Sqlite, &ns);
        let stmt = planner
            .insert("users", &row(json!({"id": 1, "name": "o'brien"})))
            .unwrap();

        assert_eq!(
            stmt.sql,
            format!(
                r#"INSERT INTO "{}__users" ("id", "name") VALUES (?, ?)"#,
                ns.as_str()
            )
        );
        assert_eq!(bound_count(&stmt), 2);
        assert!(!stmt.sql.contains("o'brien"));
    }

    #[test]
    fn insert_renders_postgres_placeholders() {
        let ns = namespace();
        let planner = StatementPlanner::new(Dialect::Postgres, &ns);
        let stmt = planner
            .insert("users", &row(json!({"id": 1, "name": "a"})))
            .unwrap();
        assert_eq!(
            stmt.sql,
            format!(
                r#"INSERT INTO "{}"."users" ("id", "name") VALUES ($1, $2)"#,
                ns.as_str()
            )
        );
    }

    #[test]
    fn null_is_a_keyword_not_a_parameter() {
        let ns = namespace();
        let planner = StatementPlanner::new(Dialect::Sqlite, &ns);
        let stmt = planner
            .insert("users", &row(json!({"id": 1, "note": null})))
            .unwrap();
        assert!(stmt.sql.contains("NULL"));
        assert_eq!(bound_count(&stmt), 1);
    }

    #[test]
    fn select_binds_filters_and_paging() {
        let ns = namespace();
        let planner = StatementPlanner::new(Dialect::Sqlite, &ns);
        let query = SelectQuery {
            sort_by: Some("name".into()),
            order: SortOrder::Desc,
            offset: 4,
            ..SelectQuery::default()
        };
        let filters = row(json!({"city": "Oslo", "age": 30}));

        let stmt = planner.select("users", &query, &filters, 2).unwrap();
        assert!(stmt.sql.starts_with(&format!(
            r#"SELECT * FROM "{}__users" WHERE "city" = ? AND "age" = ?"#,
            ns.as_str()
        )));
        assert!(stmt.sql.contains(r#"ORDER BY "name" DESC"#));
        assert!(stmt.sql.ends_with("LIMIT ? OFFSET ?"));
        assert_eq!(bound_count(&stmt), 4);
        assert!(!stmt.sql.contains("Oslo"));
    }

    #[test]
    fn select_without_filters_has_no_where_clause() {
        let ns = namespace();
        let planner = StatementPlanner::new(Dialect::Postgres, &ns);
        let stmt = planner.select("users", &SelectQuery::default(), &Row::new(), 50).unwrap();
        assert!(!stmt.sql.contains("WHERE"));
        assert!(stmt.sql.ends_with("LIMIT $1 OFFSET $2"));
    }

    #[test]
    fn update_is_keyed_by_id() {
        let ns = namespace();
        let planner = StatementPlanner::new(Dialect::Sqlite, &ns);
        let patch = RowPatch {
            id: Some(json!(7)),
            fields: row(json!({"name": "b"})),
        };
        let stmt = planner.update("users", &patch).unwrap();
        assert!(stmt.sql.starts_with("UPDATE "));
        assert!(stmt.sql.contains(r#"SET "name" = ?"#));
        assert!(stmt.sql.ends_with(r#"WHERE "id" = ?"#));
        assert_eq!(bound_count(&stmt), 2);
    }

    #[test]
    fn update_and_delete_require_the_key() {
        let ns = namespace();
        let planner = StatementPlanner::new(Dialect::Sqlite, &ns);
        let patch = RowPatch {
            id: None,
            fields: row(json!({"name": "b"})),
        };
        assert!(matches!(
            planner.update("users", &patch),
            Err(GatewayError::MissingKey)
        ));
        assert!(matches!(
            planner.delete("users", None),
            Err(GatewayError::MissingKey)
        ));
        assert!(matches!(
            planner.delete("users", Some(&JsonValue::Null)),
            Err(GatewayError::MissingKey)
        ));

        let stmt = planner.delete("users", Some(&json!(1))).unwrap();
        assert!(stmt.sql.starts_with("DELETE FROM"));
        assert_eq!(bound_count(&stmt), 1);
    }

    #[test]
    fn empty_payloads_are_invalid() {
        let ns = namespace();
        let planner = StatementPlanner::new(Dialect::Sqlite, &ns);
        assert!(matches!(
            planner.insert("users", &Row::new()),
            Err(GatewayError::InvalidSchema(_))
        ));
        let patch = RowPatch {
            id: Some(json!(1)),
            fields: Row::new(),
        };
        assert!(matches!(
            planner.update("users", &patch),
            Err(GatewayError::InvalidSchema(_))
        ));
    }

    #[test]
    fn nested_values_are_malformed() {
        let ns = namespace();
        let planner = StatementPlanner::new(Dialect::Sqlite, &ns);
        assert!(matches!(
            planner.insert("users", &row(json!({"id": 1, "tags": ["a"]}))),
            Err(GatewayError::BadRequest(_))
        ));
    }

    #[test]
    fn hostile_identifiers_fail_every_operation() {
        let ns = namespace();
        let planner = StatementPlanner::new(Dialect::Postgres, &ns);
        let is_invalid = |r: GatewayResult<Statement>| matches!(r, Err(GatewayError::InvalidSchema(_)));

        for bad in HOSTILE {
            // as table name
            assert!(is_invalid(planner.insert(bad, &row(json!({"id": 1})))));
            assert!(is_invalid(planner.select(bad, &SelectQuery::default(), &Row::new(), 10)));
            assert!(is_invalid(planner.update(
                bad,
                &RowPatch { id: Some(json!(1)), fields: row(json!({"a": 1})) }
            )));
            assert!(is_invalid(planner.delete(bad, Some(&json!(1)))));
            assert!(is_invalid(planner.count(bad)));
            assert!(is_invalid(planner.sum(bad, "a")));
            assert!(is_invalid(planner.describe_table(bad)));

            // as column name
            let mut fields = Row::new();
            fields.insert(bad.to_string(), json!(1));
            assert!(is_invalid(planner.insert("t", &fields)));
            assert!(is_invalid(planner.update(
                "t",
                &RowPatch { id: None, fields: fields.clone() }
            )));
            assert!(is_invalid(planner.select("t", &SelectQuery::default(), &fields, 10)));
            assert!(is_invalid(planner.select(
                "t",
                &SelectQuery { sort_by: Some(bad.to_string()), ..SelectQuery::default() },
                &Row::new(),
                10
            )));
            assert!(is_invalid(planner.sum("t", bad)));
        }
    }

    #[test]
    fn create_table_declares_types_and_key() {
        let ns = namespace();
        let columns: IndexMap<String, String> = [("id", "int PRIMARY KEY"), ("name", "text")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let table = TableDescriptor::new("t", &columns, &[]).unwrap();

        let stmt = StatementPlanner::new(Dialect::Sqlite, &ns).create_table(&table);
        assert!(stmt.sql.starts_with(&format!(
            r#"CREATE TABLE IF NOT EXISTS "{}__t""#,
            ns.as_str()
        )));
        assert!(stmt.sql.contains(r#""name" text"#));
        assert!(stmt.sql.contains(r#"PRIMARY KEY ("id")"#));

        let stmt = StatementPlanner::new(Dialect::Postgres, &ns).create_table(&table);
        assert!(stmt.sql.contains(&format!(r#""{}"."t""#, ns.as_str())));
    }

    #[test]
    fn aggregates_alias_their_output() {
        let ns = namespace();
        let planner = StatementPlanner::new(Dialect::Sqlite, &ns);
        let count = planner.count("t").unwrap();
        assert!(count.sql.contains(r#"COUNT(*) AS "count""#));
        let sum = planner.sum("t", "amount").unwrap();
        assert!(sum.sql.contains(r#"SUM("amount") AS "total""#));
    }
}
