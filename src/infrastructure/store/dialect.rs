//! Backend-specific namespace layout
//!
//! Postgres keeps each tenant in its own schema. SQLite has no schemas, so
//! a namespace becomes a physical table-name prefix `<namespace>__<table>`.
//! Catalog lookups bind the namespace and table as values in both cases.

use sea_orm::sea_query::{Alias, IntoTableRef, TableRef};
use sea_orm::{DbBackend, Statement, Value};

use super::StoreError;
use crate::domain::{Identifier, Namespace};

/// Separator between namespace and table in SQLite physical names.
const SQLITE_NAMESPACE_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn from_backend(backend: DbBackend) -> Result<Self, StoreError> {
        match backend {
            DbBackend::Postgres => Ok(Dialect::Postgres),
            DbBackend::Sqlite => Ok(Dialect::Sqlite),
            other => Err(StoreError::Internal(format!(
                "unsupported database backend {:?}",
                other
            ))),
        }
    }

    pub fn backend(&self) -> DbBackend {
        match self {
            Dialect::Postgres => DbBackend::Postgres,
            Dialect::Sqlite => DbBackend::Sqlite,
        }
    }

    /// Reference to a tenant table, for statement builders.
    pub fn table_ref(&self, namespace: &Namespace, table: &Identifier) -> TableRef {
        match self {
            Dialect::Postgres => (
                Alias::new(namespace.as_str()),
                Alias::new(table.as_str()),
            )
                .into_table_ref(),
            Dialect::Sqlite => Alias::new(sqlite_physical_name(namespace, table.as_str()))
                .into_table_ref(),
        }
    }

    /// DDL that makes the namespace exist, if the backend needs any.
    pub fn create_namespace(&self, namespace: &Namespace) -> Option<Statement> {
        match self {
            Dialect::Postgres => Some(Statement::from_string(
                DbBackend::Postgres,
                format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", namespace.as_str()),
            )),
            Dialect::Sqlite => None,
        }
    }

    /// Catalog query yielding one `table_name` column per tenant table.
    pub fn list_tables(&self, namespace: &Namespace) -> Statement {
        match self {
            Dialect::Postgres => Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT table_name::text AS table_name FROM information_schema.tables \
                 WHERE table_schema = $1 AND table_type = 'BASE TABLE' ORDER BY table_name",
                [Value::from(namespace.as_str())],
            ),
            Dialect::Sqlite => Statement::from_sql_and_values(
                DbBackend::Sqlite,
                "SELECT name AS table_name FROM sqlite_master \
                 WHERE type = 'table' AND name LIKE ? ESCAPE '\\' ORDER BY name",
                [Value::from(format!(
                    "{}%",
                    escape_like(&sqlite_prefix(namespace))
                ))],
            ),
        }
    }

    /// Map a catalog `table_name` back to the tenant's table name.
    pub fn tenant_table_name(&self, namespace: &Namespace, physical: &str) -> Option<String> {
        match self {
            Dialect::Postgres => Some(physical.to_string()),
            Dialect::Sqlite => physical
                .strip_prefix(&sqlite_prefix(namespace))
                .map(str::to_string),
        }
    }

    /// Catalog query yielding `column_name` and `data_type` in column order.
    pub fn describe_table(&self, namespace: &Namespace, table: &Identifier) -> Statement {
        match self {
            Dialect::Postgres => Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT column_name::text AS column_name, data_type::text AS data_type \
                 FROM information_schema.columns \
                 WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
                [
                    Value::from(namespace.as_str()),
                    Value::from(table.as_str()),
                ],
            ),
            Dialect::Sqlite => Statement::from_sql_and_values(
                DbBackend::Sqlite,
                "SELECT name AS column_name, type AS data_type \
                 FROM pragma_table_info(?) ORDER BY cid",
                [Value::from(sqlite_physical_name(namespace, table.as_str()))],
            ),
        }
    }
}

fn sqlite_prefix(namespace: &Namespace) -> String {
    format!("{}{}", namespace.as_str(), SQLITE_NAMESPACE_SEPARATOR)
}

fn sqlite_physical_name(namespace: &Namespace, table: &str) -> String {
    format!("{}{}", sqlite_prefix(namespace), table)
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ApiKey;
    use sea_orm::sea_query::{
        Asterisk, PostgresQueryBuilder, Query, QueryStatementWriter, SqliteQueryBuilder,
    };

    fn namespace() -> Namespace {
        Namespace::derive(&ApiKey::parse("2f1c7e9a-5b3d-4c8e-9f0a-1b2c3d4e5f60").unwrap())
    }

    #[test]
    fn qualifies_tables_per_backend() {
        let ns = namespace();
        let table = Identifier::parse("users").unwrap();

        let pg = Query::select()
            .column(Asterisk)
            .from(Dialect::Postgres.table_ref(&ns, &table))
            .to_string(PostgresQueryBuilder);
        assert_eq!(
            pg,
            r#"SELECT * FROM "ks_2f1c7e9a_5b3d_4c8e_9f0a_1b2c3d4e5f60"."users""#
        );

        let lite = Query::select()
            .column(Asterisk)
            .from(Dialect::Sqlite.table_ref(&ns, &table))
            .to_string(SqliteQueryBuilder);
        assert_eq!(
            lite,
            r#"SELECT * FROM "ks_2f1c7e9a_5b3d_4c8e_9f0a_1b2c3d4e5f60__users""#
        );
    }

    #[test]
    fn namespace_ddl_only_on_postgres() {
        let ns = namespace();
        let ddl = Dialect::Postgres.create_namespace(&ns).unwrap();
        assert_eq!(
            ddl.sql,
            r#"CREATE SCHEMA IF NOT EXISTS "ks_2f1c7e9a_5b3d_4c8e_9f0a_1b2c3d4e5f60""#
        );
        assert!(Dialect::Sqlite.create_namespace(&ns).is_none());
    }

    #[test]
    fn catalog_lookups_bind_names_as_values() {
        let ns = namespace();
        let table = Identifier::parse("users").unwrap();

        for dialect in [Dialect::Postgres, Dialect::Sqlite] {
            let list = dialect.list_tables(&ns);
            assert!(!list.sql.contains(ns.as_str()));
            assert_eq!(list.values.as_ref().map(|v| v.0.len()), Some(1));

            let describe = dialect.describe_table(&ns, &table);
            assert!(!describe.sql.contains("users"));
            assert!(describe.values.is_some());
        }
    }

    #[test]
    fn sqlite_listing_escapes_the_prefix() {
        let ns = namespace();
        let list = Dialect::Sqlite.list_tables(&ns);
        let pattern = match &list.values.as_ref().unwrap().0[0] {
            Value::String(Some(s)) => s.to_string(),
            other => panic!("unexpected value {:?}", other),
        };
        assert!(pattern.starts_with("ks\\_2f1c7e9a\\_"));
        assert!(pattern.ends_with("\\_\\_%"));
    }

    #[test]
    fn sqlite_names_map_back_to_tenant_tables() {
        let ns = namespace();
        let physical = format!("{}__orders", ns.as_str());
        assert_eq!(
            Dialect::Sqlite.tenant_table_name(&ns, &physical).as_deref(),
            Some("orders")
        );
        assert_eq!(Dialect::Sqlite.tenant_table_name(&ns, "api_keys"), None);
        assert_eq!(
            Dialect::Postgres.tenant_table_name(&ns, "orders").as_deref(),
            Some("orders")
        );
    }

    #[test]
    fn rejects_other_backends() {
        assert!(Dialect::from_backend(DbBackend::MySql).is_err());
        assert_eq!(
            Dialect::from_backend(DbBackend::Sqlite).unwrap(),
            Dialect::Sqlite
        );
    }
}
