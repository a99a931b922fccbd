//! Shared fixtures for in-crate tests

use crate::infrastructure::{init_database, run_migrations, DatabaseConfig, Store};

/// Migrated in-memory SQLite store.
pub(crate) async fn memory_store() -> Store {
    let config = DatabaseConfig::in_memory();
    let db = init_database(&config).await.expect("in-memory database");
    run_migrations(&db).await.expect("migrations");
    Store::new(db, config.statement_timeout()).expect("sqlite store")
}

/// In-memory SQLite store without the directory and ledger tables.
pub(crate) async fn bare_store() -> Store {
    let config = DatabaseConfig::in_memory();
    let db = init_database(&config).await.expect("in-memory database");
    Store::new(db, config.statement_timeout()).expect("sqlite store")
}
