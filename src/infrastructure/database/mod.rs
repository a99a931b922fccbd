pub mod entities;
pub mod migrator;

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use serde::{Deserialize, Serialize};
use tracing::info;

use migrator::Migrator;

/// Database configuration (`[database]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "postgres://gateway@localhost/linkdb" or
    /// "sqlite://./linkdb.db?mode=rwc")
    pub url: String,
    /// Deadline applied to every store call, in milliseconds
    pub statement_timeout_ms: u64,
    pub pool: PoolConfig,
}

/// Connection pool sizing (`[database.pool]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./linkdb.db?mode=rwc".to_string(),
            statement_timeout_ms: 5_000,
            pool: PoolConfig::default(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 16,
            min_connections: 1,
            connect_timeout_secs: 10,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
        }
    }
}

impl DatabaseConfig {
    /// Create config for SQLite
    pub fn sqlite(path: &str) -> Self {
        Self {
            url: format!("sqlite://{}?mode=rwc", path),
            ..Self::default()
        }
    }

    /// In-memory SQLite. A single pooled connection, since each SQLite
    /// memory connection is its own database.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            statement_timeout_ms: 5_000,
            pool: PoolConfig {
                max_connections: 1,
                min_connections: 1,
                ..PoolConfig::default()
            },
        }
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }

    fn connect_options(&self) -> ConnectOptions {
        let mut opt = ConnectOptions::new(self.url.clone());
        opt.max_connections(self.pool.max_connections)
            .min_connections(self.pool.min_connections)
            .connect_timeout(Duration::from_secs(self.pool.connect_timeout_secs))
            .acquire_timeout(Duration::from_secs(self.pool.acquire_timeout_secs))
            .sqlx_logging(false);
        if !self.url.contains(":memory:") {
            opt.idle_timeout(Duration::from_secs(self.pool.idle_timeout_secs));
        }
        opt
    }
}

/// Initialize the connection pool
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    info!(url = %redact_url(&config.url), "Connecting to database");
    let db = Database::connect(config.connect_options()).await?;
    info!(backend = ?db.get_database_backend(), "Database connected successfully");
    Ok(db)
}

/// Create or upgrade the directory and ledger tables
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    Migrator::up(db, None).await?;
    info!("Database migrations applied");
    Ok(())
}

/// Hide credentials embedded in a connection URL.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            format!("{}://***{}", &url[..scheme], &url[at..])
        }
        _ => url.to_string(),
    }
}
