//! Store handle
//!
//! Every component reaches the data store through [`Store`]: one pooled
//! connection, the dialect of its backend and a deadline applied to each
//! call. Driver errors are classified here so callers never inspect them.

pub mod dialect;

use std::future::Future;
use std::time::Duration;

use futures_util::stream::{BoxStream, StreamExt};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, FromQueryResult, JsonValue, QueryResult,
    Statement,
};
use thiserror::Error;

pub use dialect::Dialect;

use crate::domain::GatewayError;

/// Classified store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store call exceeded {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("table does not exist")]
    MissingTable,

    #[error("statement rejected: {0}")]
    Rejected(String),

    #[error("store error: {0}")]
    Internal(String),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::Conn(e) => StoreError::Unavailable(e.to_string()),
            DbErr::ConnectionAcquire(e) => StoreError::Unavailable(e.to_string()),
            DbErr::Exec(e) | DbErr::Query(e) => {
                let message = e.to_string();
                if is_missing_table(&message) {
                    StoreError::MissingTable
                } else {
                    StoreError::Rejected(message)
                }
            }
            other => StoreError::Internal(other.to_string()),
        }
    }
}

fn is_missing_table(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("no such table")
        || (message.contains("relation") && message.contains("does not exist"))
}

impl StoreError {
    /// For statements the gateway itself wrote (directory and ledger
    /// tables), a rejection is a server fault rather than a client one.
    pub fn escalate(self) -> GatewayError {
        match self {
            StoreError::Rejected(msg) => GatewayError::Internal(msg),
            StoreError::MissingTable => {
                GatewayError::Internal("gateway tables are missing".to_string())
            }
            other => other.into(),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout(d) => GatewayError::StoreTimeout(d),
            StoreError::Unavailable(msg) => GatewayError::StoreUnavailable(msg),
            StoreError::MissingTable => GatewayError::TableNotFound,
            StoreError::Rejected(msg) => GatewayError::StoreRejected(msg),
            StoreError::Internal(msg) => GatewayError::Internal(msg),
        }
    }
}

/// Pooled store handle shared by every component.
#[derive(Clone)]
pub struct Store {
    db: DatabaseConnection,
    dialect: Dialect,
    deadline: Duration,
}

impl Store {
    /// Wrap a connection; fails for backends without a namespace layout.
    pub fn new(db: DatabaseConnection, deadline: Duration) -> Result<Self, StoreError> {
        let dialect = Dialect::from_backend(db.get_database_backend())?;
        Ok(Self {
            db,
            dialect,
            deadline,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Run one store call under the per-call deadline.
    pub async fn guard<T, E, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<StoreError>,
    {
        match tokio::time::timeout(self.deadline, call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(StoreError::Timeout(self.deadline)),
        }
    }

    /// Execute a statement, returning the number of affected rows.
    pub async fn execute(&self, stmt: Statement) -> Result<u64, StoreError> {
        let result = self.guard(self.db.execute(stmt)).await?;
        Ok(result.rows_affected())
    }

    pub async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, StoreError> {
        self.guard(self.db.query_all(stmt)).await
    }

    pub async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, StoreError> {
        self.guard(self.db.query_one(stmt)).await
    }

    /// Lazily stream rows as JSON objects. Opening the cursor is bounded by
    /// the deadline; consumers bound the iteration themselves.
    pub async fn stream_json<'a>(
        &'a self,
        stmt: Statement,
    ) -> Result<BoxStream<'a, Result<JsonValue, StoreError>>, StoreError> {
        let stream = self
            .guard(JsonValue::find_by_statement(stmt).stream(&self.db))
            .await?;
        Ok(stream.map(|row| row.map_err(StoreError::from)).boxed())
    }
}
