//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod store;

pub use database::{init_database, run_migrations, DatabaseConfig};
pub use store::{Dialect, Store, StoreError};
