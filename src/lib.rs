//! # LinkDB gateway
//!
//! Multi-tenant HTTP gateway over a shared, schema-flexible data store.
//! Every API key owns one namespace; requests are authenticated, budgeted,
//! scoped to the caller's namespace and metered.
//!
//! ## Architecture
//!
//! - **domain**: keys, namespaces, identifiers, table and row shapes, errors
//! - **application**: tenant directory, query builder, usage ledger, rate budget
//! - **infrastructure**: store handle and dialects, migrations, key digests
//! - **interfaces**: REST API with an OpenAPI document
//! - **support**: retry and shutdown helpers

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod support;

#[cfg(test)]
mod testing;

pub use config::{default_config_path, AppConfig};
pub use infrastructure::{init_database, DatabaseConfig, Store};
pub use interfaces::http::{create_api_router, AppState};
