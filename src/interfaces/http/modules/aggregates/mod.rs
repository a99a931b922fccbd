//! Read-only table introspection and aggregates

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
