//! Row CRUD within a tenant table

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
