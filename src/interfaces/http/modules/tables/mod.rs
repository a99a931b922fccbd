//! Table management within a tenant namespace

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
