//! HTTP interface
//!
//! - `common`: error rendering and the validated JSON extractor
//! - `middleware`: the tenant gateway (key, rate budget, metering)
//! - `modules`: route handlers and DTOs
//! - `router`: route table and OpenAPI document

pub mod common;
pub mod middleware;
pub mod modules;
pub mod router;

pub use router::{create_api_router, AppState};
