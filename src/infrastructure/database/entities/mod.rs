//! Database entities module

pub mod api_key;
pub mod api_key_usage;

pub use api_key::Entity as ApiKey;
pub use api_key_usage::Entity as ApiKeyUsage;
