pub mod api_key;

pub use api_key::{digest_prefix, hash_api_key};
