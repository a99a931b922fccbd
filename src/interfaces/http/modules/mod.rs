pub mod aggregates;
pub mod health;
pub mod keys;
pub mod metrics;
pub mod request_id;
pub mod rows;
pub mod tables;
pub mod usage;
