//! Outer interfaces

pub mod http;
