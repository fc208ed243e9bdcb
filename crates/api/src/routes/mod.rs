//! HTTP route handlers.

pub mod bulk_operations;
pub mod health;
