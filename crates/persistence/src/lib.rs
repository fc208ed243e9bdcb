//! Persistence layer for the FocuSprint bulk operations service.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - The operation store trait with in-memory and PostgreSQL backends

pub mod db;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod repositories;

pub use error::RepositoryError;
