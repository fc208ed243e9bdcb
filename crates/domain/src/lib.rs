//! Domain layer for the FocuSprint bulk operations service.
//!
//! This crate contains:
//! - Domain models (BulkOperation, typed parameters, validation verdicts)
//! - Business logic services (validation, target handlers, statistics, audit)
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::DomainError;
