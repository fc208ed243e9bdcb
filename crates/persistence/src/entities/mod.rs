//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod bulk_operation;

pub use bulk_operation::BulkOperationEntity;
