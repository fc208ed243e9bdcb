//! Operation store backends.

pub mod bulk_operation;
pub mod memory;
pub mod postgres;

pub use bulk_operation::BulkOperationRepository;
pub use memory::{InMemoryBulkOperationRepository, DEFAULT_CAPACITY};
pub use postgres::PgBulkOperationRepository;
