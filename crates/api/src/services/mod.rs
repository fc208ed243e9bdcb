//! Application services.

pub mod batch_processor;
pub mod bulk_operations;
pub mod worker_pool;

pub use batch_processor::{BatchProcessor, ProcessOutcome};
pub use bulk_operations::{BulkOperationError, BulkOperationService};
pub use worker_pool::{WorkerPool, WorkerSlot};
