//! Operation store contract.

use domain::models::{BulkOperation, OperationFilter, OperationPatch, OperationStatus};

use crate::error::RepositoryError;

/// Ordered, capacity-bounded registry of bulk operation records.
///
/// Records are returned newest first. Adding beyond capacity evicts the
/// oldest record. Reads never mutate.
#[async_trait::async_trait]
pub trait BulkOperationRepository: Send + Sync {
    /// Short backend name for health reporting.
    fn backend(&self) -> &'static str;

    /// Stores a new record at the head of the registry.
    async fn add(&self, operation: BulkOperation) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<BulkOperation>, RepositoryError>;

    /// Merges `patch` into the record. Returns `false` when no record matched.
    async fn update(&self, id: &str, patch: OperationPatch) -> Result<bool, RepositoryError>;

    /// Like [`update`](Self::update), but only while the record's status is
    /// one of `allowed`. Check and write happen atomically.
    async fn update_if_status(
        &self,
        id: &str,
        allowed: &[OperationStatus],
        patch: OperationPatch,
    ) -> Result<bool, RepositoryError>;

    /// Records matching `filter`, newest first.
    async fn filter(&self, filter: &OperationFilter) -> Result<Vec<BulkOperation>, RepositoryError>;

    /// Marks every pending or running record as failed with `message`.
    /// Returns the number of records changed.
    async fn fail_interrupted(&self, message: &str) -> Result<u64, RepositoryError>;

    async fn ping(&self) -> Result<(), RepositoryError>;
}
