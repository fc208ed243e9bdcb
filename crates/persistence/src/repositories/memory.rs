//! Process-local operation store backed by a ring buffer.

use chrono::Utc;
use domain::models::{BulkOperation, OperationFilter, OperationPatch, OperationStatus};
use std::collections::VecDeque;
use tokio::sync::RwLock;

use super::bulk_operation::BulkOperationRepository;
use crate::error::RepositoryError;

/// Default number of records kept before the oldest is evicted.
pub const DEFAULT_CAPACITY: usize = 1000;

/// In-memory store. Records live only as long as the process.
#[derive(Debug)]
pub struct InMemoryBulkOperationRepository {
    capacity: usize,
    // Front is newest.
    entries: RwLock<VecDeque<BulkOperation>>,
}

impl InMemoryBulkOperationRepository {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemoryBulkOperationRepository {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait::async_trait]
impl BulkOperationRepository for InMemoryBulkOperationRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn add(&self, operation: BulkOperation) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        entries.push_front(operation);
        while entries.len() > self.capacity {
            if let Some(evicted) = entries.pop_back() {
                tracing::debug!(operation_id = %evicted.id, "Evicted oldest bulk operation");
            }
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<BulkOperation>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|op| op.id == id).cloned())
    }

    async fn update(&self, id: &str, patch: OperationPatch) -> Result<bool, RepositoryError> {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|op| op.id == id) {
            Some(op) => {
                op.apply(patch);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_if_status(
        &self,
        id: &str,
        allowed: &[OperationStatus],
        patch: OperationPatch,
    ) -> Result<bool, RepositoryError> {
        let mut entries = self.entries.write().await;
        match entries
            .iter_mut()
            .find(|op| op.id == id && allowed.contains(&op.status))
        {
            Some(op) => {
                op.apply(patch);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn filter(&self, filter: &OperationFilter) -> Result<Vec<BulkOperation>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|op| filter.matches(op))
            .cloned()
            .collect())
    }

    async fn fail_interrupted(&self, message: &str) -> Result<u64, RepositoryError> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let mut changed = 0;
        for op in entries.iter_mut().filter(|op| !op.status.is_terminal()) {
            op.apply(
                OperationPatch::status(OperationStatus::Failed)
                    .with_completed_at(now)
                    .with_error(message),
            );
            changed += 1;
        }
        Ok(changed)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::models::{
        NoParams, OperationParameters, OperationProgress, OperationType, TargetType,
    };
    use fake::faker::name::en::Name;
    use fake::Fake;

    fn operation(id: &str) -> BulkOperation {
        BulkOperation {
            id: id.to_string(),
            operation_type: OperationType::SuspendClients,
            target_type: TargetType::Clients,
            target_ids: vec!["c1".to_string()],
            parameters: OperationParameters::SuspendClients(NoParams::default()),
            reason: None,
            metadata: None,
            batch_size: 10,
            status: OperationStatus::Pending,
            progress: OperationProgress::new(1),
            results: Vec::new(),
            created_by: "admin-1".to_string(),
            created_by_name: Name().fake(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    fn ids(ops: &[BulkOperation]) -> Vec<&str> {
        ops.iter().map(|op| op.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_add_keeps_newest_first() {
        let repo = InMemoryBulkOperationRepository::default();
        repo.add(operation("a")).await.unwrap();
        repo.add(operation("b")).await.unwrap();
        repo.add(operation("c")).await.unwrap();

        let all = repo.filter(&OperationFilter::default()).await.unwrap();
        assert_eq!(ids(&all), vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let repo = InMemoryBulkOperationRepository::new(2);
        repo.add(operation("a")).await.unwrap();
        repo.add(operation("b")).await.unwrap();
        repo.add(operation("c")).await.unwrap();

        assert_eq!(repo.len().await, 2);
        assert!(repo.get_by_id("a").await.unwrap().is_none());
        let all = repo.filter(&OperationFilter::default()).await.unwrap();
        assert_eq!(ids(&all), vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_update_missing_returns_false() {
        let repo = InMemoryBulkOperationRepository::default();
        let updated = repo
            .update("missing", OperationPatch::status(OperationStatus::Running))
            .await
            .unwrap();
        assert!(!updated);
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let repo = InMemoryBulkOperationRepository::default();
        repo.add(operation("a")).await.unwrap();

        let now = Utc::now();
        assert!(repo
            .update(
                "a",
                OperationPatch::status(OperationStatus::Running).with_started_at(now)
            )
            .await
            .unwrap());

        let op = repo.get_by_id("a").await.unwrap().unwrap();
        assert_eq!(op.status, OperationStatus::Running);
        assert_eq!(op.started_at, Some(now));
        assert_eq!(op.batch_size, 10);
    }

    #[tokio::test]
    async fn test_update_if_status_guards_terminal_records() {
        let repo = InMemoryBulkOperationRepository::default();
        repo.add(operation("a")).await.unwrap();
        repo.update("a", OperationPatch::status(OperationStatus::Cancelled))
            .await
            .unwrap();

        let updated = repo
            .update_if_status(
                "a",
                &[OperationStatus::Running],
                OperationPatch::status(OperationStatus::Completed),
            )
            .await
            .unwrap();

        assert!(!updated);
        let op = repo.get_by_id("a").await.unwrap().unwrap();
        assert_eq!(op.status, OperationStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_filter_does_not_mutate() {
        let repo = InMemoryBulkOperationRepository::default();
        let mut old = operation("old");
        old.created_at = Utc::now() - Duration::hours(2);
        repo.add(old).await.unwrap();
        repo.add(operation("new")).await.unwrap();

        let recent = repo
            .filter(&OperationFilter {
                created_after: Some(Utc::now() - Duration::hours(1)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&recent), vec!["new"]);
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn test_fail_interrupted_only_touches_active_records() {
        let repo = InMemoryBulkOperationRepository::default();
        repo.add(operation("pending")).await.unwrap();
        repo.add(operation("running")).await.unwrap();
        repo.add(operation("done")).await.unwrap();
        repo.update("running", OperationPatch::status(OperationStatus::Running))
            .await
            .unwrap();
        repo.update("done", OperationPatch::status(OperationStatus::Completed))
            .await
            .unwrap();

        let changed = repo.fail_interrupted("Interrupted by restart").await.unwrap();
        assert_eq!(changed, 2);

        let running = repo.get_by_id("running").await.unwrap().unwrap();
        assert_eq!(running.status, OperationStatus::Failed);
        assert_eq!(running.error_message.as_deref(), Some("Interrupted by restart"));
        let done = repo.get_by_id("done").await.unwrap().unwrap();
        assert_eq!(done.status, OperationStatus::Completed);
    }
}
