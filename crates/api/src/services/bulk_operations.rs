//! Bulk operation orchestration: submission, queries and cancellation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use domain::models::{
    BulkOperation, CancelOperationRequest, CancelOperationResponse, ListOperationsQuery,
    ListOperationsResponse, OperationFilter, OperationPatch, OperationProgress, OperationStatistics,
    OperationStatus, OperationType, OperationTypeInfo, SubmitBulkOperationRequest,
    SubmitBulkOperationResponse,
};
use domain::services::{
    audit_helpers, estimate_duration_seconds, submission_warnings, summarize,
    BulkOperationValidator, TargetHandler,
};
use domain::DomainError;
use persistence::repositories::BulkOperationRepository;
use persistence::RepositoryError;
use serde_json::Value as JsonValue;
use shared::ids::generate_operation_id;
use shared::pagination::paginate;
use shared::validation::{error_message, validate_batch_size};
use thiserror::Error;
use tracing::{info, warn};
use validator::Validate;

use crate::config::BulkOperationsConfig;
use crate::error::ApiError;
use crate::extractors::AdminActor;
use crate::middleware::metrics::{record_operation_finished, record_operation_submitted};
use crate::services::batch_processor::BatchProcessor;
use crate::services::worker_pool::WorkerPool;

/// Error message stored on operations left active by a previous process.
pub const RESTART_INTERRUPTED_MESSAGE: &str = "Interrupted by service restart";

const DEFAULT_CANCEL_REASON: &str = "No reason provided";

/// Errors that can occur during bulk operation requests.
#[derive(Debug, Error)]
pub enum BulkOperationError {
    #[error("Invalid request: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<BulkOperationError> for ApiError {
    fn from(err: BulkOperationError) -> Self {
        match err {
            BulkOperationError::Invalid(e) => ApiError::from(e),
            BulkOperationError::Domain(e) => ApiError::from(e),
            BulkOperationError::Repository(e) => ApiError::from(e),
        }
    }
}

pub struct BulkOperationService {
    repository: Arc<dyn BulkOperationRepository>,
    processor: Arc<BatchProcessor>,
    pool: WorkerPool,
    validator: BulkOperationValidator,
    settings: BulkOperationsConfig,
}

impl BulkOperationService {
    pub fn new(
        repository: Arc<dyn BulkOperationRepository>,
        handler: Arc<dyn TargetHandler>,
        settings: BulkOperationsConfig,
    ) -> Self {
        let processor = BatchProcessor::new(
            Arc::clone(&repository),
            handler,
            Duration::from_millis(settings.batch_delay_ms),
        );
        Self {
            repository,
            processor: Arc::new(processor),
            pool: WorkerPool::new(settings.max_concurrent_operations),
            validator: BulkOperationValidator::new(settings.max_targets),
            settings,
        }
    }

    pub fn repository(&self) -> &Arc<dyn BulkOperationRepository> {
        &self.repository
    }

    pub fn worker_pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Validates a submission, stores it as `pending` and starts processing.
    ///
    /// Nothing is stored when validation fails, when every worker slot is
    /// taken, or for a dry run.
    pub async fn submit(
        &self,
        actor: &AdminActor,
        request: SubmitBulkOperationRequest,
    ) -> Result<SubmitBulkOperationResponse, BulkOperationError> {
        request.validate()?;

        let batch_size = request
            .batch_size
            .unwrap_or(self.settings.default_batch_size);
        validate_batch_size(batch_size, self.settings.max_batch_size)
            .map_err(|e| DomainError::InvalidBatchSize(error_message(&e)))?;

        let outcome = self.validator.validate(
            request.operation_type,
            request.target_type,
            &request.target_ids,
            &request.parameters,
        )?;
        let parameters = match outcome.parameters.clone() {
            Some(parameters) if outcome.can_proceed() => parameters,
            _ => {
                info!(
                    operation_type = %request.operation_type,
                    blocked = outcome.blocked().count(),
                    "Bulk operation rejected by validation"
                );
                return Err(DomainError::ValidationFailed {
                    results: outcome.results,
                }
                .into());
            }
        };

        let plan = self.settings.plan_settings();
        let warnings = submission_warnings(&outcome, batch_size, request.dry_run, &plan);
        let estimated_duration_seconds =
            estimate_duration_seconds(request.target_ids.len(), batch_size, &plan);

        let now = Utc::now();
        let operation = BulkOperation {
            id: generate_operation_id(now),
            operation_type: request.operation_type,
            target_type: request.target_type,
            progress: OperationProgress::new(request.target_ids.len()),
            target_ids: request.target_ids,
            parameters,
            reason: request.reason,
            metadata: request.metadata.map(JsonValue::Object),
            batch_size,
            status: OperationStatus::Pending,
            results: Vec::new(),
            created_by: actor.id.clone(),
            created_by_name: actor.name.clone(),
            created_at: now,
            started_at: None,
            completed_at: None,
            error_message: None,
        };

        if !request.dry_run {
            let slot = self.pool.try_reserve()?;
            self.repository.add(operation.clone()).await?;

            info!(
                operation_id = %operation.id,
                operation_type = %operation.operation_type,
                targets = operation.total_items(),
                batch_size = batch_size,
                admin_id = %actor.id,
                "Bulk operation submitted"
            );
            audit_helpers::operation_submitted(&operation).emit();
            record_operation_submitted(operation.operation_type, operation.total_items());

            let processor = Arc::clone(&self.processor);
            let queued = operation.clone();
            self.pool.spawn(&operation.id, slot, move |token| async move {
                processor.run(queued, token).await;
            });
        }

        Ok(SubmitBulkOperationResponse {
            operation,
            validation_results: outcome.results,
            estimated_duration_seconds,
            warnings,
            dry_run: request.dry_run,
        })
    }

    /// Lists operations matching the query, newest first, one page at a time.
    pub async fn list(
        &self,
        query: &ListOperationsQuery,
    ) -> Result<ListOperationsResponse, BulkOperationError> {
        let filter = query.to_filter();
        let matching = self.repository.filter(&filter).await?;
        let summary = summarize(&matching);
        let (operations, pagination) = paginate(matching, query.page_request());

        Ok(ListOperationsResponse {
            operations,
            pagination,
            filters: filter,
            summary,
        })
    }

    pub async fn get(&self, id: &str) -> Result<BulkOperation, BulkOperationError> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| DomainError::OperationNotFound(id.to_string()).into())
    }

    /// Statistics over every stored operation.
    pub async fn statistics(&self) -> Result<OperationStatistics, BulkOperationError> {
        let all = self.repository.filter(&OperationFilter::default()).await?;
        Ok(summarize(&all))
    }

    /// Cancels a pending or running operation.
    ///
    /// The `cancelled` status is stored before the processor is signalled, so
    /// the processor can never overwrite it.
    pub async fn cancel(
        &self,
        actor: &AdminActor,
        id: &str,
        request: CancelOperationRequest,
    ) -> Result<CancelOperationResponse, BulkOperationError> {
        request.validate()?;

        let operation = self.get(id).await?;
        if !operation.status.can_transition_to(OperationStatus::Cancelled) {
            return Err(DomainError::AlreadyFinished {
                id: id.to_string(),
                status: operation.status,
            }
            .into());
        }

        let reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_CANCEL_REASON);
        let now = Utc::now();
        let patch = OperationPatch::status(OperationStatus::Cancelled)
            .with_completed_at(now)
            .with_error(format!("Cancelled by {}: {}", actor.name, reason));

        let cancelled = self
            .repository
            .update_if_status(id, &OperationStatus::ACTIVE, patch)
            .await?;
        if !cancelled {
            // Finished or evicted between the read and the update.
            let current = self.get(id).await?;
            return Err(DomainError::AlreadyFinished {
                id: id.to_string(),
                status: current.status,
            }
            .into());
        }

        let signalled = self.pool.cancel(id);
        info!(
            operation_id = %id,
            admin_id = %actor.id,
            processor_signalled = signalled,
            "Bulk operation cancelled"
        );
        audit_helpers::operation_cancelled(id, &actor.id, &actor.name, reason).emit();
        let duration = operation
            .started_at
            .map(|started| (now - started).num_milliseconds().max(0) as f64 / 1000.0);
        record_operation_finished(operation.operation_type, OperationStatus::Cancelled, duration);

        Ok(CancelOperationResponse {
            success: true,
            message: format!("Operation {} cancelled", id),
        })
    }

    pub fn operation_types(&self) -> Vec<OperationTypeInfo> {
        OperationType::ALL
            .into_iter()
            .map(OperationTypeInfo::from)
            .collect()
    }

    /// Marks operations left `pending` or `running` by a previous process as
    /// failed. Called once at startup, before the server accepts requests.
    pub async fn recover_interrupted(&self) -> Result<u64, BulkOperationError> {
        let count = self
            .repository
            .fail_interrupted(RESTART_INTERRUPTED_MESSAGE)
            .await?;
        if count > 0 {
            warn!(count = count, "Marked interrupted bulk operations as failed");
            audit_helpers::operations_interrupted(count).emit();
        }
        Ok(count)
    }

    /// Stops accepting submissions and waits for running processors.
    pub async fn shutdown(&self) -> bool {
        self.pool
            .shutdown(Duration::from_secs(self.settings.shutdown_timeout_secs))
            .await
    }
}
