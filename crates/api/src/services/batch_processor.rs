//! Background processing of a stored bulk operation.
//!
//! Targets are handled one at a time, in submission order, in slices of the
//! operation's batch size. Progress is persisted after every slice with a
//! status guard, so a record that was cancelled in the meantime keeps its
//! `cancelled` status.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use domain::models::{
    BulkOperation, OperationPatch, OperationProgress, OperationStatus, ProgressStage, TargetResult,
};
use domain::services::{audit_helpers, TargetHandler};
use persistence::repositories::BulkOperationRepository;
use persistence::RepositoryError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::middleware::metrics::record_operation_finished;

/// Message stored on operations stopped by a shutdown.
pub const INTERRUPTED_MESSAGE: &str = "Processing was interrupted before completion";

/// How a processor run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Every target was handled and the terminal status was stored.
    Finished(OperationStatus),
    /// The operation was cancelled or otherwise left `running` mid-way.
    Stopped,
    /// The operation was no longer pending when the processor started.
    Skipped,
    /// A store failure aborted processing; the operation was marked failed.
    Aborted(String),
}

pub struct BatchProcessor {
    repository: Arc<dyn BulkOperationRepository>,
    handler: Arc<dyn TargetHandler>,
    batch_delay: Duration,
}

enum Interrupt {
    Cancelled,
    Store(RepositoryError),
}

impl From<RepositoryError> for Interrupt {
    fn from(err: RepositoryError) -> Self {
        Interrupt::Store(err)
    }
}

impl BatchProcessor {
    pub fn new(
        repository: Arc<dyn BulkOperationRepository>,
        handler: Arc<dyn TargetHandler>,
        batch_delay: Duration,
    ) -> Self {
        Self {
            repository,
            handler,
            batch_delay,
        }
    }

    /// Processes `operation` until it finishes, is cancelled or the store fails.
    #[tracing::instrument(
        name = "bulk_operation",
        skip_all,
        fields(operation_id = %operation.id, operation_type = %operation.operation_type)
    )]
    pub async fn run(&self, operation: BulkOperation, cancel: CancellationToken) -> ProcessOutcome {
        let mut progress = OperationProgress::new(operation.total_items());
        let mut results: Vec<TargetResult> = Vec::with_capacity(operation.total_items());

        match self
            .process(&operation, &cancel, &mut progress, &mut results)
            .await
        {
            Ok(Some(status)) => {
                self.report_finished(&operation.id).await;
                ProcessOutcome::Finished(status)
            }
            Ok(None) => ProcessOutcome::Skipped,
            Err(Interrupt::Cancelled) => {
                self.handle_stop(&operation.id, progress, results).await;
                ProcessOutcome::Stopped
            }
            Err(Interrupt::Store(err)) => {
                let message = format!("Operation store error: {}", err);
                error!(error = %err, "Bulk operation aborted");
                self.mark_failed(&operation.id, &message).await;
                ProcessOutcome::Aborted(message)
            }
        }
    }

    /// Returns the stored terminal status, or `None` when the record was not
    /// pending at start.
    async fn process(
        &self,
        operation: &BulkOperation,
        cancel: &CancellationToken,
        progress: &mut OperationProgress,
        results: &mut Vec<TargetResult>,
    ) -> Result<Option<OperationStatus>, Interrupt> {
        progress.stage = ProgressStage::Processing;
        let started = self
            .repository
            .update_if_status(
                &operation.id,
                &[OperationStatus::Pending],
                OperationPatch::status(OperationStatus::Running)
                    .with_started_at(Utc::now())
                    .with_progress(progress.clone()),
            )
            .await?;
        if !started {
            debug!("Operation no longer pending, nothing to process");
            return Ok(None);
        }
        info!(targets = operation.total_items(), batch_size = operation.batch_size, "Bulk operation started");

        let batch_size = operation.batch_size.max(1);
        let batches: Vec<&[String]> = operation.target_ids.chunks(batch_size).collect();
        let batch_total = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            for target_id in batch {
                if cancel.is_cancelled() {
                    return Err(Interrupt::Cancelled);
                }
                let result = match self.handler.handle(target_id, &operation.parameters).await {
                    Ok(payload) => TargetResult::succeeded(target_id, payload),
                    Err(e) => {
                        debug!(target_id = %target_id, error = %e, "Target failed");
                        TargetResult::failed(target_id, e.to_string())
                    }
                };
                progress.record(target_id, result.success);
                results.push(result);
            }

            let last = index + 1 == batch_total;
            if last {
                progress.stage = ProgressStage::Finalizing;
            }
            let still_running = self
                .repository
                .update_if_status(
                    &operation.id,
                    &[OperationStatus::Running],
                    OperationPatch::default()
                        .with_progress(progress.clone())
                        .with_results(results.clone()),
                )
                .await?;
            if !still_running {
                return Err(Interrupt::Cancelled);
            }
            debug!(
                batch = index + 1,
                batches = batch_total,
                processed = progress.processed_items,
                "Batch processed"
            );

            if !last {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(Interrupt::Cancelled),
                    _ = tokio::time::sleep(self.batch_delay) => {}
                }
            }
        }

        progress.finish();
        let status = OperationStatus::from_outcome(progress.successful_items, progress.failed_items);
        let stored = self
            .repository
            .update_if_status(
                &operation.id,
                &[OperationStatus::Running],
                OperationPatch::status(status)
                    .with_progress(progress.clone())
                    .with_results(results.clone())
                    .with_completed_at(Utc::now()),
            )
            .await?;
        if !stored {
            return Err(Interrupt::Cancelled);
        }

        info!(
            status = %status,
            successful = progress.successful_items,
            failed = progress.failed_items,
            "Bulk operation finished"
        );
        Ok(Some(status))
    }

    /// Keeps the work done before a stop.
    ///
    /// A cancelled record gets the results gathered so far. A record that is
    /// still active was stopped by a shutdown and is marked failed.
    async fn handle_stop(&self, id: &str, progress: OperationProgress, results: Vec<TargetResult>) {
        let patch = OperationPatch::default()
            .with_progress(progress.clone())
            .with_results(results.clone());
        match self
            .repository
            .update_if_status(id, &[OperationStatus::Cancelled], patch)
            .await
        {
            Ok(true) => {
                info!(processed = progress.processed_items, "Bulk operation stopped after cancellation");
            }
            Ok(false) => {
                let patch = OperationPatch::status(OperationStatus::Failed)
                    .with_progress(progress)
                    .with_results(results)
                    .with_completed_at(Utc::now())
                    .with_error(INTERRUPTED_MESSAGE);
                match self
                    .repository
                    .update_if_status(id, &OperationStatus::ACTIVE, patch)
                    .await
                {
                    Ok(true) => {
                        warn!("Bulk operation interrupted");
                        self.report_finished(id).await;
                    }
                    Ok(false) => debug!("Operation already terminal, leaving it unchanged"),
                    Err(e) => error!(error = %e, "Failed to record interrupted operation"),
                }
            }
            Err(e) => error!(error = %e, "Failed to store partial results"),
        }
    }

    async fn mark_failed(&self, id: &str, message: &str) {
        let patch = OperationPatch::status(OperationStatus::Failed)
            .with_completed_at(Utc::now())
            .with_error(message);
        match self
            .repository
            .update_if_status(id, &OperationStatus::ACTIVE, patch)
            .await
        {
            Ok(true) => self.report_finished(id).await,
            Ok(false) => {}
            Err(e) => error!(error = %e, "Failed to mark operation as failed"),
        }
    }

    async fn report_finished(&self, id: &str) {
        match self.repository.get_by_id(id).await {
            Ok(Some(op)) => {
                audit_helpers::operation_finished(&op).emit();
                record_operation_finished(op.operation_type, op.status, op.duration_seconds());
            }
            Ok(None) => debug!("Finished operation already evicted"),
            Err(e) => warn!(error = %e, "Could not load finished operation"),
        }
    }
}
