//! Background job publishing the number of stored operations per status.

use std::sync::Arc;

use domain::models::OperationFilter;
use domain::services::summarize;
use persistence::repositories::BulkOperationRepository;

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::record_operations_by_status;

pub struct OperationMetricsJob {
    repository: Arc<dyn BulkOperationRepository>,
}

impl OperationMetricsJob {
    pub fn new(repository: Arc<dyn BulkOperationRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait::async_trait]
impl Job for OperationMetricsJob {
    fn name(&self) -> &'static str {
        "operation_metrics"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(15)
    }

    fn run_on_start(&self) -> bool {
        true
    }

    async fn execute(&self) -> Result<(), String> {
        let operations = self
            .repository
            .filter(&OperationFilter::default())
            .await
            .map_err(|e| format!("Failed to load operations: {}", e))?;

        let stats = summarize(&operations);
        record_operations_by_status(&stats.by_status);
        tracing::debug!(
            total = stats.total_operations,
            running = stats.running_operations,
            "Operation gauges refreshed"
        );
        Ok(())
    }
}
