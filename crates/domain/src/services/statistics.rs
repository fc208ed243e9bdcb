//! Aggregation of operation records into dashboard statistics.

use crate::models::{BulkOperation, OperationStatistics, OperationStatus};

/// Summarizes a set of operations. Pure; the input is not modified.
pub fn summarize<'a, I>(operations: I) -> OperationStatistics
where
    I: IntoIterator<Item = &'a BulkOperation>,
{
    let mut stats = OperationStatistics::default();
    let mut completion_total = 0.0;
    let mut completion_count = 0usize;

    for op in operations {
        stats.total_operations += 1;
        if op.status == OperationStatus::Running {
            stats.running_operations += 1;
        }
        *stats.by_status.entry(op.status.to_string()).or_default() += 1;
        *stats.by_type.entry(op.operation_type.to_string()).or_default() += 1;
        *stats
            .by_target_type
            .entry(op.target_type.to_string())
            .or_default() += 1;

        stats.total_targets += op.total_items();
        stats.successful_items += op.progress.successful_items;
        stats.failed_items += op.progress.failed_items;

        if let Some(seconds) = op.duration_seconds() {
            completion_total += seconds;
            completion_count += 1;
        }
    }

    let processed = stats.successful_items + stats.failed_items;
    if processed > 0 {
        stats.success_rate = stats.successful_items as f64 * 100.0 / processed as f64;
    }
    if completion_count > 0 {
        stats.average_completion_seconds = Some(completion_total / completion_count as f64);
    }

    stats
}
