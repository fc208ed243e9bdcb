//! Batch planning and duration estimates for submissions.

use crate::models::ValidationOutcome;

/// Tunables used when estimating how long an operation will take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSettings {
    /// Expected handler time per target, in milliseconds.
    pub per_item_estimate_ms: u64,
    /// Pause inserted after each batch, in milliseconds.
    pub batch_delay_ms: u64,
    /// Target count above which a "large operation" warning is issued.
    pub large_operation_threshold: usize,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            per_item_estimate_ms: 50,
            batch_delay_ms: 100,
            large_operation_threshold: 500,
        }
    }
}

/// Number of batches needed to cover `total` targets.
pub fn batch_count(total: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    total.div_ceil(batch_size)
}

/// Estimated wall-clock duration in whole seconds, rounded up.
pub fn estimate_duration_seconds(total: usize, batch_size: usize, settings: &PlanSettings) -> u64 {
    let processing_ms = total as u64 * settings.per_item_estimate_ms;
    // No pause follows the last batch.
    let pauses = batch_count(total, batch_size).saturating_sub(1) as u64;
    let delay_ms = pauses * settings.batch_delay_ms;
    (processing_ms + delay_ms).div_ceil(1000)
}

/// Submission-level warnings shown next to the per-target verdicts.
pub fn submission_warnings(
    outcome: &ValidationOutcome,
    batch_size: usize,
    dry_run: bool,
    settings: &PlanSettings,
) -> Vec<String> {
    let mut warnings = Vec::new();
    let total = outcome.results.len();

    if dry_run {
        warnings.push("Dry run: no changes will be made".to_string());
    }

    let duplicated = outcome
        .results
        .iter()
        .filter(|r| !r.warnings.is_empty())
        .count();
    if duplicated > 0 {
        warnings.push(format!(
            "{} target(s) appear more than once in the target list",
            duplicated
        ));
    }

    if total > settings.large_operation_threshold {
        warnings.push(format!(
            "Large operation: {} targets will be processed in {} batches",
            total,
            batch_count(total, batch_size)
        ));
    }

    warnings
}
