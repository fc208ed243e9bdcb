//! Aggregated bulk operation statistics for dashboards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts and averages over a set of operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationStatistics {
    pub total_operations: usize,
    pub running_operations: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub by_target_type: BTreeMap<String, usize>,
    pub total_targets: usize,
    pub successful_items: usize,
    pub failed_items: usize,
    /// Percentage of processed targets that succeeded (0 when nothing ran).
    pub success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_completion_seconds: Option<f64>,
}
