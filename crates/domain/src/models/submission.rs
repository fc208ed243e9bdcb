//! Request and response DTOs for the bulk operations API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use shared::pagination::{PageRequest, Pagination};
use validator::Validate;

use super::bulk_operation::{
    BulkOperation, OperationFilter, OperationStatus, OperationType, TargetType,
};
use super::statistics::OperationStatistics;
use super::validation::TargetValidation;

/// Request to submit a bulk operation.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitBulkOperationRequest {
    pub operation_type: OperationType,

    pub target_type: TargetType,

    /// Target identifiers, processed in the given order.
    #[serde(default)]
    pub target_ids: Vec<String>,

    /// Free-form parameters; required keys depend on the operation type.
    #[serde(default)]
    pub parameters: Map<String, JsonValue>,

    #[validate(length(max = 500, message = "reason must be at most 500 characters"))]
    pub reason: Option<String>,

    #[validate(range(min = 1, message = "batch_size must be at least 1"))]
    pub batch_size: Option<usize>,

    /// Validate and estimate without storing or processing anything.
    #[serde(default)]
    pub dry_run: bool,

    pub metadata: Option<Map<String, JsonValue>>,
}

/// Response to a bulk operation submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitBulkOperationResponse {
    pub operation: BulkOperation,
    pub validation_results: Vec<TargetValidation>,
    pub estimated_duration_seconds: u64,
    pub warnings: Vec<String>,
    pub dry_run: bool,
}

/// Query parameters for listing bulk operations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListOperationsQuery {
    pub operation_type: Option<OperationType>,
    pub target_type: Option<TargetType>,
    pub status: Option<OperationStatus>,
    pub created_by: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListOperationsQuery {
    pub fn to_filter(&self) -> OperationFilter {
        OperationFilter {
            operation_type: self.operation_type,
            target_type: self.target_type,
            status: self.status,
            created_by: self.created_by.clone(),
            created_after: self.created_after,
            created_before: self.created_before,
            search: self.search.clone(),
        }
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

/// Response for a bulk operation listing.
#[derive(Debug, Clone, Serialize)]
pub struct ListOperationsResponse {
    pub operations: Vec<BulkOperation>,
    pub pagination: Pagination,
    pub filters: OperationFilter,
    pub summary: OperationStatistics,
}

/// Request to cancel a bulk operation.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CancelOperationRequest {
    #[validate(length(max = 500, message = "reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

/// Response to a cancellation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOperationResponse {
    pub success: bool,
    pub message: String,
}

/// Describes one supported operation type for admin UIs.
#[derive(Debug, Clone, Serialize)]
pub struct OperationTypeInfo {
    pub operation_type: OperationType,
    pub label: &'static str,
    pub target_type: TargetType,
    pub required_parameters: &'static [&'static str],
}

impl From<OperationType> for OperationTypeInfo {
    fn from(operation_type: OperationType) -> Self {
        Self {
            operation_type,
            label: operation_type.label(),
            target_type: operation_type.target_type(),
            required_parameters: operation_type.required_parameters(),
        }
    }
}
