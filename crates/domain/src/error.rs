//! Domain error types.

use thiserror::Error;

use crate::models::{OperationStatus, OperationType, TargetType, TargetValidation};

/// Errors raised by bulk operation business rules.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("At least one target ID is required")]
    NoTargets,

    #[error("Too many targets: {count} exceeds the maximum of {max}")]
    TooManyTargets { count: usize, max: usize },

    #[error("Operation {operation_type} applies to {expected}, not {actual}")]
    TargetTypeMismatch {
        operation_type: OperationType,
        expected: TargetType,
        actual: TargetType,
    },

    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(String),

    #[error(
        "Validation failed for {} of {} target(s)",
        .results.iter().filter(|r| !r.can_proceed).count(),
        .results.len()
    )]
    ValidationFailed { results: Vec<TargetValidation> },

    #[error("Maximum of {max} concurrent operations reached")]
    ConcurrencyLimitReached { max: usize },

    #[error("Operation not found: {0}")]
    OperationNotFound(String),

    #[error("Operation {id} is already {status}")]
    AlreadyFinished { id: String, status: OperationStatus },
}
