//! Domain models for FocuSprint bulk operations.

pub mod bulk_operation;
pub mod parameters;
pub mod statistics;
pub mod submission;
pub mod validation;

pub use bulk_operation::{
    BulkOperation, OperationFilter, OperationPatch, OperationProgress, OperationStatus,
    OperationType, ProgressStage, TargetResult, TargetType,
};
pub use parameters::{
    AuditExportFormat, AuditExportParams, LicenseExtensionParams, NoParams, OperationParameters,
    ParameterError, PasswordResetParams, PlanChangeParams, RoleChangeParams, UserStatusParams,
};
pub use statistics::OperationStatistics;
pub use submission::{
    CancelOperationRequest, CancelOperationResponse, ListOperationsQuery, ListOperationsResponse,
    OperationTypeInfo, SubmitBulkOperationRequest, SubmitBulkOperationResponse,
};
pub use validation::{TargetValidation, ValidationOutcome};
