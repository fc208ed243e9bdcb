//! Domain services for bulk operations.
//!
//! Services contain business logic that operates on domain models.

pub mod audit;
pub mod handlers;
pub mod planning;
pub mod statistics;
pub mod validator;

pub use audit::{audit_helpers, AuditAction, AuditEvent, AuditEventBuilder};
pub use handlers::{HandlerError, SimulatedTargetHandler, TargetHandler};
pub use planning::{batch_count, estimate_duration_seconds, submission_warnings, PlanSettings};
pub use statistics::summarize;
pub use validator::{BulkOperationValidator, DEFAULT_MAX_TARGETS};
