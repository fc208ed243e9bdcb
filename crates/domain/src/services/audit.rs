//! Audit trail for bulk operation lifecycle events.
//!
//! Events are emitted on the `audit` tracing target so deployments can route
//! them to a dedicated sink with an `EnvFilter` directive.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::models::BulkOperation;

/// Tracing target every audit event is emitted on.
pub const AUDIT_TARGET: &str = "audit";

/// Lifecycle action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    OperationSubmitted,
    OperationCancelled,
    OperationFinished,
    OperationInterrupted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::OperationSubmitted => "bulk_operation.submitted",
            AuditAction::OperationCancelled => "bulk_operation.cancelled",
            AuditAction::OperationFinished => "bulk_operation.finished",
            AuditAction::OperationInterrupted => "bulk_operation.interrupted",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    Admin,
    System,
}

/// A single audit record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub actor_type: ActorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_name: Option<String>,
    pub resource_type: &'static str,
    pub resource_id: String,
    pub details: Map<String, JsonValue>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Writes the event to the audit tracing target.
    pub fn emit(&self) {
        let details = JsonValue::Object(self.details.clone());
        tracing::info!(
            target: AUDIT_TARGET,
            action = %self.action,
            actor_type = ?self.actor_type,
            actor_id = self.actor_id.as_deref().unwrap_or("system"),
            actor_name = self.actor_name.as_deref().unwrap_or(""),
            resource_type = self.resource_type,
            resource_id = %self.resource_id,
            details = %details,
            "Audit event"
        );
    }
}

/// Fluent builder for [`AuditEvent`].
#[derive(Debug, Clone)]
pub struct AuditEventBuilder {
    action: AuditAction,
    actor_type: ActorType,
    actor_id: Option<String>,
    actor_name: Option<String>,
    resource_id: String,
    details: Map<String, JsonValue>,
}

impl AuditEventBuilder {
    /// Action performed by an authenticated admin.
    pub fn admin_action(
        admin_id: impl Into<String>,
        admin_name: impl Into<String>,
        action: AuditAction,
    ) -> Self {
        Self {
            action,
            actor_type: ActorType::Admin,
            actor_id: Some(admin_id.into()),
            actor_name: Some(admin_name.into()),
            resource_id: String::new(),
            details: Map::new(),
        }
    }

    /// Action performed by the service itself.
    pub fn system_action(action: AuditAction) -> Self {
        Self {
            action,
            actor_type: ActorType::System,
            actor_id: None,
            actor_name: None,
            resource_id: String::new(),
            details: Map::new(),
        }
    }

    pub fn on_operation(mut self, operation_id: impl Into<String>) -> Self {
        self.resource_id = operation_id.into();
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> AuditEvent {
        AuditEvent {
            action: self.action,
            actor_type: self.actor_type,
            actor_id: self.actor_id,
            actor_name: self.actor_name,
            resource_type: "bulk_operation",
            resource_id: self.resource_id,
            details: self.details,
            timestamp: Utc::now(),
        }
    }

    /// Builds and emits in one step.
    pub fn emit(self) -> AuditEvent {
        let event = self.build();
        event.emit();
        event
    }
}

/// Convenience constructors for the lifecycle events.
pub mod audit_helpers {
    use super::*;

    pub fn operation_submitted(op: &BulkOperation) -> AuditEvent {
        let mut builder = AuditEventBuilder::admin_action(
            &op.created_by,
            &op.created_by_name,
            AuditAction::OperationSubmitted,
        )
        .on_operation(&op.id)
        .with_detail("operation_type", op.operation_type.as_str())
        .with_detail("target_type", op.target_type.as_str())
        .with_detail("target_count", op.total_items())
        .with_detail("batch_size", op.batch_size);
        if let Some(ref reason) = op.reason {
            builder = builder.with_detail("reason", reason.as_str());
        }
        builder.build()
    }

    pub fn operation_cancelled(
        operation_id: &str,
        admin_id: &str,
        admin_name: &str,
        reason: &str,
    ) -> AuditEvent {
        AuditEventBuilder::admin_action(admin_id, admin_name, AuditAction::OperationCancelled)
            .on_operation(operation_id)
            .with_detail("reason", reason)
            .build()
    }

    pub fn operation_finished(op: &BulkOperation) -> AuditEvent {
        let mut builder = AuditEventBuilder::system_action(AuditAction::OperationFinished)
            .on_operation(&op.id)
            .with_detail("operation_type", op.operation_type.as_str())
            .with_detail("status", op.status.as_str())
            .with_detail("successful_items", op.progress.successful_items)
            .with_detail("failed_items", op.progress.failed_items);
        if let Some(ref error) = op.error_message {
            builder = builder.with_detail("error", error.as_str());
        }
        builder.build()
    }

    pub fn operations_interrupted(count: u64) -> AuditEvent {
        AuditEventBuilder::system_action(AuditAction::OperationInterrupted)
            .with_detail("count", count)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_admin_action_builder() {
        let event = AuditEventBuilder::admin_action("admin-1", "Alice", AuditAction::OperationCancelled)
            .on_operation("bulk_1")
            .with_detail("reason", "wrong list")
            .build();

        assert_eq!(event.actor_type, ActorType::Admin);
        assert_eq!(event.actor_id.as_deref(), Some("admin-1"));
        assert_eq!(event.resource_type, "bulk_operation");
        assert_eq!(event.resource_id, "bulk_1");
        assert_eq!(event.details["reason"], json!("wrong list"));
    }

    #[test]
    fn test_system_action_has_no_actor() {
        let event = audit_helpers::operations_interrupted(2);
        assert_eq!(event.actor_type, ActorType::System);
        assert!(event.actor_id.is_none());
        assert_eq!(event.details["count"], json!(2));
    }

    #[test]
    fn test_event_serialization() {
        let event = AuditEventBuilder::system_action(AuditAction::OperationFinished)
            .on_operation("bulk_2")
            .emit();
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["action"], "operation_finished");
        assert_eq!(value["actor_type"], "system");
        assert!(value.get("actor_id").is_none());
        assert_eq!(AuditAction::OperationFinished.to_string(), "bulk_operation.finished");
    }
}
