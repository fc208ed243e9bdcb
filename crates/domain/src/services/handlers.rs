//! Per-target handlers that apply a bulk action to one entity.
//!
//! The handler is injected into the batch processor so tests can swap in
//! slow or failing implementations.

use serde_json::{json, Value as JsonValue};
use std::collections::HashSet;
use thiserror::Error;

use crate::models::{AuditExportFormat, OperationParameters};

/// Failure while applying an action to a single target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("Target not found: {0}")]
    NotFound(String),

    #[error("Action rejected: {0}")]
    Rejected(String),

    #[error("Target handler failed: {0}")]
    Failed(String),
}

/// Applies a bulk action to one target.
#[async_trait::async_trait]
pub trait TargetHandler: Send + Sync {
    /// Handle one target and return a payload describing the change.
    async fn handle(
        &self,
        target_id: &str,
        parameters: &OperationParameters,
    ) -> Result<JsonValue, HandlerError>;
}

/// Handler that describes the change it would make without touching anything.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTargetHandler {
    /// Target ids that simulate a missing entity.
    missing: HashSet<String>,
}

impl SimulatedTargetHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler that reports the given targets as not found.
    pub fn with_missing<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            missing: ids.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait::async_trait]
impl TargetHandler for SimulatedTargetHandler {
    async fn handle(
        &self,
        target_id: &str,
        parameters: &OperationParameters,
    ) -> Result<JsonValue, HandlerError> {
        if target_id.trim().is_empty() {
            return Err(HandlerError::Rejected("empty target id".to_string()));
        }
        if self.missing.contains(target_id) {
            tracing::debug!(target_id = %target_id, "Simulated target not found");
            return Err(HandlerError::NotFound(target_id.to_string()));
        }

        let payload = match parameters {
            OperationParameters::EnableUsers(p) => json!({
                "user_id": target_id,
                "enabled": true,
                "notified": p.notify_users,
            }),
            OperationParameters::DisableUsers(p) => json!({
                "user_id": target_id,
                "enabled": false,
                "notified": p.notify_users,
            }),
            OperationParameters::UpdateUserRoles(p) => json!({
                "user_id": target_id,
                "role": p.new_role,
            }),
            OperationParameters::ResetUserPasswords(p) => json!({
                "user_id": target_id,
                "password_reset": true,
                "email_sent": p.send_email,
            }),
            OperationParameters::ChangeClientPlans(p) => json!({
                "client_id": target_id,
                "plan_id": p.new_plan_id,
                "prorated": p.prorate,
            }),
            OperationParameters::SuspendClients(_) => json!({
                "client_id": target_id,
                "status": "suspended",
            }),
            OperationParameters::ActivateClients(_) => json!({
                "client_id": target_id,
                "status": "active",
            }),
            OperationParameters::ExtendLicenses(p) => json!({
                "license_id": target_id,
                "extended_by_days": p.extension_days,
            }),
            OperationParameters::RevokeLicenses(_) => json!({
                "license_id": target_id,
                "revoked": true,
            }),
            OperationParameters::ExportAuditLogs(p) => json!({
                "audit_log_id": target_id,
                "exported": true,
                "format": match p.format {
                    AuditExportFormat::Json => "json",
                    AuditExportFormat::Csv => "csv",
                },
            }),
            OperationParameters::ArchiveAuditLogs(_) => json!({
                "audit_log_id": target_id,
                "archived": true,
            }),
        };

        Ok(payload)
    }
}
