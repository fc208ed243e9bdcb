//! Bulk operation domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

use super::parameters::OperationParameters;

/// Kinds of entity a bulk operation can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Users,
    Licenses,
    Clients,
    AuditLogs,
}

impl TargetType {
    pub const ALL: [TargetType; 4] = [
        TargetType::Users,
        TargetType::Licenses,
        TargetType::Clients,
        TargetType::AuditLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Users => "USERS",
            TargetType::Licenses => "LICENSES",
            TargetType::Clients => "CLIENTS",
            TargetType::AuditLogs => "AUDIT_LOGS",
        }
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown target type: {}", s))
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrative actions that can be applied in bulk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    EnableUsers,
    DisableUsers,
    UpdateUserRoles,
    ResetUserPasswords,
    ChangeClientPlans,
    SuspendClients,
    ActivateClients,
    ExtendLicenses,
    RevokeLicenses,
    ExportAuditLogs,
    ArchiveAuditLogs,
}

impl OperationType {
    pub const ALL: [OperationType; 11] = [
        OperationType::EnableUsers,
        OperationType::DisableUsers,
        OperationType::UpdateUserRoles,
        OperationType::ResetUserPasswords,
        OperationType::ChangeClientPlans,
        OperationType::SuspendClients,
        OperationType::ActivateClients,
        OperationType::ExtendLicenses,
        OperationType::RevokeLicenses,
        OperationType::ExportAuditLogs,
        OperationType::ArchiveAuditLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::EnableUsers => "ENABLE_USERS",
            OperationType::DisableUsers => "DISABLE_USERS",
            OperationType::UpdateUserRoles => "UPDATE_USER_ROLES",
            OperationType::ResetUserPasswords => "RESET_USER_PASSWORDS",
            OperationType::ChangeClientPlans => "CHANGE_CLIENT_PLANS",
            OperationType::SuspendClients => "SUSPEND_CLIENTS",
            OperationType::ActivateClients => "ACTIVATE_CLIENTS",
            OperationType::ExtendLicenses => "EXTEND_LICENSES",
            OperationType::RevokeLicenses => "REVOKE_LICENSES",
            OperationType::ExportAuditLogs => "EXPORT_AUDIT_LOGS",
            OperationType::ArchiveAuditLogs => "ARCHIVE_AUDIT_LOGS",
        }
    }

    /// Human-readable label shown on admin dashboards.
    pub fn label(&self) -> &'static str {
        match self {
            OperationType::EnableUsers => "Enable users",
            OperationType::DisableUsers => "Disable users",
            OperationType::UpdateUserRoles => "Update user roles",
            OperationType::ResetUserPasswords => "Reset user passwords",
            OperationType::ChangeClientPlans => "Change client plans",
            OperationType::SuspendClients => "Suspend clients",
            OperationType::ActivateClients => "Activate clients",
            OperationType::ExtendLicenses => "Extend licenses",
            OperationType::RevokeLicenses => "Revoke licenses",
            OperationType::ExportAuditLogs => "Export audit logs",
            OperationType::ArchiveAuditLogs => "Archive audit logs",
        }
    }

    /// The entity kind this operation acts on.
    pub fn target_type(&self) -> TargetType {
        match self {
            OperationType::EnableUsers
            | OperationType::DisableUsers
            | OperationType::UpdateUserRoles
            | OperationType::ResetUserPasswords => TargetType::Users,
            OperationType::ChangeClientPlans
            | OperationType::SuspendClients
            | OperationType::ActivateClients => TargetType::Clients,
            OperationType::ExtendLicenses | OperationType::RevokeLicenses => TargetType::Licenses,
            OperationType::ExportAuditLogs | OperationType::ArchiveAuditLogs => {
                TargetType::AuditLogs
            }
        }
    }

    /// Parameter keys that must be present for this operation type.
    pub fn required_parameters(&self) -> &'static [&'static str] {
        match self {
            OperationType::UpdateUserRoles => &["new_role"],
            OperationType::ChangeClientPlans => &["new_plan_id"],
            OperationType::ExtendLicenses => &["extension_days"],
            OperationType::ExportAuditLogs => &["format"],
            OperationType::EnableUsers
            | OperationType::DisableUsers
            | OperationType::ResetUserPasswords
            | OperationType::SuspendClients
            | OperationType::ActivateClients
            | OperationType::RevokeLicenses
            | OperationType::ArchiveAuditLogs => &[],
        }
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown operation type: {}", s))
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a bulk operation.
///
/// Transitions only move forward: `pending -> running -> {completed, failed,
/// partial_success, cancelled}` or `pending -> cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Running,
    Completed,
    Failed,
    PartialSuccess,
    Cancelled,
}

impl OperationStatus {
    pub const ALL: [OperationStatus; 6] = [
        OperationStatus::Pending,
        OperationStatus::Running,
        OperationStatus::Completed,
        OperationStatus::Failed,
        OperationStatus::PartialSuccess,
        OperationStatus::Cancelled,
    ];

    /// Statuses from which an operation can still change.
    pub const ACTIVE: [OperationStatus; 2] = [OperationStatus::Pending, OperationStatus::Running];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Running => "running",
            OperationStatus::Completed => "completed",
            OperationStatus::Failed => "failed",
            OperationStatus::PartialSuccess => "partial_success",
            OperationStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !Self::ACTIVE.contains(self)
    }

    pub fn can_transition_to(&self, next: OperationStatus) -> bool {
        match self {
            OperationStatus::Pending => matches!(
                next,
                OperationStatus::Running | OperationStatus::Failed | OperationStatus::Cancelled
            ),
            OperationStatus::Running => next.is_terminal(),
            _ => false,
        }
    }

    /// Derives the terminal status from per-target outcome counts.
    pub fn from_outcome(successful: usize, failed: usize) -> OperationStatus {
        if failed == 0 {
            OperationStatus::Completed
        } else if successful == 0 {
            OperationStatus::Failed
        } else {
            OperationStatus::PartialSuccess
        }
    }
}

impl FromStr for OperationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown operation status: {}", s))
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse stage marker shown next to the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    #[default]
    Queued,
    Processing,
    Finalizing,
    Done,
}

/// Progress snapshot of a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationProgress {
    pub total_items: usize,
    pub processed_items: usize,
    pub successful_items: usize,
    pub failed_items: usize,
    pub percentage_complete: u32,
    pub stage: ProgressStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_item: Option<String>,
}

impl OperationProgress {
    pub fn new(total_items: usize) -> Self {
        Self {
            total_items,
            processed_items: 0,
            successful_items: 0,
            failed_items: 0,
            percentage_complete: 0,
            stage: ProgressStage::Queued,
            current_item: None,
        }
    }

    /// Records one processed target. Ignored once every item is accounted for.
    pub fn record(&mut self, target_id: &str, success: bool) {
        if self.processed_items >= self.total_items {
            return;
        }
        self.processed_items += 1;
        if success {
            self.successful_items += 1;
        } else {
            self.failed_items += 1;
        }
        self.current_item = Some(target_id.to_string());
        self.percentage_complete = self.percentage();
    }

    fn percentage(&self) -> u32 {
        if self.total_items == 0 {
            return 100;
        }
        ((self.processed_items * 100) / self.total_items) as u32
    }

    pub fn is_consistent(&self) -> bool {
        self.processed_items <= self.total_items
            && self.successful_items + self.failed_items == self.processed_items
    }

    /// Marks the snapshot as finished.
    pub fn finish(&mut self) {
        self.stage = ProgressStage::Done;
        self.percentage_complete = self.percentage();
        self.current_item = None;
    }
}

/// Outcome of processing a single target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetResult {
    pub target_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl TargetResult {
    pub fn succeeded(target_id: impl Into<String>, result: JsonValue) -> Self {
        Self {
            target_id: target_id.into(),
            success: true,
            result: Some(result),
            error: None,
            processed_at: Utc::now(),
        }
    }

    pub fn failed(target_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            success: false,
            result: None,
            error: Some(error.into()),
            processed_at: Utc::now(),
        }
    }
}

/// One bulk-action request plus its evolving execution record.
#[derive(Debug, Clone, Serialize)]
pub struct BulkOperation {
    pub id: String,
    pub operation_type: OperationType,
    pub target_type: TargetType,
    pub target_ids: Vec<String>,
    pub parameters: OperationParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
    pub batch_size: usize,
    pub status: OperationStatus,
    pub progress: OperationProgress,
    pub results: Vec<TargetResult>,
    pub created_by: String,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl BulkOperation {
    pub fn total_items(&self) -> usize {
        self.target_ids.len()
    }

    /// Wall-clock seconds between start and completion, when both are known.
    pub fn duration_seconds(&self) -> Option<f64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => {
                Some((end - start).num_milliseconds().max(0) as f64 / 1000.0)
            }
            _ => None,
        }
    }

    /// Merges a partial update into this record.
    pub fn apply(&mut self, patch: OperationPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(progress) = patch.progress {
            self.progress = progress;
        }
        if let Some(results) = patch.results {
            self.results = results;
        }
        if let Some(started_at) = patch.started_at {
            self.started_at = Some(started_at);
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = Some(completed_at);
        }
        if let Some(error_message) = patch.error_message {
            self.error_message = Some(error_message);
        }
    }
}

/// Partial update of an operation record. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationPatch {
    pub status: Option<OperationStatus>,
    pub progress: Option<OperationProgress>,
    pub results: Option<Vec<TargetResult>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl OperationPatch {
    pub fn status(status: OperationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, progress: OperationProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_results(mut self, results: Vec<TargetResult>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }

    pub fn with_completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// Filter predicate over stored operations. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<OperationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_type: Option<TargetType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OperationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl OperationFilter {
    pub fn matches(&self, op: &BulkOperation) -> bool {
        if self.operation_type.is_some_and(|t| t != op.operation_type) {
            return false;
        }
        if self.target_type.is_some_and(|t| t != op.target_type) {
            return false;
        }
        if self.status.is_some_and(|s| s != op.status) {
            return false;
        }
        if let Some(ref creator) = self.created_by {
            if creator != &op.created_by {
                return false;
            }
        }
        if self.created_after.is_some_and(|after| op.created_at < after) {
            return false;
        }
        if self.created_before.is_some_and(|before| op.created_at > before) {
            return false;
        }
        match self.search_term() {
            Some(term) => {
                let haystacks = [
                    Some(op.id.as_str()),
                    op.reason.as_deref(),
                    Some(op.created_by_name.as_str()),
                    Some(op.operation_type.as_str()),
                ];
                haystacks
                    .into_iter()
                    .flatten()
                    .any(|h| h.to_lowercase().contains(&term))
            }
            None => true,
        }
    }

    /// Lowercased, trimmed search term; `None` when absent or blank.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}
