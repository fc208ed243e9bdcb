//! Typed parameters for each bulk operation type.
//!
//! Requests carry a free-form JSON object; it is parsed into the variant
//! matching the operation type so handlers can match exhaustively.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use shared::validation::{error_message, validate_not_blank};
use thiserror::Error;

use super::bulk_operation::OperationType;

/// Error produced while turning a raw parameter map into typed parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("Missing required parameter(s): {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Invalid parameters: {0}")]
    Invalid(String),
}

/// Parameters for enabling or disabling user accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatusParams {
    #[serde(default)]
    pub notify_users: bool,
}

/// Parameters for changing the role of users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChangeParams {
    pub new_role: String,
}

/// Parameters for resetting user passwords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetParams {
    #[serde(default = "default_send_email")]
    pub send_email: bool,
}

impl Default for PasswordResetParams {
    fn default() -> Self {
        Self {
            send_email: default_send_email(),
        }
    }
}

fn default_send_email() -> bool {
    true
}

/// Parameters for moving clients to another subscription plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanChangeParams {
    pub new_plan_id: String,
    #[serde(default)]
    pub prorate: bool,
}

/// Parameters for extending license validity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseExtensionParams {
    pub extension_days: u32,
}

/// Audit log export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditExportFormat {
    Json,
    Csv,
}

/// Parameters for exporting audit log entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditExportParams {
    pub format: AuditExportFormat,
}

/// Operation types that take no parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoParams {}

/// Parameters keyed by operation type.
///
/// Serialized as the variant's plain object so stored records look like the
/// submitted request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OperationParameters {
    EnableUsers(UserStatusParams),
    DisableUsers(UserStatusParams),
    UpdateUserRoles(RoleChangeParams),
    ResetUserPasswords(PasswordResetParams),
    ChangeClientPlans(PlanChangeParams),
    SuspendClients(NoParams),
    ActivateClients(NoParams),
    ExtendLicenses(LicenseExtensionParams),
    RevokeLicenses(NoParams),
    ExportAuditLogs(AuditExportParams),
    ArchiveAuditLogs(NoParams),
}

impl OperationParameters {
    /// Parses a raw parameter map for the given operation type.
    ///
    /// Every required key is checked first so a caller sees all missing keys
    /// at once; unknown keys are ignored.
    pub fn parse(
        operation_type: OperationType,
        raw: &Map<String, JsonValue>,
    ) -> Result<Self, ParameterError> {
        let missing: Vec<String> = operation_type
            .required_parameters()
            .iter()
            .filter(|key| raw.get(**key).map_or(true, JsonValue::is_null))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ParameterError::Missing(missing));
        }

        let params = match operation_type {
            OperationType::EnableUsers => Self::EnableUsers(decode(raw)?),
            OperationType::DisableUsers => Self::DisableUsers(decode(raw)?),
            OperationType::UpdateUserRoles => {
                let params: RoleChangeParams = decode(raw)?;
                check_not_blank("new_role", &params.new_role)?;
                Self::UpdateUserRoles(params)
            }
            OperationType::ResetUserPasswords => Self::ResetUserPasswords(decode(raw)?),
            OperationType::ChangeClientPlans => {
                let params: PlanChangeParams = decode(raw)?;
                check_not_blank("new_plan_id", &params.new_plan_id)?;
                Self::ChangeClientPlans(params)
            }
            OperationType::SuspendClients => Self::SuspendClients(decode(raw)?),
            OperationType::ActivateClients => Self::ActivateClients(decode(raw)?),
            OperationType::ExtendLicenses => {
                let params: LicenseExtensionParams = decode(raw)?;
                if params.extension_days == 0 {
                    return Err(ParameterError::Invalid(
                        "extension_days must be at least 1".to_string(),
                    ));
                }
                Self::ExtendLicenses(params)
            }
            OperationType::RevokeLicenses => Self::RevokeLicenses(decode(raw)?),
            OperationType::ExportAuditLogs => Self::ExportAuditLogs(decode(raw)?),
            OperationType::ArchiveAuditLogs => Self::ArchiveAuditLogs(decode(raw)?),
        };

        Ok(params)
    }

    /// The operation type these parameters belong to.
    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::EnableUsers(_) => OperationType::EnableUsers,
            Self::DisableUsers(_) => OperationType::DisableUsers,
            Self::UpdateUserRoles(_) => OperationType::UpdateUserRoles,
            Self::ResetUserPasswords(_) => OperationType::ResetUserPasswords,
            Self::ChangeClientPlans(_) => OperationType::ChangeClientPlans,
            Self::SuspendClients(_) => OperationType::SuspendClients,
            Self::ActivateClients(_) => OperationType::ActivateClients,
            Self::ExtendLicenses(_) => OperationType::ExtendLicenses,
            Self::RevokeLicenses(_) => OperationType::RevokeLicenses,
            Self::ExportAuditLogs(_) => OperationType::ExportAuditLogs,
            Self::ArchiveAuditLogs(_) => OperationType::ArchiveAuditLogs,
        }
    }

    /// Plain JSON object form, as stored and returned to callers.
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or_else(|_| JsonValue::Object(Map::new()))
    }
}

fn decode<T: DeserializeOwned>(raw: &Map<String, JsonValue>) -> Result<T, ParameterError> {
    serde_json::from_value(JsonValue::Object(raw.clone()))
        .map_err(|e| ParameterError::Invalid(e.to_string()))
}

fn check_not_blank(field: &str, value: &str) -> Result<(), ParameterError> {
    validate_not_blank(value)
        .map_err(|e| ParameterError::Invalid(format!("{}: {}", field, error_message(&e))))
}
