//! Submission validation for bulk operations.

use serde_json::{Map, Value as JsonValue};
use shared::validation::{error_message, validate_target_id};
use std::collections::HashMap;

use crate::error::DomainError;
use crate::models::{OperationParameters, OperationType, TargetType, TargetValidation, ValidationOutcome};

/// Default ceiling on the number of targets per operation.
pub const DEFAULT_MAX_TARGETS: usize = 1000;

/// Validates bulk operation submissions before anything is stored.
#[derive(Debug, Clone)]
pub struct BulkOperationValidator {
    max_targets: usize,
}

impl BulkOperationValidator {
    pub fn new(max_targets: usize) -> Self {
        Self { max_targets }
    }

    pub fn max_targets(&self) -> usize {
        self.max_targets
    }

    /// Validates a submission and returns one verdict per target.
    ///
    /// Fails outright, before any per-target check, when the target list is
    /// empty, exceeds the configured maximum, or does not match the entity
    /// kind of the operation. Every other problem is reported per target so a
    /// single bad id never hides the verdicts of its siblings.
    pub fn validate(
        &self,
        operation_type: OperationType,
        target_type: TargetType,
        target_ids: &[String],
        parameters: &Map<String, JsonValue>,
    ) -> Result<ValidationOutcome, DomainError> {
        if target_ids.is_empty() {
            return Err(DomainError::NoTargets);
        }
        if target_ids.len() > self.max_targets {
            return Err(DomainError::TooManyTargets {
                count: target_ids.len(),
                max: self.max_targets,
            });
        }

        let expected = operation_type.target_type();
        if expected != target_type {
            return Err(DomainError::TargetTypeMismatch {
                operation_type,
                expected,
                actual: target_type,
            });
        }

        let (parameters, parameter_error) = match OperationParameters::parse(operation_type, parameters) {
            Ok(params) => (Some(params), None),
            Err(e) => (None, Some(e.to_string())),
        };

        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        for id in target_ids {
            *occurrences.entry(id.as_str()).or_default() += 1;
        }

        let results = target_ids
            .iter()
            .map(|id| {
                let mut errors = Vec::new();
                let mut warnings = Vec::new();

                if let Err(e) = validate_target_id(id) {
                    errors.push(error_message(&e));
                }
                if let Some(ref msg) = parameter_error {
                    errors.push(msg.clone());
                }

                let count = occurrences.get(id.as_str()).copied().unwrap_or(0);
                if count > 1 && !id.trim().is_empty() {
                    warnings.push(format!(
                        "Duplicate target ID: appears {} times and will be processed each time",
                        count
                    ));
                }

                TargetValidation::new(id.clone(), errors, warnings)
            })
            .collect();

        Ok(ValidationOutcome {
            results,
            parameters,
        })
    }
}

impl Default for BulkOperationValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TARGETS)
    }
}
