//! Per-target validation verdicts.

use serde::{Deserialize, Serialize};

use super::parameters::OperationParameters;

/// Validation verdict for a single target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetValidation {
    pub target_id: String,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub can_proceed: bool,
}

impl TargetValidation {
    pub fn new(target_id: impl Into<String>, errors: Vec<String>, warnings: Vec<String>) -> Self {
        let is_valid = errors.is_empty();
        Self {
            target_id: target_id.into(),
            is_valid,
            errors,
            warnings,
            can_proceed: is_valid,
        }
    }
}

/// Result of validating a whole submission.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub results: Vec<TargetValidation>,
    /// Typed parameters, present when the raw map parsed successfully.
    pub parameters: Option<OperationParameters>,
}

impl ValidationOutcome {
    /// True when every target can proceed and the parameters are usable.
    pub fn can_proceed(&self) -> bool {
        self.parameters.is_some() && self.results.iter().all(|r| r.can_proceed)
    }

    pub fn blocked(&self) -> impl Iterator<Item = (usize, &TargetValidation)> {
        self.results.iter().enumerate().filter(|(_, r)| !r.can_proceed)
    }

    pub fn warning_count(&self) -> usize {
        self.results.iter().map(|r| r.warnings.len()).sum()
    }
}
