//! Common validation utilities.

use validator::ValidationError;

/// Maximum length of a single target identifier.
pub const MAX_TARGET_ID_LENGTH: usize = 255;

/// Validates a target identifier: non-blank and at most 255 characters.
pub fn validate_target_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        let mut err = ValidationError::new("target_id_empty");
        err.message = Some("Target ID cannot be empty".into());
        return Err(err);
    }

    if id.chars().count() > MAX_TARGET_ID_LENGTH {
        let mut err = ValidationError::new("target_id_length");
        err.message = Some(
            format!(
                "Target ID cannot exceed {} characters",
                MAX_TARGET_ID_LENGTH
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that a string value is not blank.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value cannot be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates that a batch size lies within `1..=max`.
pub fn validate_batch_size(size: usize, max: usize) -> Result<(), ValidationError> {
    if (1..=max).contains(&size) {
        Ok(())
    } else {
        let mut err = ValidationError::new("batch_size_range");
        err.message = Some(format!("Batch size must be between 1 and {}", max).into());
        Err(err)
    }
}

/// Returns the human-readable message of a validation error.
pub fn error_message(err: &ValidationError) -> String {
    err.message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| err.code.to_string())
}
