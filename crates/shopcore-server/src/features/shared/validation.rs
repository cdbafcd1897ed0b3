//! Shared validation utilities
//!
//! Common field checks used by command validation across the auth and
//! products features.

use thiserror::Error;

/// Errors from field validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldValidationError {
    #[error("All fields are required")]
    Required,

    #[error("{field} must be at least {min} characters long")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} cannot be negative")]
    Negative { field: &'static str },

    #[error("Please enter a valid email address.")]
    InvalidEmail,
}

/// Require a non-empty (post-trim) value
pub fn validate_required(value: &str) -> Result<(), FieldValidationError> {
    if value.trim().is_empty() {
        return Err(FieldValidationError::Required);
    }
    Ok(())
}

/// Require a minimum character count (post-trim)
pub fn validate_min_length(
    value: &str,
    min: usize,
    field: &'static str,
) -> Result<(), FieldValidationError> {
    if value.trim().chars().count() < min {
        return Err(FieldValidationError::TooShort { field, min });
    }
    Ok(())
}

/// Require a non-negative numeric value
pub fn validate_non_negative(value: f64, field: &'static str) -> Result<(), FieldValidationError> {
    if value < 0.0 || value.is_nan() {
        return Err(FieldValidationError::Negative { field });
    }
    Ok(())
}

/// Lightweight email shape check: local part, `@`, domain with a dot
pub fn validate_email(value: &str) -> Result<(), FieldValidationError> {
    let value = value.trim();
    let Some((local, domain)) = value.split_once('@') else {
        return Err(FieldValidationError::InvalidEmail);
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(FieldValidationError::InvalidEmail);
    }
    Ok(())
}
