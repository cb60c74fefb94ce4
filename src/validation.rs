//! Input checks shared by the handlers.

use crate::api::{AppError, AppResult};

/// Basic shape check: one `@`, non-empty local part, and a dot inside the
/// domain that is neither its first nor last character.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .find('.')
            .is_some_and(|dot| dot > 0 && !domain.ends_with('.'))
}

/// Trims the address and lowercases its domain. The local part is kept as
/// typed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_ascii_lowercase()),
        None => email.to_string(),
    }
}

pub fn validate_email(field: &str, email: &str) -> AppResult<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AppError::validation_field(field, "not a valid email address"))
    }
}

/// Returns the trimmed value, or a field error when it is blank.
pub fn require_non_blank<'a>(field: &str, value: &'a str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AppError::validation_field(field, "is required"))
    } else {
        Ok(trimmed)
    }
}

/// Treats `Some("   ")` the same as an absent value.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
