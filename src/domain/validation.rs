//! Input rules shared by the write paths.

use super::error::DomainError;

pub const MAX_USERNAME_LEN: usize = 32;
pub const MAX_DISPLAY_NAME_LEN: usize = 64;
pub const MAX_BIO_LEN: usize = 280;
pub const MAX_POST_LEN: usize = 5_000;
pub const MAX_COMMENT_LEN: usize = 1_000;
pub const MAX_MESSAGE_LEN: usize = 2_000;

/// Usernames are 3 to 32 ASCII letters, digits, `_` or `-`.
pub fn username(raw: &str) -> Result<String, DomainError> {
    let value = raw.trim();
    if value.len() < 3 || value.len() > MAX_USERNAME_LEN {
        return Err(DomainError::validation(format!(
            "username must be between 3 and {MAX_USERNAME_LEN} characters"
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(DomainError::validation(
            "username may only contain letters, digits, `_` and `-`",
        ));
    }
    Ok(value.to_string())
}

pub fn email(raw: &str) -> Result<String, DomainError> {
    let value = raw.trim().to_ascii_lowercase();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if !valid || value.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("email address is malformed"));
    }
    Ok(value)
}

/// Trimmed, non-empty text no longer than `max` characters.
pub fn text(field: &'static str, raw: &str, max: usize) -> Result<String, DomainError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(value.to_string())
}

/// Like [`text`], but an empty value means "unset".
pub fn optional_text(
    field: &'static str,
    raw: Option<&str>,
    max: usize,
) -> Result<Option<String>, DomainError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => text(field, value, max).map(Some),
    }
}
