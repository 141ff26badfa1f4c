//! Input validators shared by the user and auth endpoints.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("valid regex"));

/// Default dialling code for new users.
pub const DEFAULT_COUNTRY_CODE: &str = "+91";

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

pub fn validate_email(email: &str) -> Result<(), CoreError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "Please enter a valid email address.".into(),
        ))
    }
}

/// Lowercase and trim an email for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_password(password: &str) -> Result<(), CoreError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }
    Ok(())
}

/// Reject blank required text fields.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        Err(CoreError::Validation(format!("{field} is required.")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(validate_email("ada.lovelace+fax@clinic.example.org").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "plain", "a@b", "a@b.c", "a b@c.com", "@clinic.com"] {
            assert_matches!(validate_email(bad), Err(CoreError::Validation(_)), "{bad}");
        }
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Ada@Clinic.COM "), "ada@clinic.com");
    }

    #[test]
    fn short_passwords_rejected() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("Admin@123").is_ok());
    }

    #[test]
    fn blank_fields_rejected() {
        assert!(require_non_blank("First name", "  ").is_err());
        assert!(require_non_blank("First name", "Ada").is_ok());
    }
}
