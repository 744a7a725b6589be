//! Field validation shared by record capture and report upload.
//!
//! Checks run in a fixed order and stop at the first failure, so callers
//! always get exactly one field-specific message.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Shape accepted for email addresses: `local@domain.tld`, no whitespace.
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// A missing or malformed input field.
///
/// The display text is the message shown to the person filling the form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Name was empty.
    #[error("Name is required.")]
    MissingName,
    /// Email was empty or did not look like an address.
    #[error("Please enter a valid email.")]
    InvalidEmail,
    /// Designation was empty.
    #[error("Designation is required.")]
    MissingDesignation,
    /// Description was empty.
    #[error("Description is required.")]
    MissingDescription,
    /// Report project was empty.
    #[error("Project is required.")]
    MissingProject,
    /// Report had no file attached.
    #[error("Please choose a PDF file.")]
    MissingFile,
    /// Report file was not a PDF.
    #[error("{file_name} is not a PDF file.")]
    NotPdf {
        /// Name of the rejected file.
        file_name: String,
    },
}

impl ValidationError {
    /// The form field this error refers to.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingName => "name",
            Self::InvalidEmail => "email",
            Self::MissingDesignation => "designation",
            Self::MissingDescription => "description",
            Self::MissingProject => "project",
            Self::MissingFile | Self::NotPdf { .. } => "file",
        }
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("valid email regex"))
}

/// Check that `value` is non-empty after trimming.
///
/// # Errors
///
/// Returns `error` when the value is blank.
pub fn require(value: &str, error: ValidationError) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(error)
    } else {
        Ok(())
    }
}

/// Whether `email` is a plausible address.
///
/// The pattern is matched against the raw value, so surrounding whitespace
/// makes an address invalid.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    !email.trim().is_empty() && email_regex().is_match(email)
}

/// Check an email field.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidEmail`] when the address is rejected.
pub fn require_email(email: &str) -> Result<(), ValidationError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_blank() {
        assert_eq!(
            require("", ValidationError::MissingName),
            Err(ValidationError::MissingName)
        );
        assert_eq!(
            require("   \t", ValidationError::MissingDesignation),
            Err(ValidationError::MissingDesignation)
        );
        assert!(require(" x ", ValidationError::MissingName).is_ok());
    }

    #[test]
    fn test_valid_emails() {
        for email in ["a@b.com", "first.last@example.co.uk", "x+tag@d.io"] {
            assert!(is_valid_email(email), "{email} should be valid");
        }
    }

    #[test]
    fn test_invalid_emails() {
        for email in [
            "",
            "   ",
            "plain",
            "a@b",
            "@b.com",
            "a@.com",
            "a b@c.com",
            "a@@b.com",
            " a@b.com",
        ] {
            assert!(!is_valid_email(email), "{email:?} should be invalid");
        }
    }

    #[test]
    fn test_require_email() {
        assert!(require_email("a@b.com").is_ok());
        assert_eq!(require_email("nope"), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn test_messages() {
        assert_eq!(ValidationError::MissingName.to_string(), "Name is required.");
        assert_eq!(
            ValidationError::InvalidEmail.to_string(),
            "Please enter a valid email."
        );
        assert_eq!(
            ValidationError::NotPdf {
                file_name: "notes.txt".to_string()
            }
            .to_string(),
            "notes.txt is not a PDF file."
        );
    }

    #[test]
    fn test_fields() {
        assert_eq!(ValidationError::MissingName.field(), "name");
        assert_eq!(ValidationError::InvalidEmail.field(), "email");
        assert_eq!(ValidationError::MissingDescription.field(), "description");
        assert_eq!(ValidationError::MissingFile.field(), "file");
    }
}
