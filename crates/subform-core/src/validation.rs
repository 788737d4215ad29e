//! Draft validation
//!
//! Runs synchronously before any network call. Only the email is checked;
//! first and last name may be empty.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SubmitError;
use crate::form::ContactDraft;

/// `local@domain.tld`, syntactic only. No deliverability check.
static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.\S+$").expect("email pattern is valid"));

/// Validate an email address, returning it trimmed
pub fn validate_email(email: &str) -> Result<String, SubmitError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(SubmitError::MissingEmail);
    }

    if !EMAIL_SHAPE.is_match(email) {
        return Err(SubmitError::InvalidEmailFormat);
    }

    Ok(email.to_string())
}

/// Check whether a draft can be submitted
pub fn validate_draft(draft: &ContactDraft) -> Result<(), SubmitError> {
    validate_email(&draft.email).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_emails_are_missing() {
        assert_eq!(validate_email(""), Err(SubmitError::MissingEmail));
        assert_eq!(validate_email("   \t\n"), Err(SubmitError::MissingEmail));
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for email in [
            "not-an-email",
            "user@",
            "@example.com",
            "user@example",
            "us er@example.com",
            "user@@example.com",
            "user@exa mple.com",
            "user@example.",
        ] {
            assert_eq!(
                validate_email(email),
                Err(SubmitError::InvalidEmailFormat),
                "{email:?} should be rejected"
            );
        }
    }

    #[test]
    fn well_formed_emails_are_trimmed() {
        assert_eq!(
            validate_email("  jane.doe@example.com  ").as_deref(),
            Ok("jane.doe@example.com")
        );
        assert!(validate_email("a@b.co.uk").is_ok());
        assert!(validate_email("first+tag@sub.example.org").is_ok());
    }

    #[test]
    fn names_are_not_validated() {
        let draft = ContactDraft {
            first_name: String::new(),
            last_name: String::new(),
            email: "jane@example.com".to_string(),
        };
        assert!(validate_draft(&draft).is_ok());
    }
}
