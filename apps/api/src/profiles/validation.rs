use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::profiles::models::CandidateProfile;

/// local@domain.tld with no whitespace and a single `@`.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Reasons an extracted profile is not acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFailure {
    MissingEmail,
    InvalidEmailFormat,
    MissingName,
}

impl ValidationFailure {
    pub fn is_email(&self) -> bool {
        matches!(
            self,
            ValidationFailure::MissingEmail | ValidationFailure::InvalidEmailFormat
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationFailure::MissingEmail => "missing_email",
            ValidationFailure::InvalidEmailFormat => "invalid_email_format",
            ValidationFailure::MissingName => "missing_name",
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Returns every acceptance check the profile fails. Empty means acceptable.
pub fn validate_profile(profile: &CandidateProfile) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();

    let email = profile.email.trim();
    if email.is_empty() {
        failures.push(ValidationFailure::MissingEmail);
    } else if !is_valid_email(email) {
        failures.push(ValidationFailure::InvalidEmailFormat);
    }

    if profile.name.trim().is_empty() {
        failures.push(ValidationFailure::MissingName);
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, email: &str) -> CandidateProfile {
        CandidateProfile {
            name: name.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("jane@x.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co.uk"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("jane@localhost"));
        assert!(!is_valid_email("jane doe@x.com"));
        assert!(!is_valid_email("a@b@c.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_accepts_complete_profile() {
        assert!(validate_profile(&profile("Jane Doe", "jane@x.com")).is_empty());
    }

    #[test]
    fn test_missing_email() {
        assert_eq!(
            validate_profile(&profile("Jane Doe", "  ")),
            vec![ValidationFailure::MissingEmail]
        );
    }

    #[test]
    fn test_collects_all_failures() {
        let failures = validate_profile(&profile("", "not-an-email"));
        assert_eq!(
            failures,
            vec![
                ValidationFailure::InvalidEmailFormat,
                ValidationFailure::MissingName
            ]
        );
        assert!(failures[0].is_email());
        assert!(!failures[1].is_email());
    }
}
