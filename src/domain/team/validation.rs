//! Team and email address validation

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Errors that can occur during roster validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TeamValidationError {
    #[error("Team ID cannot be empty")]
    EmptyId,

    #[error("Team ID cannot exceed {0} characters")]
    IdTooLong(usize),

    #[error("Team ID can only contain alphanumeric characters, hyphens and underscores")]
    InvalidIdCharacters,

    #[error("Email address cannot be empty")]
    EmptyEmail,

    #[error("Email address cannot exceed {0} characters")]
    EmailTooLong(usize),

    #[error("Invalid email address: '{0}'")]
    InvalidEmail(String),
}

const MAX_TEAM_ID_LENGTH: usize = 64;
const MAX_EMAIL_LENGTH: usize = 254;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap());

/// Validate a team ID
pub fn validate_team_id(id: &str) -> Result<(), TeamValidationError> {
    if id.is_empty() {
        return Err(TeamValidationError::EmptyId);
    }

    if id.len() > MAX_TEAM_ID_LENGTH {
        return Err(TeamValidationError::IdTooLong(MAX_TEAM_ID_LENGTH));
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(TeamValidationError::InvalidIdCharacters);
    }

    Ok(())
}

/// Validate an already-trimmed email address
///
/// Only the shape is checked: one `@` with a non-empty local part and domain,
/// and no whitespace. Deliverability is the directory's concern.
pub fn validate_email(email: &str) -> Result<(), TeamValidationError> {
    if email.is_empty() {
        return Err(TeamValidationError::EmptyEmail);
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(TeamValidationError::EmailTooLong(MAX_EMAIL_LENGTH));
    }

    if !EMAIL_PATTERN.is_match(email) {
        return Err(TeamValidationError::InvalidEmail(email.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_team_id() {
        assert!(validate_team_id("team-triumphant").is_ok());
        assert!(validate_team_id("team123").is_ok());
        assert!(validate_team_id("fall_2024-3").is_ok());
    }

    #[test]
    fn test_empty_team_id() {
        assert_eq!(validate_team_id(""), Err(TeamValidationError::EmptyId));
    }

    #[test]
    fn test_team_id_too_long() {
        let long_id = "a".repeat(65);
        assert_eq!(
            validate_team_id(&long_id),
            Err(TeamValidationError::IdTooLong(64))
        );
    }

    #[test]
    fn test_team_id_invalid_characters() {
        assert_eq!(
            validate_team_id("team one"),
            Err(TeamValidationError::InvalidIdCharacters)
        );
        assert_eq!(
            validate_team_id("team@one"),
            Err(TeamValidationError::InvalidIdCharacters)
        );
    }

    #[test]
    fn test_valid_email() {
        assert!(validate_email("sam@cmu.edu").is_ok());
        assert!(validate_email("first.last+tag@west.cmu.edu").is_ok());
    }

    #[test]
    fn test_invalid_email() {
        assert_eq!(validate_email(""), Err(TeamValidationError::EmptyEmail));
        assert!(matches!(
            validate_email("no-at-sign"),
            Err(TeamValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            validate_email("two@@cmu.edu"),
            Err(TeamValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            validate_email("@cmu.edu"),
            Err(TeamValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            validate_email("sam@"),
            Err(TeamValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            validate_email("sam smith@cmu.edu"),
            Err(TeamValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_email_too_long() {
        let email = format!("{}@cmu.edu", "a".repeat(250));
        assert_eq!(
            validate_email(&email),
            Err(TeamValidationError::EmailTooLong(254))
        );
    }
}
