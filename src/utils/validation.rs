use thiserror::Error;

/// Minimum password length accepted by signup and provider registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A local validation failure.
///
/// These are raised before any network call is made and carry the message
/// shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Please enter a valid {0}")]
    InvalidPhone(&'static str),
    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Please select a service category")]
    MissingCategory,
    #[error("Please set your service location (city and state)")]
    MissingLocation,
    #[error("Please upload at least one document")]
    NoDocuments,
    #[error("Please upload at least one brand image")]
    NoBrandImages,
    #[error("Please wait for {0} upload(s) to finish")]
    UploadsPending(usize),
    #[error("Please select a subscription plan")]
    NoPlanSelected,
    #[error("Unknown subscription plan: {0}")]
    UnknownPlan(String),
    #[error("{0} is missing. Please go back and complete your details before paying")]
    PaymentDetailsMissing(&'static str),
    #[error("You can add at most {0} portfolio images")]
    PortfolioFull(usize),
    #[error("\"{0}\" is already in your subcategories")]
    DuplicateSubcategory(String),
    #[error("Your account has already been created, so these details can no longer be changed")]
    AccountDetailsLocked,
}

/// Require a non-blank value.
pub fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(())
    }
}

/// Loose email shape check: one `@`, non-empty local part, dotted domain.
pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    require(value, "Email")?;
    if is_valid_email(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

/// Phone numbers: optional leading `+`, separators allowed, 7 to 15 digits.
pub fn is_valid_phone(value: &str) -> bool {
    let value = value.trim();
    let body = value.strip_prefix('+').unwrap_or(value);
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
    {
        return false;
    }
    let digits = body.chars().filter(char::is_ascii_digit).count();
    (7..=15).contains(&digits)
}

pub fn validate_phone(value: &str, field: &'static str) -> Result<(), ValidationError> {
    require(value, field)?;
    if is_valid_phone(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone(field))
    }
}

pub fn validate_password(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    require(password, "Password")?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Normalize a free-text label for duplicate detection: trimmed, inner
/// whitespace collapsed, lowercased.
pub fn normalize_label(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require() {
        assert_eq!(require("  ", "Full name"), Err(ValidationError::Required("Full name")));
        assert!(require("Ada", "Full name").is_ok());
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email(" ada.o@mail.example.ng "));
        assert!(!is_valid_email("ada@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada@@example.com"));
        assert!(!is_valid_email("ada lovelace@example.com"));
    }

    #[test]
    fn test_phone_shapes() {
        assert!(is_valid_phone("+2348012345678"));
        assert!(is_valid_phone("0801 234 5678"));
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("0801-CALL-NOW"));
    }

    #[test]
    fn test_password_rules() {
        assert_eq!(
            validate_password("abc123", "abc124"),
            Err(ValidationError::PasswordMismatch)
        );
        assert_eq!(
            validate_password("abc", "abc"),
            Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LENGTH))
        );
        assert!(validate_password("abc123", "abc123").is_ok());
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Deep   Cleaning "), "deep cleaning");
        assert_eq!(normalize_label("deep cleaning"), normalize_label("Deep Cleaning"));
    }

    #[test]
    fn test_messages_are_user_facing() {
        assert_eq!(
            ValidationError::PasswordMismatch.to_string(),
            "Passwords do not match"
        );
        assert_eq!(
            ValidationError::PortfolioFull(8).to_string(),
            "You can add at most 8 portfolio images"
        );
    }
}
