// src/models/validation.rs

//! Field validators shared by the request DTOs.

use std::borrow::Cow;

use url::Url;
use uuid::Uuid;
use validator::ValidationError;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Rejects empty and whitespace-only strings.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("required", "This field is required"));
    }
    Ok(())
}

/// Validates that a string is a well-formed identifier (UUID).
pub fn valid_identifier(value: &str) -> Result<(), ValidationError> {
    if Uuid::parse_str(value.trim()).is_err() {
        return Err(invalid("invalid_identifier", "Must be a valid identifier"));
    }
    Ok(())
}

/// Between 2 and 10 options, none of them blank.
pub fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.len() < MIN_OPTIONS {
        return Err(invalid("too_few_options", "At least 2 options are required"));
    }
    if options.len() > MAX_OPTIONS {
        return Err(invalid("too_many_options", "At most 10 options are allowed"));
    }
    if options.iter().any(|option| option.trim().is_empty()) {
        return Err(invalid("empty_option", "Options cannot be empty"));
    }
    Ok(())
}

/// Validates that a string is a correctly formatted URL.
pub fn validate_url_string(url: &str) -> Result<(), ValidationError> {
    if Url::parse(url).is_err() {
        return Err(invalid("invalid_url", "Must be a valid URL"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Option {i}")).collect()
    }

    #[test]
    fn option_count_bounds() {
        assert!(validate_options(&options(1)).is_err());
        assert!(validate_options(&options(2)).is_ok());
        assert!(validate_options(&options(10)).is_ok());
        assert!(validate_options(&options(11)).is_err());
        assert!(validate_options(&[]).is_err());
    }

    #[test]
    fn blank_option_rejected() {
        let opts = vec!["A".to_string(), "  ".to_string()];
        let err = validate_options(&opts).unwrap_err();
        assert_eq!(err.code, "empty_option");
    }

    #[test]
    fn identifier_must_be_uuid() {
        assert!(valid_identifier("quiz1").is_err());
        assert!(valid_identifier(&Uuid::new_v4().to_string()).is_ok());
    }

    #[test]
    fn blank_strings_rejected() {
        assert!(not_blank("").is_err());
        assert!(not_blank("   ").is_err());
        assert!(not_blank("Math").is_ok());
    }
}
