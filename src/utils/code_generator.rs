//! Short code generation and validation.

use crate::error::AppError;
use base64::Engine as _;
use serde_json::json;

/// Random bytes per generated code; 12 bytes encode to 16 URL-safe characters.
const CODE_LENGTH_BYTES: usize = 12;

const MIN_CUSTOM_LEN: usize = 6;
const MAX_CUSTOM_LEN: usize = 32;

/// Codes that collide with operator routes of the shortening front-end.
const RESERVED_CODES: &[&str] = &["details", "metrics", "health", "shorten"];

/// Generates a random short code.
///
/// Entropy comes from the OS via `getrandom`; the bytes are encoded as
/// URL-safe base64 without padding.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the system random number generator fails.
pub fn generate_code() -> Result<String, AppError> {
    let mut buffer = [0u8; CODE_LENGTH_BYTES];

    getrandom::fill(&mut buffer).map_err(|e| {
        AppError::internal(
            "Failed to generate random bytes",
            json!({ "reason": e.to_string() }),
        )
    })?;

    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buffer))
}

/// Validates a caller-provided short code.
///
/// # Rules
///
/// - Length: 6-32 characters
/// - Allowed characters: ASCII letters, digits, `-` and `_`
/// - Cannot be a reserved route name
///
/// # Errors
///
/// Returns [`AppError::Validation`] if any rule is violated.
pub fn validate_custom_code(code: &str) -> Result<(), AppError> {
    if !(MIN_CUSTOM_LEN..=MAX_CUSTOM_LEN).contains(&code.len()) {
        return Err(AppError::bad_request(
            format!(
                "Custom code must be {}-{} characters",
                MIN_CUSTOM_LEN, MAX_CUSTOM_LEN
            ),
            json!({ "provided_length": code.len() }),
        ));
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::bad_request(
            "Custom code can only contain letters, digits, '-' and '_'",
            json!({ "code": code }),
        ));
    }

    if RESERVED_CODES.contains(&code.to_ascii_lowercase().as_str()) {
        return Err(AppError::bad_request(
            "This code is reserved",
            json!({ "code": code }),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_code_length_and_alphabet() {
        let code = generate_code().unwrap();
        assert_eq!(code.len(), 16);
        assert!(
            code.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_code_produces_unique_codes() {
        let codes: HashSet<String> = (0..1000).map(|_| generate_code().unwrap()).collect();
        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn test_generated_codes_pass_validation() {
        for _ in 0..100 {
            let code = generate_code().unwrap();
            if RESERVED_CODES.contains(&code.as_str()) {
                continue;
            }
            assert!(validate_custom_code(&code).is_ok(), "rejected {code}");
        }
    }

    #[test]
    fn test_validate_accepts_boundaries() {
        assert!(validate_custom_code("abc123").is_ok());
        assert!(validate_custom_code(&"a".repeat(32)).is_ok());
        assert!(validate_custom_code("My_Link-2024").is_ok());
    }

    #[test]
    fn test_validate_rejects_length() {
        let err = validate_custom_code("abc").unwrap_err();
        assert!(err.to_string().contains("6-32 characters"));
        assert!(validate_custom_code(&"a".repeat(33)).is_err());
        assert!(validate_custom_code("").is_err());
    }

    #[test]
    fn test_validate_rejects_characters() {
        assert!(validate_custom_code("my code").is_err());
        assert!(validate_custom_code("promo@2024").is_err());
        assert!(validate_custom_code("path/segment").is_err());
    }

    #[test]
    fn test_validate_rejects_reserved_codes() {
        for &reserved in RESERVED_CODES {
            assert!(validate_custom_code(reserved).is_err(), "{reserved} accepted");
        }
        assert!(validate_custom_code("DETAILS").is_err());
    }
}
