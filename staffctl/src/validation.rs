//! Field-level request validation.
//!
//! Handlers collect every problem with a payload into [`FieldErrors`] and fail once, so a client
//! sees all invalid fields in a single `400` response:
//!
//! ```json
//! { "success": false, "errors": { "email": ["The email must be a valid email address."] } }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::errors::Error;

/// Maximum length for free-text fields (names, phones, addresses).
pub const MAX_TEXT_LENGTH: usize = 255;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field error, for failures detected outside request parsing (e.g. constraint
    /// violations reported by the database).
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.add(field, format!("The {field} field is required."));
        } else if value.chars().count() > MAX_TEXT_LENGTH {
            self.add(field, format!("The {field} may not be greater than {MAX_TEXT_LENGTH} characters."));
        }
        self
    }

    /// Optional text: only checked when present.
    pub fn optional(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.required(field, value);
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.add(field, format!("The {field} field is required."));
        } else if value.parse::<lettre::Address>().is_err() {
            self.add(field, format!("The {field} must be a valid email address."));
        }
        self
    }

    /// Password length bounds come from `auth.password` in the config.
    pub fn password(&mut self, field: &str, value: &str, min_length: usize, max_length: usize) -> &mut Self {
        let length = value.chars().count();
        if length < min_length {
            self.add(field, format!("The {field} must be at least {min_length} characters."));
        } else if length > max_length {
            self.add(field, format!("The {field} may not be greater than {max_length} characters."));
        }
        self
    }

    pub fn into_result(self) -> Result<(), Error> {
        if self.is_empty() { Ok(()) } else { Err(Error::Validation { errors: self }) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_all_field_errors() {
        let mut errors = FieldErrors::new();
        errors
            .required("name", "  ")
            .email("email", "not-an-email")
            .required("phone", "0812")
            .password("password", "short", 8, 64);

        assert_eq!(errors.get("name").unwrap().len(), 1);
        assert_eq!(errors.get("email").unwrap(), ["The email must be a valid email address."]);
        assert!(errors.get("phone").is_none());
        assert!(errors.get("password").unwrap()[0].contains("at least 8"));

        let err = errors.into_result().unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_valid_payload_passes() {
        let mut errors = FieldErrors::new();
        errors
            .required("name", "Acme")
            .email("email", "acme@x.com")
            .optional("address", None)
            .password("password", "newpass123", 8, 64);

        assert!(errors.into_result().is_ok());
    }

    #[test]
    fn test_overlong_text_rejected() {
        let mut errors = FieldErrors::new();
        errors.required("address", &"a".repeat(MAX_TEXT_LENGTH + 1));

        assert!(!errors.is_empty());
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let errors = FieldErrors::single("email", "The email has already been taken.");
        let json = serde_json::to_value(&errors).unwrap();

        assert_eq!(json, serde_json::json!({ "email": ["The email has already been taken."] }));
    }
}
