//! API request/response models for companies.

use crate::db::models::companies::CompanyDBResponse;
use crate::types::CompanyId;
use crate::validation::FieldErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::accounts::AccountResponse;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompanyCreate {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl CompanyCreate {
    pub fn validate(&self) -> Result<(), crate::errors::Error> {
        let mut errors = FieldErrors::new();
        errors
            .required("name", &self.name)
            .email("email", &self.email)
            .required("phone", &self.phone);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CompanyUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CompanyUpdate {
    pub fn validate(&self) -> Result<(), crate::errors::Error> {
        let mut errors = FieldErrors::new();
        errors.optional("name", self.name.as_deref()).optional("phone", self.phone.as_deref());
        if let Some(email) = &self.email {
            errors.email("email", email);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompanyResponse {
    pub id: CompanyId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CompanyDBResponse> for CompanyResponse {
    fn from(db: CompanyDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            email: db.email,
            phone: db.phone,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// A new company together with the manager provisioned for it. The manager's reset link is
/// e-mailed, never returned.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompanyCreatedResponse {
    #[serde(flatten)]
    pub company: CompanyResponse,
    pub manager: AccountResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_validation_collects_every_field() {
        let request = CompanyCreate {
            name: "".to_string(),
            email: "nope".to_string(),
            phone: " ".to_string(),
        };

        match request.validate().unwrap_err() {
            crate::errors::Error::Validation { errors } => {
                assert!(errors.get("name").is_some());
                assert!(errors.get("email").is_some());
                assert!(errors.get("phone").is_some());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_update_only_checks_present_fields() {
        let request = CompanyUpdate {
            phone: Some("0800".to_string()),
            ..Default::default()
        };
        assert!(request.validate().is_ok());

        let request = CompanyUpdate {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }
}
