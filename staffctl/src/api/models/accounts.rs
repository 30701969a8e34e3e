//! API request/response models for manager and employee accounts.
//!
//! None of the request bodies carry a role: the endpoint decides it.

use crate::config::PasswordConfig;
use crate::db::models::accounts::{AccountDBResponse, AccountUpdateDBRequest};
use crate::errors::Error;
use crate::types::{AccountId, CompanyId, Role};
use crate::validation::FieldErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Create a manager or employee account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountCreate {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub address: Option<String>,
    /// Honoured for a superadmin only; everyone else creates inside their own company
    pub company_id: Option<CompanyId>,
}

impl AccountCreate {
    pub fn validate(&self, password: &PasswordConfig) -> Result<(), Error> {
        let mut errors = FieldErrors::new();
        errors
            .required("name", &self.name)
            .email("email", &self.email)
            .password("password", &self.password, password.min_length, password.max_length)
            .required("phone", &self.phone)
            .optional("address", self.address.as_deref());
        errors.into_result()
    }
}

/// Edit another account
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Absent keeps the address, `null` clears it
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
    pub password: Option<String>,
    /// Honoured for a superadmin only
    pub company_id: Option<CompanyId>,
}

impl AccountUpdate {
    pub fn validate(&self, password: &PasswordConfig) -> Result<(), Error> {
        let mut errors = FieldErrors::new();
        errors
            .optional("name", self.name.as_deref())
            .optional("phone", self.phone.as_deref())
            .optional("address", self.address.as_ref().and_then(Option::as_deref));
        if let Some(email) = &self.email {
            errors.email("email", email);
        }
        if let Some(new_password) = &self.password {
            errors.password("password", new_password, password.min_length, password.max_length);
        }
        errors.into_result()
    }

    /// Storage request without the password, which is hashed separately. `company_id` is only
    /// carried over when `allow_company_change` is set.
    pub fn into_db_request(self, allow_company_change: bool) -> AccountUpdateDBRequest {
        AccountUpdateDBRequest {
            company_id: self.company_id.filter(|_| allow_company_change),
            name: self.name.map(|v| v.trim().to_string()),
            email: self.email.map(|v| v.trim().to_string()),
            phone: self.phone.map(|v| v.trim().to_string()),
            address: self.address.map(|v| v.map(|v| v.trim().to_string())),
            password_hash: None,
        }
    }
}

/// Update one's own account. E-mail and company are not self-service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SelfUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
    pub password: Option<String>,
}

impl SelfUpdate {
    pub fn validate(&self, password: &PasswordConfig) -> Result<(), Error> {
        let mut errors = FieldErrors::new();
        errors
            .optional("name", self.name.as_deref())
            .optional("phone", self.phone.as_deref())
            .optional("address", self.address.as_ref().and_then(Option::as_deref));
        if let Some(new_password) = &self.password {
            errors.password("password", new_password, password.min_length, password.max_length);
        }
        errors.into_result()
    }

    pub fn into_db_request(self) -> AccountUpdateDBRequest {
        AccountUpdateDBRequest {
            name: self.name.map(|v| v.trim().to_string()),
            phone: self.phone.map(|v| v.trim().to_string()),
            address: self.address.map(|v| v.map(|v| v.trim().to_string())),
            ..Default::default()
        }
    }
}

/// An account as returned by the API. The password hash never leaves the database layer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub id: AccountId,
    pub company_id: Option<CompanyId>,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AccountDBResponse> for AccountResponse {
    fn from(db: AccountDBResponse) -> Self {
        Self {
            id: db.id,
            company_id: db.company_id,
            name: db.name,
            email: db.email,
            role: db.role,
            phone: db.phone,
            address: db.address,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
