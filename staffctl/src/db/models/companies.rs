//! Database models for companies.

use crate::api::models::companies::{CompanyCreate, CompanyUpdate};
use crate::api::models::pagination::Sort;
use crate::types::{CompanyId, LifecycleState};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a new company
#[derive(Debug, Clone)]
pub struct CompanyCreateDBRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl From<CompanyCreate> for CompanyCreateDBRequest {
    fn from(api: CompanyCreate) -> Self {
        Self {
            name: api.name.trim().to_string(),
            email: api.email.trim().to_string(),
            phone: api.phone.trim().to_string(),
        }
    }
}

/// Database request for updating a company. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct CompanyUpdateDBRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<CompanyUpdate> for CompanyUpdateDBRequest {
    fn from(api: CompanyUpdate) -> Self {
        Self {
            name: api.name.map(|v| v.trim().to_string()),
            email: api.email.map(|v| v.trim().to_string()),
            phone: api.phone.map(|v| v.trim().to_string()),
        }
    }
}

/// Database response for a company
#[derive(Debug, Clone, FromRow)]
pub struct CompanyDBResponse {
    pub id: CompanyId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl CompanyDBResponse {
    pub fn lifecycle(&self) -> LifecycleState {
        LifecycleState::from_deleted_at(self.deleted_at)
    }
}

/// Filter for listing companies. Only active companies are ever listed.
#[derive(Debug, Clone)]
pub struct CompanyFilter {
    pub name: Option<String>,
    pub sort: Sort,
    pub skip: i64,
    pub limit: i64,
}

impl CompanyFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            name: None,
            sort: Sort::default(),
            skip,
            limit,
        }
    }
}
