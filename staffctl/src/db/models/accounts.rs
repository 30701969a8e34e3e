//! Database models for accounts.

use crate::api::models::pagination::Sort;
use crate::auth::scope::TenantScope;
use crate::types::{AccountId, CompanyId, LifecycleState, Role};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a new account
#[derive(Debug, Clone)]
pub struct AccountCreateDBRequest {
    pub company_id: Option<CompanyId>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: String,
    pub address: Option<String>,
}

/// Database request for updating an account. `None` leaves a column unchanged; for the nullable
/// `address`, `Some(None)` clears it.
///
/// There is no `role` field: an account's role is fixed when it is created.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdateDBRequest {
    pub company_id: Option<CompanyId>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Option<String>>,
    pub password_hash: Option<String>,
}

/// Database response for an account
#[derive(Debug, Clone, FromRow)]
pub struct AccountDBResponse {
    pub id: AccountId,
    pub company_id: Option<CompanyId>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AccountDBResponse {
    pub fn lifecycle(&self) -> LifecycleState {
        LifecycleState::from_deleted_at(self.deleted_at)
    }
}

/// Filter for listing accounts. Only active accounts are ever listed.
#[derive(Debug, Clone)]
pub struct AccountFilter {
    pub role: Option<Role>,
    pub scope: TenantScope,
    pub name: Option<String>,
    pub sort: Sort,
    pub skip: i64,
    pub limit: i64,
}

impl AccountFilter {
    pub fn new(scope: TenantScope, skip: i64, limit: i64) -> Self {
        Self {
            role: None,
            scope,
            name: None,
            sort: Sort::default(),
            skip,
            limit,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}
