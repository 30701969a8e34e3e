//! Common type definitions.
//!
//! - Type aliases for entity IDs ([`CompanyId`], [`AccountId`], [`ResetTokenId`])
//! - [`Role`], the fixed three-level role set every account carries
//! - [`LifecycleState`], the soft-delete lifecycle shared by companies and accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

// Type aliases for IDs
pub type CompanyId = i64;
pub type AccountId = i64;
pub type ResetTokenId = i64;

/// Role of an account. Fixed at creation time by the endpoint that creates the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Manager,
    Employee,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Superadmin, Role::Manager, Role::Employee];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a soft-deletable row. Rows are never physically removed; a tombstone timestamp
/// moves them to `Deleted`, and every read goes through an active-only filter by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Active,
    Deleted,
}

impl LifecycleState {
    pub fn from_deleted_at(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            Some(_) => LifecycleState::Deleted,
            None => LifecycleState::Active,
        }
    }
}
