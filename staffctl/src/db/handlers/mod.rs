//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut SqliteConnection` (a pooled connection or an open
//! transaction) and returns models from [`crate::db::models`].
//!
//! - [`Companies`]: tenants, soft delete cascades to their accounts
//! - [`Accounts`]: superadmin, managers and employees
//! - [`PasswordResetTokens`]: the reset token ledger (issue, consume, revoke)
//!
//! [`Companies`] and [`Accounts`] implement the [`Repository`] trait.

pub mod accounts;
pub mod companies;
mod list;
pub mod password_reset_tokens;
pub mod repository;

pub use accounts::Accounts;
pub use companies::Companies;
pub use password_reset_tokens::PasswordResetTokens;
pub use repository::Repository;
