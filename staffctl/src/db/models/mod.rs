//! Database record models matching table schemas.
//!
//! These models are used by repositories to return query results and accept insertion/update
//! data. They are distinct from the API models in [`crate::api::models`] so storage and wire
//! representations can evolve independently (an account row carries its password hash, the API
//! response never does).
//!
//! - [`companies`]: tenants
//! - [`accounts`]: superadmin, manager and employee accounts
//! - [`password_reset_tokens`]: the reset token ledger

pub mod accounts;
pub mod companies;
pub mod password_reset_tokens;
