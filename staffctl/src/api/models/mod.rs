//! API request and response data models.
//!
//! API models are distinct from database models: responses never carry password hashes or
//! tombstones, and request bodies never carry a role.
//!
//! - [`companies`]: companies and the provisioning response
//! - [`accounts`]: manager and employee accounts, edits and self-updates
//! - [`auth`]: login and password reset payloads
//! - [`envelope`]: the `{"success": ...}` wrapper
//! - [`pagination`]: list query parameters and paged responses

pub mod accounts;
pub mod auth;
pub mod companies;
pub mod envelope;
pub mod pagination;
