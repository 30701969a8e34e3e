//! HTTP request handlers, one module per resource.
//!
//! - [`auth`]: login check, password reset, the caller's own account
//! - [`companies`]: company CRUD; creation provisions the first manager
//! - [`managers`]: manager accounts
//! - [`employees`]: employee accounts
//!
//! Role requirements are declared in each handler's signature with
//! [`crate::auth::policy::RequiresRole`]. Tenant checks on individual accounts happen in the
//! shared [`accounts`] operations, after the role check and before any mutation.

mod accounts;
pub mod auth;
pub mod companies;
pub mod employees;
pub mod managers;
