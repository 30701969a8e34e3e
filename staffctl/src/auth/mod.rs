//! Authentication and authorization.
//!
//! - [`current_user`]: resolves the trusted identity header into a [`current_user::Principal`]
//! - [`policy`]: the role hierarchy and the [`policy::RequiresRole`] extractor
//! - [`scope`]: tenant scoping of lists and mutations
//! - [`password`]: Argon2 hashing and reset token generation
//! - [`reset`]: redemption of password reset tokens
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use staffctl::auth::{policy::{Manager, RequiresRole}, scope::can_mutate};
//!
//! async fn delete_employee(principal: RequiresRole<Manager>, Path(id): Path<AccountId>, ...) -> Result<...> {
//!     let target = load_employee(id).await?;
//!     can_mutate(&principal, target.company_id).require(|| "cross-tenant delete".into())?;
//!     ...
//! }
//! ```

pub mod current_user;
pub mod password;
pub mod policy;
pub mod reset;
pub mod scope;
