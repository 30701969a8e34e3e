//! Role policy: which role may act where a given role is required.
//!
//! The hierarchy is deliberately shallow. A superadmin may do anything, a manager may also act
//! where an employee is required, and otherwise the roles must match exactly:
//!
//! | principal \ required | superadmin | manager | employee |
//! |----------------------|------------|---------|----------|
//! | superadmin           | allow      | allow   | allow    |
//! | manager              | deny       | allow   | allow    |
//! | employee             | deny       | deny    | allow    |
//!
//! Handlers declare the role they need through the [`RequiresRole`] extractor:
//!
//! ```ignore
//! async fn list_companies(principal: RequiresRole<Superadmin>, State(state): State<AppState>) -> Result<...> {
//!     let scope = scope(&principal);
//!     ...
//! }
//! ```

use std::{marker::PhantomData, ops::Deref};

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::instrument;

use crate::{
    AppState,
    auth::current_user::Principal,
    errors::{Error, Result},
    types::Role,
};

/// Outcome of a policy check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    /// `Deny` becomes [`Error::Forbidden`]. The reason is only logged.
    pub fn require(self, reason: impl FnOnce() -> String) -> Result<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(Error::forbidden(reason())),
        }
    }
}

/// Decide whether `principal` may perform an operation requiring `required`.
pub fn authorize(principal: &Principal, required: Role) -> Decision {
    match (principal.role, required) {
        (Role::Superadmin, _) => Decision::Allow,
        // One level only: a manager is not a superadmin
        (Role::Manager, Role::Employee) => Decision::Allow,
        (role, required) if role == required => Decision::Allow,
        _ => Decision::Deny,
    }
}

/// Type-level role requirement used by [`RequiresRole`]
pub trait RequiredRole: Send + Sync + 'static {
    const ROLE: Role;
}

pub struct Superadmin;
pub struct Manager;
pub struct Employee;

impl RequiredRole for Superadmin {
    const ROLE: Role = Role::Superadmin;
}

impl RequiredRole for Manager {
    const ROLE: Role = Role::Manager;
}

impl RequiredRole for Employee {
    const ROLE: Role = Role::Employee;
}

/// Extractor yielding the authenticated [`Principal`] once it has passed [`authorize`] for `R`.
///
/// Rejects with `401` when the caller cannot be identified and `403` when the role is too low.
pub struct RequiresRole<R: RequiredRole> {
    principal: Principal,
    _role: PhantomData<R>,
}

impl<R: RequiredRole> Deref for RequiresRole<R> {
    type Target = Principal;

    fn deref(&self) -> &Principal {
        &self.principal
    }
}

impl<R: RequiredRole> FromRequestParts<AppState> for RequiresRole<R> {
    type Rejection = Error;

    #[instrument(skip_all, fields(required = %R::ROLE))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let principal = Principal::from_request_parts(parts, state).await?;

        authorize(&principal, R::ROLE).require(|| format!("account {} ({}) lacks role {}", principal.id, principal.role, R::ROLE))?;

        Ok(Self {
            principal,
            _role: PhantomData,
        })
    }
}
