//! Identity of the caller.
//!
//! staffctl does not issue credentials. A trusted upstream proxy authenticates the caller and
//! forwards the account e-mail in a header (`auth.proxy_header.header_name`, default
//! `x-staffctl-user`). The header is resolved to an active account on every request and turned
//! into a [`Principal`].

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::{
    AppState,
    db::{errors::DbError, handlers::Accounts, models::accounts::AccountDBResponse},
    errors::{Error, Result},
    types::{AccountId, CompanyId, Role},
};

/// The authenticated caller, derived per request and never stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Principal {
    pub id: AccountId,
    pub role: Role,
    pub company_id: Option<CompanyId>,
}

impl From<&AccountDBResponse> for Principal {
    fn from(account: &AccountDBResponse) -> Self {
        Self {
            id: account.id,
            role: account.role,
            company_id: account.company_id,
        }
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let header_name = &state.config.auth.proxy_header.header_name;

        let email = parts
            .headers
            .get(header_name.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or(Error::Unauthenticated { message: None })?;

        let mut conn = state.db.acquire().await.map_err(DbError::from)?;
        let account = Accounts::new(&mut conn).get_by_email(email).await?;

        match account {
            Some(account) => {
                debug!(account_id = account.id, role = %account.role, "Resolved principal");
                Ok(Principal::from(&account))
            }
            None => {
                debug!("Identity header names no active account");
                Err(Error::Unauthenticated { message: None })
            }
        }
    }
}
