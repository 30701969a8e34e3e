//! Operations shared by the manager and employee endpoints.
//!
//! The two resources differ only in the role they create and accept as a target, so the route
//! handlers in [`super::managers`] and [`super::employees`] are thin wrappers around these.

use axum::{Json, http::StatusCode};
use sqlx::SqliteConnection;
use tracing::{info, instrument};

use crate::{
    AppState,
    api::models::{
        accounts::{AccountCreate, AccountResponse, AccountUpdate, SelfUpdate},
        envelope::{ApiMessage, ApiResponse},
        pagination::{ListQuery, PaginatedResponse},
    },
    auth::{
        current_user::Principal,
        password,
        scope::{can_mutate, effective_company_id, scope},
    },
    db::{
        self,
        errors::DbError,
        handlers::{Accounts, Companies, Repository},
        models::accounts::{AccountCreateDBRequest, AccountDBResponse, AccountFilter},
    },
    errors::{Error, Result},
    types::{AccountId, CompanyId, Role},
    validation::FieldErrors,
};

/// Display name of the resource for `role`, used in not-found and confirmation messages
fn resource_name(role: Role) -> &'static str {
    match role {
        Role::Superadmin => "Superadmin",
        Role::Manager => "Manager",
        Role::Employee => "Employee",
    }
}

/// The company must exist and be active before an account is placed in it
async fn require_active_company(conn: &mut SqliteConnection, company_id: CompanyId) -> Result<()> {
    if Companies::new(conn).get_by_id(company_id).await?.is_none() {
        return Err(Error::Validation {
            errors: FieldErrors::single("company_id", "The selected company_id is invalid."),
        });
    }
    Ok(())
}

/// Load an active account of `role` that `principal` may edit or delete.
///
/// An account of another role is reported as not found; an account in another company is
/// forbidden.
async fn load_target(conn: &mut SqliteConnection, principal: &Principal, role: Role, id: AccountId) -> Result<AccountDBResponse> {
    let target = Accounts::new(conn)
        .get_by_id(id)
        .await?
        .filter(|account| account.role == role)
        .ok_or_else(|| Error::not_found(resource_name(role), id))?;

    can_mutate(principal, target.company_id).require(|| {
        format!(
            "account {} (company {:?}) cannot modify {role} {id} of company {:?}",
            principal.id, principal.company_id, target.company_id
        )
    })?;

    Ok(target)
}

#[instrument(skip_all, fields(principal = principal.id, role = %role))]
pub(crate) async fn list(
    state: &AppState,
    principal: &Principal,
    role: Role,
    query: &ListQuery,
) -> Result<ApiResponse<PaginatedResponse<AccountResponse>>> {
    let skip = query.pagination.skip();
    let limit = query.pagination.limit();

    let mut filter = AccountFilter::new(scope(principal), skip, limit).with_role(role);
    filter.name = query.name_filter();
    filter.sort = query.sort();

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut repo = Accounts::new(&mut conn);
    let total_count = repo.count(&filter).await?;
    let accounts = repo.list(&filter).await?;

    let data = accounts.into_iter().map(AccountResponse::from).collect();
    Ok(ApiResponse::ok(PaginatedResponse::new(data, total_count, skip, limit)))
}

#[instrument(skip_all, fields(principal = principal.id, role = %role), err)]
pub(crate) async fn create(
    state: &AppState,
    principal: &Principal,
    role: Role,
    request: AccountCreate,
) -> Result<(StatusCode, Json<ApiResponse<AccountResponse>>)> {
    request.validate(&state.config.auth.password)?;

    let Some(company_id) = effective_company_id(principal, request.company_id) else {
        return Err(Error::Validation {
            errors: FieldErrors::single("company_id", "The company_id field is required."),
        });
    };

    let password_hash = password::hash_password(&state.config.auth.password, &request.password).await?;

    let mut tx = db::begin_write(&state.db).await?;
    require_active_company(&mut tx, company_id).await?;

    let account = Accounts::new(&mut tx)
        .create(&AccountCreateDBRequest {
            company_id: Some(company_id),
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            password_hash,
            role,
            phone: request.phone.trim().to_string(),
            address: request.address.map(|a| a.trim().to_string()),
        })
        .await?;
    tx.commit().await.map_err(DbError::from)?;

    info!(account_id = account.id, company_id, "Created account");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(AccountResponse::from(account)))))
}

#[instrument(skip_all, fields(principal = principal.id, role = %role, id = id), err)]
pub(crate) async fn get_for_edit(state: &AppState, principal: &Principal, role: Role, id: AccountId) -> Result<ApiResponse<AccountResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let target = load_target(&mut conn, principal, role, id).await?;

    Ok(ApiResponse::ok(AccountResponse::from(target)))
}

#[instrument(skip_all, fields(principal = principal.id, role = %role, id = id), err)]
pub(crate) async fn update(
    state: &AppState,
    principal: &Principal,
    role: Role,
    id: AccountId,
    request: AccountUpdate,
) -> Result<ApiResponse<AccountResponse>> {
    request.validate(&state.config.auth.password)?;

    let password_hash = match request.password.as_deref() {
        Some(new_password) => Some(password::hash_password(&state.config.auth.password, new_password).await?),
        None => None,
    };

    let mut tx = db::begin_write(&state.db).await?;
    load_target(&mut tx, principal, role, id).await?;

    let mut db_request = request.into_db_request(principal.role == Role::Superadmin);
    db_request.password_hash = password_hash;
    if let Some(company_id) = db_request.company_id {
        require_active_company(&mut tx, company_id).await?;
    }

    let account = Accounts::new(&mut tx).update(id, &db_request).await?;
    tx.commit().await.map_err(DbError::from)?;

    Ok(ApiResponse::ok(AccountResponse::from(account)))
}

#[instrument(skip_all, fields(principal = principal.id, role = %role, id = id), err)]
pub(crate) async fn delete(state: &AppState, principal: &Principal, role: Role, id: AccountId) -> Result<ApiMessage> {
    let mut tx = db::begin_write(&state.db).await?;
    load_target(&mut tx, principal, role, id).await?;

    if !Accounts::new(&mut tx).delete(id).await? {
        return Err(Error::not_found(resource_name(role), id));
    }
    tx.commit().await.map_err(DbError::from)?;

    info!(account_id = id, "Deleted account");
    Ok(ApiMessage::ok(format!("{} deleted successfully", resource_name(role))))
}

pub(crate) async fn get_self(state: &AppState, principal: &Principal) -> Result<ApiResponse<AccountResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let account = Accounts::new(&mut conn)
        .get_by_id(principal.id)
        .await?
        .ok_or_else(|| Error::not_found("Account", principal.id))?;

    Ok(ApiResponse::ok(AccountResponse::from(account)))
}

#[instrument(skip_all, fields(principal = principal.id), err)]
pub(crate) async fn update_self(state: &AppState, principal: &Principal, request: SelfUpdate) -> Result<ApiResponse<AccountResponse>> {
    request.validate(&state.config.auth.password)?;

    let password_hash = match request.password.as_deref() {
        Some(new_password) => Some(password::hash_password(&state.config.auth.password, new_password).await?),
        None => None,
    };

    let mut db_request = request.into_db_request();
    db_request.password_hash = password_hash;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let account = Accounts::new(&mut conn).update(principal.id, &db_request).await?;

    Ok(ApiResponse::ok(AccountResponse::from(account)))
}
