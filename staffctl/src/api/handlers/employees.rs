//! HTTP handlers for employee accounts.
//!
//! Managers run their own company's employees; a superadmin may act on any company. Employees can
//! list their colleagues and maintain their own account.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::accounts;
use crate::{
    AppState,
    api::models::{
        accounts::{AccountCreate, AccountResponse, AccountUpdate, SelfUpdate},
        envelope::{ApiMessage, ApiResponse},
        pagination::{ListQuery, PaginatedResponse},
    },
    auth::policy::{Employee, Manager, RequiresRole},
    errors::Result,
    types::{AccountId, Role},
};

#[utoipa::path(
    get,
    path = "/employees",
    tag = "employees",
    summary = "List employees",
    description = "Employees visible to the caller: every employee for a superadmin, the own company's employees otherwise.",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of employees", body = ApiResponse<PaginatedResponse<AccountResponse>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_employees(
    State(state): State<AppState>,
    principal: RequiresRole<Employee>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<AccountResponse>>>> {
    Ok(Json(accounts::list(&state, &principal, Role::Employee, &query).await?))
}

#[utoipa::path(
    post,
    path = "/employees",
    tag = "employees",
    summary = "Create employee",
    description = "Creates an employee. A manager always creates inside their own company; `company_id` is only honoured for a superadmin.",
    request_body = AccountCreate,
    responses(
        (status = 201, description = "Employee created", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_employee(
    State(state): State<AppState>,
    principal: RequiresRole<Manager>,
    Json(request): Json<AccountCreate>,
) -> Result<(StatusCode, Json<ApiResponse<AccountResponse>>)> {
    accounts::create(&state, &principal, Role::Employee, request).await
}

#[utoipa::path(
    get,
    path = "/employees/{id}/edit",
    tag = "employees",
    summary = "Get employee for editing",
    params(("id" = AccountId, Path, description = "Employee account ID")),
    responses(
        (status = 200, description = "Employee details", body = ApiResponse<AccountResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employee belongs to another company"),
        (status = 404, description = "Employee not found"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn edit_employee(
    State(state): State<AppState>,
    principal: RequiresRole<Manager>,
    Path(id): Path<AccountId>,
) -> Result<Json<ApiResponse<AccountResponse>>> {
    Ok(Json(accounts::get_for_edit(&state, &principal, Role::Employee, id).await?))
}

#[utoipa::path(
    put,
    path = "/employees/{id}/edit",
    tag = "employees",
    summary = "Update employee",
    description = "Updates name, email, phone, address and optionally the password. `company_id` is only honoured for a superadmin.",
    request_body = AccountUpdate,
    params(("id" = AccountId, Path, description = "Employee account ID")),
    responses(
        (status = 200, description = "Employee updated", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employee belongs to another company"),
        (status = 404, description = "Employee not found"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_employee(
    State(state): State<AppState>,
    principal: RequiresRole<Manager>,
    Path(id): Path<AccountId>,
    Json(request): Json<AccountUpdate>,
) -> Result<Json<ApiResponse<AccountResponse>>> {
    Ok(Json(accounts::update(&state, &principal, Role::Employee, id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/employees/{id}",
    tag = "employees",
    summary = "Delete employee",
    params(("id" = AccountId, Path, description = "Employee account ID")),
    responses(
        (status = 200, description = "Employee deleted", body = ApiMessage),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employee belongs to another company"),
        (status = 404, description = "Employee not found"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_employee(
    State(state): State<AppState>,
    principal: RequiresRole<Manager>,
    Path(id): Path<AccountId>,
) -> Result<Json<ApiMessage>> {
    Ok(Json(accounts::delete(&state, &principal, Role::Employee, id).await?))
}

#[utoipa::path(
    get,
    path = "/employees/self",
    tag = "employees",
    operation_id = "get_employee_self",
    summary = "Get own employee account",
    responses(
        (status = 200, description = "The caller's account", body = ApiResponse<AccountResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_self(State(state): State<AppState>, principal: RequiresRole<Employee>) -> Result<Json<ApiResponse<AccountResponse>>> {
    Ok(Json(accounts::get_self(&state, &principal).await?))
}

#[utoipa::path(
    put,
    path = "/employees/self",
    tag = "employees",
    operation_id = "update_employee_self",
    summary = "Update own employee account",
    description = "Updates name, phone, address and optionally the password. E-mail and company are not self-service.",
    request_body = SelfUpdate,
    responses(
        (status = 200, description = "Account updated", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_self(
    State(state): State<AppState>,
    principal: RequiresRole<Employee>,
    Json(request): Json<SelfUpdate>,
) -> Result<Json<ApiResponse<AccountResponse>>> {
    Ok(Json(accounts::update_self(&state, &principal, request).await?))
}
