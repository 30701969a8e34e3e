//! HTTP handlers for manager accounts.
//!
//! Managers are created with a company by the provisioning cascade, or directly by a superadmin.
//! Only a superadmin edits or deletes them; a manager may list the managers of their own company
//! and maintain their own account.

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
    auth::policy::{Manager, RequiresRole, Superadmin},
    errors::Result,
    types::{AccountId, Role},
};

#[utoipa::path(
    get,
    path = "/managers",
    tag = "managers",
    summary = "List managers",
    description = "Managers visible to the caller: every manager for a superadmin, the own company's managers otherwise.",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of managers", body = ApiResponse<PaginatedResponse<AccountResponse>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_managers(
    State(state): State<AppState>,
    principal: RequiresRole<Manager>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<AccountResponse>>>> {
    Ok(Json(accounts::list(&state, &principal, Role::Manager, &query).await?))
}

#[utoipa::path(
    post,
    path = "/managers",
    tag = "managers",
    summary = "Create manager",
    description = "Creates a manager in `company_id`, which must be an active company.",
    request_body = AccountCreate,
    responses(
        (status = 201, description = "Manager created", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_manager(
    State(state): State<AppState>,
    principal: RequiresRole<Superadmin>,
    Json(request): Json<AccountCreate>,
) -> Result<(StatusCode, Json<ApiResponse<AccountResponse>>)> {
    accounts::create(&state, &principal, Role::Manager, request).await
}

#[utoipa::path(
    get,
    path = "/managers/{id}/edit",
    tag = "managers",
    summary = "Get manager for editing",
    params(("id" = AccountId, Path, description = "Manager account ID")),
    responses(
        (status = 200, description = "Manager details", body = ApiResponse<AccountResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager belongs to another company"),
        (status = 404, description = "Manager not found"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn edit_manager(
    State(state): State<AppState>,
    principal: RequiresRole<Superadmin>,
    Path(id): Path<AccountId>,
) -> Result<Json<ApiResponse<AccountResponse>>> {
    Ok(Json(accounts::get_for_edit(&state, &principal, Role::Manager, id).await?))
}

#[utoipa::path(
    put,
    path = "/managers/{id}/edit",
    tag = "managers",
    summary = "Update manager",
    description = "Updates name, email, phone, address and optionally the password. `company_id` is only honoured for a superadmin.",
    request_body = AccountUpdate,
    params(("id" = AccountId, Path, description = "Manager account ID")),
    responses(
        (status = 200, description = "Manager updated", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager belongs to another company"),
        (status = 404, description = "Manager not found"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_manager(
    State(state): State<AppState>,
    principal: RequiresRole<Superadmin>,
    Path(id): Path<AccountId>,
    Json(request): Json<AccountUpdate>,
) -> Result<Json<ApiResponse<AccountResponse>>> {
    Ok(Json(accounts::update(&state, &principal, Role::Manager, id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/managers/{id}",
    tag = "managers",
    summary = "Delete manager",
    params(("id" = AccountId, Path, description = "Manager account ID")),
    responses(
        (status = 200, description = "Manager deleted", body = ApiMessage),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager belongs to another company"),
        (status = 404, description = "Manager not found"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_manager(
    State(state): State<AppState>,
    principal: RequiresRole<Superadmin>,
    Path(id): Path<AccountId>,
) -> Result<Json<ApiMessage>> {
    Ok(Json(accounts::delete(&state, &principal, Role::Manager, id).await?))
}

#[utoipa::path(
    get,
    path = "/managers/self",
    tag = "managers",
    operation_id = "get_manager_self",
    summary = "Get own manager account",
    responses(
        (status = 200, description = "The caller's account", body = ApiResponse<AccountResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_self(State(state): State<AppState>, principal: RequiresRole<Manager>) -> Result<Json<ApiResponse<AccountResponse>>> {
    Ok(Json(accounts::get_self(&state, &principal).await?))
}

#[utoipa::path(
    put,
    path = "/managers/self",
    tag = "managers",
    operation_id = "update_manager_self",
    summary = "Update own manager account",
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
    principal: RequiresRole<Manager>,
    Json(request): Json<SelfUpdate>,
) -> Result<Json<ApiResponse<AccountResponse>>> {
    Ok(Json(accounts::update_self(&state, &principal, request).await?))
}

#[cfg(test)]
mod tests {
    use crate::{test_utils::*, types::Role};
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    #[test_log::test(tokio::test)]
    async fn test_superadmin_creates_manager_in_chosen_company() {
        let pool = create_test_pool().await;
        let (superadmin, acme_id) = {
            let mut conn = pool.acquire().await.unwrap();
            let acme = create_test_company(&mut conn, "Acme").await;
            let superadmin = create_test_account(&mut conn, None, Role::Superadmin, "root@x.com").await;
            (superadmin, acme.id)
        };
        let (server, _bg, notifier) = create_test_app(pool).await;

        let (header, value) = add_auth_header(&superadmin);
        let response = server
            .post("/api/managers")
            .add_header(header, value)
            .json(&json!({
                "name": "Second Boss",
                "email": "boss2@acme.com",
                "password": "password123",
                "phone": "5550111",
                "company_id": acme_id,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: Value = response.json();
        assert_eq!(body["data"]["company_id"], json!(acme_id));
        assert_eq!(body["data"]["role"], json!("manager"));
        // Only company creation issues a reset link
        assert!(notifier.events().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_superadmin_must_name_a_live_company() {
        let pool = create_test_pool().await;
        let superadmin = {
            let mut conn = pool.acquire().await.unwrap();
            create_test_account(&mut conn, None, Role::Superadmin, "root@x.com").await
        };
        let (server, _bg, _notifier) = create_test_app(pool).await;

        let payload = json!({ "name": "Boss", "email": "boss@acme.com", "password": "password123", "phone": "5550111" });

        let (header, value) = add_auth_header(&superadmin);
        let response = server.post("/api/managers").add_header(header.clone(), value.clone()).json(&payload).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["errors"]["company_id"], json!(["The company_id field is required."]));

        let mut payload = payload;
        payload["company_id"] = json!(999);
        let response = server.post("/api/managers").add_header(header, value).json(&payload).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["errors"]["company_id"], json!(["The selected company_id is invalid."]));
    }

    #[test_log::test(tokio::test)]
    async fn test_manager_cannot_create_or_delete_managers() {
        let pool = create_test_pool().await;
        let (manager, colleague) = {
            let mut conn = pool.acquire().await.unwrap();
            let acme = create_test_company(&mut conn, "Acme").await;
            let manager = create_test_account(&mut conn, Some(acme.id), Role::Manager, "boss@acme.com").await;
            let colleague = create_test_account(&mut conn, Some(acme.id), Role::Manager, "boss2@acme.com").await;
            (manager, colleague)
        };
        let (server, _bg, _notifier) = create_test_app(pool).await;

        let (header, value) = add_auth_header(&manager);
        server
            .post("/api/managers")
            .add_header(header.clone(), value.clone())
            .json(&json!({ "name": "Boss", "email": "boss3@acme.com", "password": "password123", "phone": "5550111" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .delete(&format!("/api/managers/{}", colleague.id))
            .add_header(header, value)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[test_log::test(tokio::test)]
    async fn test_superadmin_moves_manager_between_companies() {
        let pool = create_test_pool().await;
        let (superadmin, manager, globex_id) = {
            let mut conn = pool.acquire().await.unwrap();
            let acme = create_test_company(&mut conn, "Acme").await;
            let globex = create_test_company(&mut conn, "Globex").await;
            let superadmin = create_test_account(&mut conn, None, Role::Superadmin, "root@x.com").await;
            let manager = create_test_account(&mut conn, Some(acme.id), Role::Manager, "boss@acme.com").await;
            (superadmin, manager, globex.id)
        };
        let (server, _bg, _notifier) = create_test_app(pool).await;

        let (header, value) = add_auth_header(&superadmin);
        let response = server
            .put(&format!("/api/managers/{}/edit", manager.id))
            .add_header(header, value)
            .json(&json!({ "company_id": globex_id, "phone": "5550999" }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["data"]["company_id"], json!(globex_id));
        assert_eq!(body["data"]["phone"], json!("5550999"));
    }

    #[test_log::test(tokio::test)]
    async fn test_employee_cannot_list_managers() {
        let pool = create_test_pool().await;
        let employee = {
            let mut conn = pool.acquire().await.unwrap();
            let acme = create_test_company(&mut conn, "Acme").await;
            create_test_account(&mut conn, Some(acme.id), Role::Employee, "e@acme.com").await
        };
        let (server, _bg, _notifier) = create_test_app(pool).await;

        let (header, value) = add_auth_header(&employee);
        server
            .get("/api/managers")
            .add_header(header, value)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[test_log::test(tokio::test)]
    async fn test_manager_reads_own_account() {
        let pool = create_test_pool().await;
        let manager = {
            let mut conn = pool.acquire().await.unwrap();
            let acme = create_test_company(&mut conn, "Acme").await;
            create_test_account(&mut conn, Some(acme.id), Role::Manager, "boss@acme.com").await
        };
        let (server, _bg, _notifier) = create_test_app(pool).await;

        let (header, value) = add_auth_header(&manager);
        let response = server.get("/api/managers/self").add_header(header, value).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["data"]["id"], json!(manager.id));
    }
}
