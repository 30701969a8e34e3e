use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    AppState,
    api::models::{
        accounts::AccountResponse,
        auth::{LoginRequest, PasswordResetQuery, PasswordResetRequest},
        envelope::{ApiMessage, ApiResponse},
    },
    auth::{current_user::Principal, password, reset},
    db::{
        errors::DbError,
        handlers::{Accounts, Repository},
    },
    errors::{Error, Result},
};

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    }
}

/// Check an e-mail and password pair.
///
/// No session or token is issued: identity on the other endpoints comes from the trusted proxy
/// header. This only tells the proxy (or a client) whether the credentials are right.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Credentials are valid", body = ApiResponse<AccountResponse>),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<ApiResponse<AccountResponse>>> {
    let account = {
        let mut conn = state.db.acquire().await.map_err(DbError::from)?;
        Accounts::new(&mut conn)
            .get_by_email(&request.email)
            .await?
            .ok_or_else(invalid_credentials)?
    };

    if !password::verify_password(&request.password, &account.password_hash).await? {
        return Err(invalid_credentials());
    }

    Ok(Json(ApiResponse::ok(AccountResponse::from(account))))
}

/// Set a new password with a reset token.
///
/// The token may be sent in the body or, as in the e-mailed link, in the query string.
#[utoipa::path(
    post,
    path = "/password/reset",
    request_body = PasswordResetRequest,
    params(PasswordResetQuery),
    tag = "authentication",
    responses(
        (status = 200, description = "Password changed", body = ApiMessage),
        (status = 400, description = "Invalid token, or the new password or its confirmation failed validation"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Query(query): Query<PasswordResetQuery>,
    Json(request): Json<PasswordResetRequest>,
) -> Result<Json<ApiMessage>> {
    let token = request.token.or(query.token).unwrap_or_default();

    reset::reset_password(
        &state.db,
        &state.config,
        &token,
        request.password.as_deref(),
        request.password_confirm.as_deref(),
    )
    .await?;

    Ok(Json(ApiMessage::ok("Password has been reset successfully")))
}

/// The caller's own account
#[utoipa::path(
    get,
    path = "/me",
    tag = "authentication",
    responses(
        (status = 200, description = "Current account", body = ApiResponse<AccountResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn me(State(state): State<AppState>, principal: Principal) -> Result<Json<ApiResponse<AccountResponse>>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let account = Accounts::new(&mut conn)
        .get_by_id(principal.id)
        .await?
        .ok_or(Error::Unauthenticated { message: None })?;

    Ok(Json(ApiResponse::ok(AccountResponse::from(account))))
}
