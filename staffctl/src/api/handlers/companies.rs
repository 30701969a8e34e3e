use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        companies::{CompanyCreate, CompanyCreatedResponse, CompanyResponse, CompanyUpdate},
        envelope::{ApiMessage, ApiResponse},
        pagination::{ListQuery, PaginatedResponse},
    },
    auth::policy::{RequiresRole, Superadmin},
    db::{
        errors::DbError,
        handlers::{Companies, Repository},
        models::companies::{CompanyCreateDBRequest, CompanyFilter, CompanyUpdateDBRequest},
    },
    errors::{Error, Result},
    provisioning,
    types::CompanyId,
};

#[utoipa::path(
    get,
    path = "/companies",
    tag = "companies",
    summary = "List companies",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of companies", body = ApiResponse<PaginatedResponse<CompanyResponse>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_companies(
    State(state): State<AppState>,
    _: RequiresRole<Superadmin>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<CompanyResponse>>>> {
    let skip = query.pagination.skip();
    let limit = query.pagination.limit();

    let mut filter = CompanyFilter::new(skip, limit);
    filter.name = query.name_filter();
    filter.sort = query.sort();

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let mut repo = Companies::new(&mut conn);
    let total_count = repo.count(&filter).await?;
    let companies = repo.list(&filter).await?;

    let data = companies.into_iter().map(CompanyResponse::from).collect();
    Ok(Json(ApiResponse::ok(PaginatedResponse::new(data, total_count, skip, limit))))
}

#[utoipa::path(
    post,
    path = "/companies",
    tag = "companies",
    summary = "Create company",
    description = "Creates the company together with its first manager, who copies the company's contact details \
and is e-mailed a password reset link. Either everything is created or nothing is.",
    request_body = CompanyCreate,
    responses(
        (status = 201, description = "Company and manager created", body = ApiResponse<CompanyCreatedResponse>),
        (status = 400, description = "Validation failed, e.g. the e-mail is already taken"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_company(
    State(state): State<AppState>,
    _: RequiresRole<Superadmin>,
    Json(request): Json<CompanyCreate>,
) -> Result<(StatusCode, Json<ApiResponse<CompanyCreatedResponse>>)> {
    request.validate()?;

    let provisioned =
        provisioning::create_company_with_manager(&state.db, &state.config, &state.notifications, &CompanyCreateDBRequest::from(request))
            .await?;

    let response = CompanyCreatedResponse {
        company: provisioned.company.into(),
        manager: provisioned.manager.into(),
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(response))))
}

#[utoipa::path(
    get,
    path = "/companies/{id}",
    tag = "companies",
    summary = "Get company",
    params(("id" = CompanyId, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company details", body = ApiResponse<CompanyResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Company not found"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_company(
    State(state): State<AppState>,
    _: RequiresRole<Superadmin>,
    Path(id): Path<CompanyId>,
) -> Result<Json<ApiResponse<CompanyResponse>>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let company = Companies::new(&mut conn)
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found("Company", id))?;

    Ok(Json(ApiResponse::ok(company.into())))
}

#[utoipa::path(
    put,
    path = "/companies/{id}",
    tag = "companies",
    summary = "Update company",
    request_body = CompanyUpdate,
    params(("id" = CompanyId, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company updated", body = ApiResponse<CompanyResponse>),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Company not found"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_company(
    State(state): State<AppState>,
    _: RequiresRole<Superadmin>,
    Path(id): Path<CompanyId>,
    Json(request): Json<CompanyUpdate>,
) -> Result<Json<ApiResponse<CompanyResponse>>> {
    request.validate()?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let company = Companies::new(&mut conn)
        .update(id, &CompanyUpdateDBRequest::from(request))
        .await
        .map_err(|e| match e {
            DbError::NotFound => Error::not_found("Company", id),
            other => other.into(),
        })?;

    Ok(Json(ApiResponse::ok(company.into())))
}

#[utoipa::path(
    delete,
    path = "/companies/{id}",
    tag = "companies",
    summary = "Delete company",
    description = "Soft-deletes the company and every account belonging to it.",
    params(("id" = CompanyId, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company deleted", body = ApiMessage),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Company not found"),
    ),
    security(("X-Staffctl-User" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_company(
    State(state): State<AppState>,
    _: RequiresRole<Superadmin>,
    Path(id): Path<CompanyId>,
) -> Result<Json<ApiMessage>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    if !Companies::new(&mut conn).delete(id).await? {
        return Err(Error::not_found("Company", id));
    }

    Ok(Json(ApiMessage::ok("Company deleted successfully")))
}
