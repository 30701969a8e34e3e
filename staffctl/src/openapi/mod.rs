//! OpenAPI documentation for the `/api` surface, served by Scalar at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;

/// Identity header security scheme.
struct IdentityHeaderAddon;

impl Modify for IdentityHeaderAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "X-Staffctl-User".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "x-staffctl-user",
                    "E-mail of the authenticated account, set by the trusted upstream proxy. \
                     The header name is configurable with `auth.proxy_header.header_name`.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "staffctl",
        description = "Multi-tenant management of companies, their managers and employees."
    ),
    servers(
        (url = "/api", description = "staffctl API")
    ),
    modifiers(&IdentityHeaderAddon),
    paths(
        api::handlers::auth::login,
        api::handlers::auth::reset_password,
        api::handlers::auth::me,
        api::handlers::companies::list_companies,
        api::handlers::companies::create_company,
        api::handlers::companies::get_company,
        api::handlers::companies::update_company,
        api::handlers::companies::delete_company,
        api::handlers::managers::list_managers,
        api::handlers::managers::create_manager,
        api::handlers::managers::edit_manager,
        api::handlers::managers::update_manager,
        api::handlers::managers::delete_manager,
        api::handlers::managers::get_self,
        api::handlers::managers::update_self,
        api::handlers::employees::list_employees,
        api::handlers::employees::create_employee,
        api::handlers::employees::edit_employee,
        api::handlers::employees::update_employee,
        api::handlers::employees::delete_employee,
        api::handlers::employees::get_self,
        api::handlers::employees::update_self,
    ),
    components(
        schemas(
            api::models::auth::LoginRequest,
            api::models::auth::PasswordResetRequest,
            api::models::companies::CompanyCreate,
            api::models::companies::CompanyUpdate,
            api::models::companies::CompanyResponse,
            api::models::companies::CompanyCreatedResponse,
            api::models::accounts::AccountCreate,
            api::models::accounts::AccountUpdate,
            api::models::accounts::SelfUpdate,
            api::models::accounts::AccountResponse,
            api::models::envelope::ApiMessage,
            crate::validation::FieldErrors,
            crate::types::Role,
        )
    ),
    tags(
        (name = "authentication", description = "Credential check and password reset"),
        (name = "companies", description = "Companies, superadmin only"),
        (name = "managers", description = "Manager accounts"),
        (name = "employees", description = "Employee accounts"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for path in [
            "/login",
            "/password/reset",
            "/me",
            "/companies",
            "/companies/{id}",
            "/managers",
            "/managers/{id}",
            "/managers/{id}/edit",
            "/managers/self",
            "/employees",
            "/employees/{id}",
            "/employees/{id}/edit",
            "/employees/self",
        ] {
            assert!(paths.contains(&path), "missing {path}");
        }
    }

    #[test]
    fn test_identity_header_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("X-Staffctl-User"));
    }
}
