use crate::db::errors::DbError;
use crate::validation::FieldErrors;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error as ThisError;

/// Fixed message for every role or tenant denial. The reason is logged, never returned.
pub const FORBIDDEN_MESSAGE: &str = "no access";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Role policy or tenant scope denied the operation
    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    /// Reset token unknown, expired or already consumed
    #[error("Invalid password reset token")]
    TokenInvalid,

    /// Request payload failed field validation
    #[error("Validation failed: {errors:?}")]
    Validation { errors: FieldErrors },

    /// Requested resource not found, or outside the caller's tenant
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Error::Forbidden { reason: reason.into() }
    }

    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        Error::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::TokenInvalid | Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Unauthenticated".to_string()),
            Error::Forbidden { .. } => FORBIDDEN_MESSAGE.to_string(),
            Error::TokenInvalid => "Invalid token".to_string(),
            Error::Validation { .. } => "The given data was invalid".to_string(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Data not found".to_string(),
                DbError::UniqueViolation { .. } => "Resource already exists".to_string(),
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }

    /// Field-level view of the error, for the `errors` key of the response envelope.
    ///
    /// Unique and foreign key violations are surfaced as validation failures on the offending
    /// field, the same way an up-front `unique:` or `exists:` check would report them.
    fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            Error::Validation { errors } => Some(errors.clone()),
            Error::Database(DbError::UniqueViolation { table, constraint, .. }) => {
                Some(match (table.as_deref(), constraint.as_deref()) {
                    (_, Some("email")) => FieldErrors::single("email", "The email has already been taken."),
                    (Some("accounts"), Some("role")) => FieldErrors::single("role", "A superadmin account already exists."),
                    (_, Some(column)) => FieldErrors::single(column, format!("The {column} has already been taken.")),
                    _ => FieldErrors::single("resource", "Resource already exists."),
                })
            }
            Error::Database(DbError::ForeignKeyViolation { .. }) => {
                Some(FieldErrors::single("company_id", "The selected company_id is invalid."))
            }
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::Forbidden { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::TokenInvalid | Error::Validation { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        // 400s carry `errors`, everything else carries `message`
        let body: Value = if let Some(errors) = self.field_errors() {
            json!({ "success": false, "errors": errors })
        } else if status == StatusCode::BAD_REQUEST {
            json!({ "success": false, "errors": self.user_message() })
        } else {
            json!({ "success": false, "message": self.user_message() })
        };

        (status, Json(body)).into_response()
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
