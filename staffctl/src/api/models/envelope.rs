//! The `{"success": ..., ...}` envelope wrapped around every response body.
//!
//! Failures are rendered by [`crate::errors::Error`]; this module covers the success side.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Successful response carrying a payload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T: ToSchema> {
    pub success: bool,
    pub data: T,
}

impl<T: ToSchema> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

/// Successful response carrying only a confirmation message
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
