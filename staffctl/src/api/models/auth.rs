//! Login and password reset payloads.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Redeem a reset token. Every field is optional at the wire level so that a bad token is
/// always reported as such, whatever else the body contains.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PasswordResetRequest {
    #[serde(default)]
    pub token: Option<String>,
    /// A non-string value counts as missing
    #[serde(default, deserialize_with = "string_or_none")]
    #[schema(value_type = Option<String>)]
    pub password: Option<String>,
    /// Must repeat `password`
    #[serde(default, deserialize_with = "string_or_none")]
    #[schema(value_type = Option<String>)]
    pub password_confirm: Option<String>,
}

/// The token may also arrive in the query string, as in the e-mailed link
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PasswordResetQuery {
    pub token: Option<String>,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}
