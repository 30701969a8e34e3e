//! Database models for password reset tokens.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{AccountId, ResetTokenId};

/// One issuance in the reset token ledger
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetToken {
    pub id: ResetTokenId,
    pub account_id: AccountId,
    /// SHA-256 digest of the bearer token, hex encoded
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl PasswordResetToken {
    /// A token can be redeemed once, before it expires
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && now < self.expires_at
    }
}

/// Request for issuing a password reset token
#[derive(Debug, Clone)]
pub struct PasswordResetTokenCreateRequest {
    pub account_id: AccountId,
    pub raw_token: String,
    pub expires_at: DateTime<Utc>,
}
