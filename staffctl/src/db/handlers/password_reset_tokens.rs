//! Database repository for the password reset token ledger.
//!
//! Bearer tokens are never stored. Each issuance records the SHA-256 digest of the token, and
//! redemption looks the digest up through a unique index, so the secret is never compared
//! byte-by-byte in application code.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::SqliteConnection;
use tracing::instrument;

use crate::{
    db::{
        errors::Result,
        models::password_reset_tokens::{PasswordResetToken, PasswordResetTokenCreateRequest},
    },
    types::AccountId,
};

/// Hex-encoded SHA-256 digest of a raw reset token
pub fn hash_token(raw_token: &str) -> String {
    format!("{:x}", Sha256::digest(raw_token.as_bytes()))
}

pub struct PasswordResetTokens<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> PasswordResetTokens<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Record a new issuance. Outstanding tokens for the same account are revoked first, so only
    /// the most recently issued token can ever be redeemed.
    #[instrument(skip(self, request), fields(account_id = request.account_id), err)]
    pub async fn issue(&mut self, request: &PasswordResetTokenCreateRequest) -> Result<PasswordResetToken> {
        let now = Utc::now();
        self.invalidate_for_account(request.account_id, now).await?;

        let token = sqlx::query_as::<_, PasswordResetToken>(
            r#"
            INSERT INTO password_reset_tokens (account_id, token_hash, issued_at, expires_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(request.account_id)
        .bind(hash_token(&request.raw_token))
        .bind(now)
        .bind(request.expires_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(token)
    }

    /// The issuance a raw token refers to, if it can still be redeemed. Read only.
    #[instrument(skip(self, raw_token), err)]
    pub async fn find_redeemable(&mut self, raw_token: &str, now: DateTime<Utc>) -> Result<Option<PasswordResetToken>> {
        let token = sqlx::query_as::<_, PasswordResetToken>(
            "SELECT * FROM password_reset_tokens WHERE token_hash = ? AND consumed_at IS NULL AND expires_at > ?",
        )
        .bind(hash_token(raw_token))
        .bind(now)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(token)
    }

    /// Atomically redeem a token: marks it consumed and returns its account, or `None` when the
    /// token is unknown, expired or already consumed. A single conditional update, so two
    /// concurrent redemptions of the same token cannot both succeed.
    #[instrument(skip(self, raw_token), err)]
    pub async fn consume(&mut self, raw_token: &str, now: DateTime<Utc>) -> Result<Option<AccountId>> {
        let account_id = sqlx::query_scalar::<_, AccountId>(
            r#"
            UPDATE password_reset_tokens
            SET consumed_at = ?
            WHERE token_hash = ? AND consumed_at IS NULL AND expires_at > ?
            RETURNING account_id
            "#,
        )
        .bind(now)
        .bind(hash_token(raw_token))
        .bind(now)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(account_id)
    }

    /// Revoke every redeemable token of an account by expiring it. Consumed tokens keep their
    /// history untouched.
    #[instrument(skip(self), err)]
    pub async fn invalidate_for_account(&mut self, account_id: AccountId, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE password_reset_tokens SET expires_at = ? WHERE account_id = ? AND consumed_at IS NULL AND expires_at > ?",
        )
        .bind(now)
        .bind(account_id)
        .bind(now)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected())
    }
}
