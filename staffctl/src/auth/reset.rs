//! Redemption of password reset tokens.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::{
    auth::password,
    config::Config,
    db::{
        errors::DbError,
        handlers::{Accounts, PasswordResetTokens},
    },
    errors::{Error, Result},
    types::AccountId,
    validation::FieldErrors,
};

/// Set a new password using a reset token.
///
/// The token is checked before the password and its confirmation, so an unusable token is always
/// reported as [`Error::TokenInvalid`]. Redemption itself is a conditional update inside the same transaction
/// as the password change: of several concurrent requests with one token, at most one succeeds,
/// and a consumed token stays consumed.
#[instrument(skip_all, err)]
pub async fn reset_password(
    db: &SqlitePool,
    config: &Config,
    token: &str,
    new_password: Option<&str>,
    password_confirm: Option<&str>,
) -> Result<AccountId> {
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::TokenInvalid);
    }

    {
        let mut conn = db.acquire().await.map_err(DbError::from)?;
        if PasswordResetTokens::new(&mut conn).find_redeemable(token, Utc::now()).await?.is_none() {
            return Err(Error::TokenInvalid);
        }
    }

    let bounds = &config.auth.password;
    let mut errors = FieldErrors::new();
    match new_password {
        Some(new_password) => {
            errors.password("password", new_password, bounds.min_length, bounds.max_length);
        }
        None => errors.add("password", "The password field is required."),
    }
    match password_confirm {
        Some(confirm) if Some(confirm) == new_password => {}
        Some(_) => errors.add("password_confirm", "The password_confirm and password must match."),
        None => errors.add("password_confirm", "The password_confirm field is required."),
    }
    errors.into_result()?;

    let password_hash = password::hash_password(bounds, new_password.unwrap_or_default()).await?;

    let mut tx = crate::db::begin_write(db).await?;
    let now = Utc::now();

    let account_id = PasswordResetTokens::new(&mut tx)
        .consume(token, now)
        .await?
        .ok_or(Error::TokenInvalid)?;

    // Dropping the transaction rolls the consumption back
    if !Accounts::new(&mut tx).set_password(account_id, &password_hash).await? {
        return Err(Error::TokenInvalid);
    }

    PasswordResetTokens::new(&mut tx).invalidate_for_account(account_id, now).await?;
    tx.commit().await.map_err(DbError::from)?;

    info!(account_id, "Password reset");
    Ok(account_id)
}
