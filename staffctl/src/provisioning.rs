//! Account provisioning: the company + manager cascade and reset token issuance.
//!
//! Creating a company always creates its first manager in the same transaction. The manager
//! copies the company's contact details, gets a placeholder password it is not expected to know
//! (prefix + company phone) and a reset token, which is mailed out once the transaction commits.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, instrument};

use crate::{
    auth::password,
    config::Config,
    db::{
        errors::DbError,
        handlers::{Accounts, Companies, PasswordResetTokens, Repository},
        models::{
            accounts::{AccountCreateDBRequest, AccountDBResponse},
            companies::{CompanyCreateDBRequest, CompanyDBResponse},
            password_reset_tokens::PasswordResetTokenCreateRequest,
        },
    },
    errors::{Error, Result},
    notifications::{NotificationQueue, PasswordResetRequested},
    types::Role,
};

/// A reset token as handed to its account holder. The raw token exists nowhere else.
#[derive(Debug, Clone)]
pub struct IssuedReset {
    pub token: String,
    pub reset_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ProvisionedCompany {
    pub company: CompanyDBResponse,
    pub manager: AccountDBResponse,
    pub reset: IssuedReset,
}

/// Issue a reset token for `account` on the caller's connection or transaction.
///
/// Used by the company cascade; any other creation path that needs the holder to choose their
/// own password issues through here too.
#[instrument(skip_all, fields(account_id = account.id), err)]
pub async fn issue_password_reset(conn: &mut SqliteConnection, config: &Config, account: &AccountDBResponse) -> Result<IssuedReset> {
    let token = password::generate_reset_token();
    let ttl = chrono::Duration::from_std(config.auth.password_reset.token_duration).map_err(|e| Error::Internal {
        operation: format!("convert reset token duration: {e}"),
    })?;

    let issued = PasswordResetTokens::new(conn)
        .issue(&PasswordResetTokenCreateRequest {
            account_id: account.id,
            raw_token: token.clone(),
            expires_at: Utc::now() + ttl,
        })
        .await?;

    Ok(IssuedReset {
        reset_url: config.password_reset_url(&token),
        token,
        expires_at: issued.expires_at,
    })
}

/// Create a company together with its manager account and the manager's reset token.
///
/// All-or-nothing: a failure at any step (for example the e-mail already belonging to another
/// account) leaves neither the company nor the manager behind. The reset notification is queued
/// only after commit and its fate never affects the result.
#[instrument(skip_all, fields(email = %request.email), err)]
pub async fn create_company_with_manager(
    db: &SqlitePool,
    config: &Config,
    notifications: &NotificationQueue,
    request: &CompanyCreateDBRequest,
) -> Result<ProvisionedCompany> {
    let placeholder = format!("{}{}", config.auth.password_reset.manager_password_prefix, request.phone);
    let password_hash = password::hash_password(&config.auth.password, &placeholder).await?;

    let mut tx = crate::db::begin_write(db).await?;

    let company = Companies::new(&mut tx).create(request).await?;

    let manager = Accounts::new(&mut tx)
        .create(&AccountCreateDBRequest {
            company_id: Some(company.id),
            name: company.name.clone(),
            email: company.email.clone(),
            password_hash,
            role: Role::Manager,
            phone: company.phone.clone(),
            address: None,
        })
        .await?;

    let reset = issue_password_reset(&mut tx, config, &manager).await?;

    tx.commit().await.map_err(DbError::from)?;
    info!(company_id = company.id, manager_id = manager.id, "Provisioned company");

    notifications.enqueue(PasswordResetRequested {
        name: manager.name.clone(),
        email: manager.email.clone(),
        reset_url: reset.reset_url.clone(),
        subject: config.auth.password_reset.subject.clone(),
    });

    Ok(ProvisionedCompany { company, manager, reset })
}
