//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with SQLite.
//! It follows the Repository pattern to provide clean abstractions over database operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers, provisioning, password reset)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   SQLite    │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations for CRUD operations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Transactions
//!
//! Repositories borrow a `&mut SqliteConnection`, so the same repository works on a pooled
//! connection or inside a transaction. Anything that writes more than one row, or reads before it
//! writes, goes through a write transaction from [`begin_write`]:
//!
//! ```ignore
//! let mut tx = db::begin_write(&pool).await?;
//! let company = Companies::new(&mut tx).create(&request).await?;
//! let manager = Accounts::new(&mut tx).create(&manager_request).await?;
//! tx.commit().await?;
//! ```
//!
//! # Migrations
//!
//! Database migrations are managed by SQLx and located in the `migrations/` directory.
//! The [`crate::migrator`] function provides access to the migrator.

pub mod errors;
pub mod handlers;
pub mod models;

use std::{str::FromStr, time::Duration};

use sqlx::{
    Sqlite, SqlitePool, Transaction,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tracing::info;

use crate::{config::DatabaseConfig, db::errors::DbError};

/// Open the SQLite pool described by `config`. Foreign keys are always enforced.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(config.pool.busy_timeout);

    let settings = &config.pool;
    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout((settings.idle_timeout_secs > 0).then(|| Duration::from_secs(settings.idle_timeout_secs)))
        .max_lifetime((settings.max_lifetime_secs > 0).then(|| Duration::from_secs(settings.max_lifetime_secs)))
        .connect_with(options)
        .await?;

    info!(max_connections = settings.max_connections, "Connected to database");
    Ok(pool)
}

/// Start a transaction that holds the write lock from its first statement.
///
/// A deferred transaction that reads and then writes cannot wait for a concurrent writer: SQLite
/// fails the lock upgrade with `SQLITE_BUSY` straight away. `BEGIN IMMEDIATE` takes the lock up
/// front, where `busy_timeout` applies.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, DbError> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}
