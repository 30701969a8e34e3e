use thiserror::Error;

/// Unified error type for database operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Unique constraint violation")]
    UniqueViolation {
        /// Violated column (SQLite reports `table.column`, we keep the column part)
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Foreign key constraint violation
    #[error("Foreign key constraint violation")]
    ForeignKeyViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Check constraint violation
    #[error("Check constraint violation")]
    CheckViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using proper sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                // SQLite does not name tables or constraints in its error metadata, only in the
                // message text ("UNIQUE constraint failed: accounts.email").
                let (table, constraint) = match (db_err.table(), db_err.constraint()) {
                    (Some(table), constraint) => (Some(table.to_string()), constraint.map(str::to_string)),
                    (None, Some(constraint)) => (None, Some(constraint.to_string())),
                    (None, None) => parse_constraint_target(&message),
                };

                if db_err.is_unique_violation() {
                    DbError::UniqueViolation {
                        constraint,
                        table,
                        message,
                    }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation {
                        constraint,
                        table,
                        message,
                    }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation {
                        constraint,
                        table,
                        message,
                    }
                } else {
                    // All other database errors are non-recoverable - convert to anyhow
                    DbError::Other(anyhow::Error::from(err))
                }
            }
            // All other sqlx errors are non-recoverable - convert to anyhow with context
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// Extract `(table, column)` from a SQLite constraint message.
///
/// `"UNIQUE constraint failed: accounts.email"` -> `(Some("accounts"), Some("email"))`.
/// Check constraints report their name instead: `"CHECK constraint failed: accounts_tenant_check"`
/// -> `(None, Some("accounts_tenant_check"))`.
fn parse_constraint_target(message: &str) -> (Option<String>, Option<String>) {
    let Some((_, target)) = message.split_once("failed: ") else {
        return (None, None);
    };
    // Composite unique keys list every column, the first one is enough to classify
    let target = target.split(',').next().unwrap_or(target).trim();
    match target.split_once('.') {
        Some((table, column)) => (Some(table.to_string()), Some(column.to_string())),
        None if !target.is_empty() => (None, Some(target.to_string())),
        None => (None, None),
    }
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;
