//! Test utilities: an in-memory database, a cheap configuration and fixtures.

use std::sync::{Arc, Mutex};

use axum_test::TestServer;
use sqlx::{
    SqliteConnection, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::{
    AppState, BackgroundServices,
    auth::password::{self, Argon2Params},
    config::{Config, DatabaseConfig, EmailTransportConfig, ProxyHeaderAuthConfig},
    db::{
        handlers::{Accounts, Companies, Repository},
        models::{
            accounts::{AccountCreateDBRequest, AccountDBResponse},
            companies::{CompanyCreateDBRequest, CompanyDBResponse},
        },
    },
    errors::Error,
    notifications::{NotificationQueue, Notifier, PasswordResetRequested},
    types::{CompanyId, Role},
};

/// Password of every account made by [`create_test_account`]
pub const TEST_PASSWORD: &str = "password123";

/// Argon2 parameters cheap enough to hash in every test
const TEST_ARGON2: Argon2Params = Argon2Params {
    memory_kib: 128,
    iterations: 1,
    parallelism: 1,
};

/// A migrated in-memory database.
///
/// The pool holds exactly one connection that is never recycled, since every new connection would
/// see an empty database. Tests must not hold two connections at once.
pub async fn create_test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::new().in_memory(true).foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory database");

    crate::migrator().run(&pool).await.expect("Failed to run migrations");
    pool
}

/// A migrated database file under `dir` on the production pool settings, with several connections.
/// Use it where concurrent writers matter; the in-memory pool serialises everything.
pub async fn create_file_test_pool(dir: &std::path::Path) -> SqlitePool {
    let mut database = DatabaseConfig::default();
    database.url = format!("sqlite://{}", dir.join("staffctl.db").display());
    database.pool.max_connections = 8;

    let pool = crate::db::connect(&database).await.expect("Failed to open database file");
    crate::migrator().run(&pool).await.expect("Failed to run migrations");
    pool
}

pub fn create_test_config() -> Config {
    // Use temp directory for test emails
    let temp_dir = std::env::temp_dir().join(format!("staffctl-test-emails-{}", std::process::id()));

    let mut config = Config::default();
    config.database.url = "sqlite::memory:".to_string();
    config.auth.password.argon2_memory_kib = TEST_ARGON2.memory_kib;
    config.auth.password.argon2_iterations = TEST_ARGON2.iterations;
    config.auth.password.argon2_parallelism = TEST_ARGON2.parallelism;
    config.email.transport = EmailTransportConfig::File {
        path: temp_dir.to_string_lossy().to_string(),
    };
    config
}

/// State for driving extractors and handlers directly. Nothing consumes the notification queue.
pub async fn create_test_state() -> AppState {
    let (notifications, _receiver) = NotificationQueue::new(16);

    AppState::builder()
        .db(create_test_pool().await)
        .config(create_test_config())
        .notifications(notifications)
        .build()
}

/// A full application over `pool`, with notifications captured instead of e-mailed.
///
/// The superadmin is not seeded; create one with [`create_test_account`].
pub async fn create_test_app(pool: SqlitePool) -> (TestServer, BackgroundServices, RecordingNotifier) {
    let notifier = RecordingNotifier::default();

    let app = crate::Application::new_with_pool(create_test_config(), pool, Arc::new(notifier.clone()))
        .expect("Failed to create application");

    let (server, bg_services) = app.into_test_server();
    (server, bg_services, notifier)
}

/// A company named `name` with e-mail `{name}@company.test`
pub async fn create_test_company(conn: &mut SqliteConnection, name: &str) -> CompanyDBResponse {
    Companies::new(conn)
        .create(&CompanyCreateDBRequest {
            name: name.to_string(),
            email: format!("{}@company.test", name.to_lowercase()),
            phone: "5550100".to_string(),
        })
        .await
        .expect("Failed to create test company")
}

/// An account whose password is [`TEST_PASSWORD`]
pub async fn create_test_account(
    conn: &mut SqliteConnection,
    company_id: Option<CompanyId>,
    role: Role,
    email: &str,
) -> AccountDBResponse {
    let password_hash = password::hash_with_params(TEST_PASSWORD, TEST_ARGON2).expect("Failed to hash test password");

    Accounts::new(conn)
        .create(&AccountCreateDBRequest {
            company_id,
            name: format!("Test {}", role.as_str()),
            email: email.to_string(),
            password_hash,
            role,
            phone: "5550199".to_string(),
            address: None,
        })
        .await
        .expect("Failed to create test account")
}

/// The identity header the proxy would forward for `account`
pub fn add_auth_header(account: &AccountDBResponse) -> (String, String) {
    (ProxyHeaderAuthConfig::default().header_name, account.email.clone())
}

/// A [`Notifier`] that keeps every event it is handed. Clones share the same record.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<PasswordResetRequested>>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<PasswordResetRequested> {
        self.events.lock().expect("notifier lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn password_reset_requested(&self, event: &PasswordResetRequested) -> Result<(), Error> {
        self.events.lock().expect("notifier lock poisoned").push(event.clone());
        Ok(())
    }
}
