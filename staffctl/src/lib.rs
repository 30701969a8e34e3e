//! # staffctl: multi-tenant staff management
//!
//! `staffctl` manages companies, their managers and their employees, plus a single global
//! superadmin. It is an HTTP service built on [Axum](https://github.com/tokio-rs/axum) with SQLite
//! persistence through sqlx.
//!
//! ## Request Flow
//!
//! An upstream proxy authenticates the caller and forwards the account e-mail in a trusted header.
//! Every request resolves that header into a [`auth::current_user::Principal`]. Route handlers
//! declare the role they need with [`auth::policy::RequiresRole`], lists are narrowed with
//! [`auth::scope::scope`], and edits or deletes of individual accounts pass
//! [`auth::scope::can_mutate`] before anything is written.
//!
//! Creating a company runs the provisioning cascade in [`provisioning`]: the company, its first
//! manager and the manager's password reset token are written in one transaction. After commit a
//! notification is queued; a background worker e-mails the reset link through [`email`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use staffctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = staffctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     staffctl::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod errors;
pub mod notifications;
mod openapi;
pub mod provisioning;
pub mod telemetry;
pub mod types;
pub mod validation;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use axum::{
    Router,
    http::{self, HeaderValue},
    routing::{delete, get, post},
};
use bon::Builder;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;

use crate::{
    api::handlers::{auth as auth_handlers, companies, employees, managers},
    auth::password,
    config::CorsOrigin,
    db::{
        handlers::{Accounts, Repository},
        models::accounts::AccountCreateDBRequest,
    },
    email::EmailService,
    notifications::{NotificationQueue, Notifier},
    openapi::ApiDoc,
    types::{AccountId, Role},
};

/// Shared state handed to every request handler.
///
/// Handlers are stateless apart from this: the pool, the configuration and the sending end of the
/// notification queue.
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .notifications(queue)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub notifications: NotificationQueue,
}

/// Get the staffctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the superadmin account if it doesn't exist.
///
/// Idempotent: an existing superadmin is kept, and only its password is replaced when
/// `superadmin.password` is configured. Without a configured password a new superadmin gets an
/// unguessable one and has to be given a real one through configuration later.
#[instrument(skip_all)]
pub async fn create_initial_superadmin(config: &Config, db: &SqlitePool) -> anyhow::Result<AccountId> {
    let settings = &config.superadmin;
    let password_hash = match settings.password.as_deref() {
        Some(pwd) => Some(password::hash_password(&config.auth.password, pwd).await?),
        None => None,
    };

    let mut tx = crate::db::begin_write(db).await?;
    let mut accounts = Accounts::new(&mut tx);

    if let Some(existing) = accounts.get_superadmin().await? {
        if existing.deleted_at.is_some() {
            warn!(account_id = existing.id, "The superadmin account has been deleted and is left as is");
        } else if let Some(password_hash) = password_hash {
            accounts.set_password(existing.id, &password_hash).await?;
            info!(account_id = existing.id, "Updated superadmin password from configuration");
        }
        tx.commit().await?;
        return Ok(existing.id);
    }

    let password_hash = match password_hash {
        Some(hash) => hash,
        None => {
            warn!("No superadmin.password configured, the superadmin cannot log in until one is set");
            password::hash_password(&config.auth.password, &password::generate_reset_token()).await?
        }
    };

    let created = accounts
        .create(&AccountCreateDBRequest {
            company_id: None,
            name: settings.name.clone(),
            email: settings.email.clone(),
            password_hash,
            role: Role::Superadmin,
            phone: settings.phone.clone(),
            address: None,
        })
        .await?;

    tx.commit().await?;
    info!(account_id = created.id, email = %created.email, "Created superadmin");
    Ok(created.id)
}

/// Connect, run migrations and seed the superadmin
async fn setup_database(config: &Config) -> anyhow::Result<SqlitePool> {
    let pool = db::connect(&config.database).await?;
    migrator().run(&pool).await?;

    create_initial_superadmin(config, &pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create initial superadmin: {}", e))?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    // A wildcard cannot be mixed into an origin list
    let allow_origin = if config.cors.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PUT, http::Method::DELETE])
        .allow_headers([
            http::header::CONTENT_TYPE,
            http::header::ACCEPT,
            http::HeaderName::from_bytes(config.auth.proxy_header.header_name.as_bytes())?,
        ])
        .allow_credentials(config.cors.allow_credentials);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: the `/api` routes, `/healthz`, the API docs at `/docs`, CORS and
/// request tracing.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        // Authentication
        .route("/login", post(auth_handlers::login))
        .route("/password/reset", post(auth_handlers::reset_password))
        .route("/me", get(auth_handlers::me))
        // Companies (superadmin)
        .route("/companies", get(companies::list_companies).post(companies::create_company))
        .route(
            "/companies/{id}",
            get(companies::get_company)
                .put(companies::update_company)
                .delete(companies::delete_company),
        )
        // Managers
        .route("/managers", get(managers::list_managers).post(managers::create_manager))
        .route("/managers/self", get(managers::get_self).put(managers::update_self))
        .route("/managers/{id}", delete(managers::delete_manager))
        .route("/managers/{id}/edit", get(managers::edit_manager).put(managers::update_manager))
        // Employees
        .route("/employees", get(employees::list_employees).post(employees::create_employee))
        .route("/employees/self", get(employees::get_self).put(employees::update_self))
        .route("/employees/{id}", delete(employees::delete_employee))
        .route("/employees/{id}/edit", get(employees::edit_employee).put(employees::update_employee))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(create_cors_layer(&state.config)?)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// Background tasks running alongside the HTTP server.
///
/// Currently just the notification worker. Dropping this without calling
/// [`shutdown`](BackgroundServices::shutdown) cancels the tasks through `drop_guard`.
pub struct BackgroundServices {
    background_tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown_token: tokio_util::sync::CancellationToken,
    // Pub so that we can disarm it if we want to
    pub drop_guard: Option<tokio_util::sync::DropGuard>,
}

impl BackgroundServices {
    /// Signal every task to stop and wait for them. The notification worker drains its queue first.
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();

        for handle in self.background_tasks {
            if let Err(e) = handle.await {
                warn!("Background task ended abnormally: {}", e);
            }
        }
    }
}

/// Start the notification worker and return the queue handlers enqueue on
fn setup_background_services(config: &Config, notifier: Arc<dyn Notifier>) -> (NotificationQueue, BackgroundServices) {
    let shutdown_token = tokio_util::sync::CancellationToken::new();
    let drop_guard = shutdown_token.clone().drop_guard();

    let (queue, receiver) = NotificationQueue::new(config.notifications.queue_capacity);
    let worker = tokio::spawn(notifications::run_notification_worker(receiver, notifier, shutdown_token.clone()));

    let services = BackgroundServices {
        background_tasks: vec![worker],
        shutdown_token,
        drop_guard: Some(drop_guard),
    };
    (queue, services)
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects the database, runs migrations, seeds the
///    superadmin and starts the notification worker
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future completes, then stops the worker and closes the pool
pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
    bg_services: BackgroundServices,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting staffctl with configuration: {:#?}", config);

        let pool = setup_database(&config).await?;
        let notifier: Arc<dyn Notifier> = Arc::new(EmailService::new(&config)?);

        Self::new_with_pool(config, pool, notifier)
    }

    /// Build the application around an already migrated pool and a given notifier
    pub fn new_with_pool(config: Config, pool: SqlitePool, notifier: Arc<dyn Notifier>) -> anyhow::Result<Self> {
        let (notifications, bg_services) = setup_background_services(&config, notifier);

        let app_state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .notifications(notifications)
            .build();

        let router = build_router(&app_state)?;

        Ok(Self {
            router,
            config,
            pool,
            bg_services,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, BackgroundServices) {
        let server = axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server");
        (server, self.bg_services)
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("staffctl listening on http://{}, docs at {}/docs", bind_addr, self.config.app_url);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Pending reset e-mails are delivered before the worker exits
        self.bg_services.shutdown().await;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
