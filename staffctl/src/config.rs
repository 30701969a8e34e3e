//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `STAFFCTL_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **Defaults** - every field has a default, so an empty file is a valid config
//! 2. **YAML config file** - Base configuration (default: `config.yaml`)
//! 3. **Environment variables** - Variables prefixed with `STAFFCTL_` override YAML values
//! 4. **DATABASE_URL** - Special case: overrides `database.url` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `STAFFCTL_AUTH__PASSWORD__MIN_LENGTH=12` sets the `auth.password.min_length` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use staffctl::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port`, `app_url` - binding and the public base URL used in reset links
//! - **Database**: `database.url`, `database.pool` - SQLite connection settings
//! - **Superadmin**: `superadmin.*` - the single global superadmin seeded on startup
//! - **Authentication**: `auth.proxy_header`, `auth.password`, `auth.password_reset`
//! - **Email**: `email.*` - SMTP or file transport for reset notifications
//! - **Notifications**: `notifications.queue_capacity` - outbound queue size
//! - **Security**: `cors.*`
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! STAFFCTL_PORT=8080
//! DATABASE_URL="sqlite://staffctl.db?mode=rwc"
//! STAFFCTL_SUPERADMIN__PASSWORD="change-me"
//! STAFFCTL_AUTH__PASSWORD_RESET__TOKEN_DURATION="24h"
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "STAFFCTL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Public base URL of this service. Reset links are built as
    /// `{app_url}/api/password/reset?token=...`.
    pub app_url: String,
    /// Set from the `DATABASE_URL` environment variable, overrides `database.url`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Database connection and pool configuration
    pub database: DatabaseConfig,
    /// The global superadmin account, created or refreshed on startup
    pub superadmin: SuperadminConfig,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Email configuration for password reset notifications
    pub email: EmailConfig,
    /// Outbound notification queue
    pub notifications: NotificationsConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
}

/// SQLite database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection string, e.g. `sqlite://staffctl.db?mode=rwc`
    pub url: String,
    /// Pool settings
    pub pool: PoolSettings,
}

/// Individual pool configuration with the SQLx parameters we expose.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
    /// Time before idle connections are closed (seconds, 0 = never)
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection (seconds, 0 = never)
    pub max_lifetime_secs: u64,
    /// How long a writer waits on a locked database before failing
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

/// The superadmin account. There is exactly one, it has no company.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuperadminConfig {
    pub email: String,
    pub name: String,
    pub phone: String,
    /// When set, the superadmin password is (re)set to this value on startup
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Identity supplied by a trusted upstream proxy
    pub proxy_header: ProxyHeaderAuthConfig,
    /// Password requirements and hashing cost
    pub password: PasswordConfig,
    /// Reset token lifecycle
    pub password_reset: PasswordResetConfig,
}

/// Trusted-header identity configuration.
///
/// staffctl never issues credentials. An upstream proxy (oauth2-proxy, vouch, an API gateway)
/// authenticates the caller and forwards the account email in this header. Only deploy behind a
/// proxy that strips the header from client requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyHeaderAuthConfig {
    /// The name of the HTTP header containing the authenticated account's email.
    pub header_name: String,
}

/// Password validation and hashing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    /// Minimum password length
    pub min_length: usize,
    /// Maximum password length
    pub max_length: usize,
    /// Argon2 memory cost in KiB (default: 19456 KiB = 19 MB, secure for production)
    pub argon2_memory_kib: u32,
    /// Argon2 iterations (default: 2, secure for production)
    pub argon2_iterations: u32,
    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordResetConfig {
    /// How long an issued reset token stays valid
    #[serde(with = "humantime_serde")]
    pub token_duration: Duration,
    /// Subject line of the reset email
    pub subject: String,
    /// Placeholder password for a provisioned manager is this prefix followed by the company phone
    pub manager_password_prefix: String,
}

/// Email configuration for password reset notifications.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
// Note: Cannot use deny_unknown_fields here due to #[serde(flatten)] on transport
pub struct EmailConfig {
    /// Email transport method
    #[serde(flatten)]
    pub transport: EmailTransportConfig,
    /// Sender email address
    pub from_email: String,
    /// Sender display name
    pub from_name: String,
    /// Who to set the reply to field from
    pub reply_to: Option<String>,
}

/// Email transport configuration - either SMTP or file-based for testing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmailTransportConfig {
    /// Send emails via SMTP server
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
        use_tls: bool,
    },
    /// Write emails to files (for development/testing)
    File {
        /// Directory path where email files will be written
        path: String,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotificationsConfig {
    /// Capacity of the in-process notification queue. When full, new notifications are dropped
    /// and reported.
    pub queue_capacity: usize,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            app_url: "http://localhost:3001".to_string(),
            database_url: None,
            database: DatabaseConfig::default(),
            superadmin: SuperadminConfig::default(),
            auth: AuthConfig::default(),
            email: EmailConfig::default(),
            notifications: NotificationsConfig::default(),
            enable_otel_export: false,
            cors: CorsConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://staffctl.db?mode=rwc".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

impl Default for PoolSettings {
    /// Production defaults: SQLite serialises writers, so a small pool is enough
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,  // 10 minutes
            max_lifetime_secs: 1800, // 30 minutes
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for SuperadminConfig {
    fn default() -> Self {
        Self {
            email: "superadmin@staffctl.local".to_string(),
            name: "Super Admin".to_string(),
            phone: "0000000000".to_string(),
            password: None,
        }
    }
}

impl Default for ProxyHeaderAuthConfig {
    fn default() -> Self {
        Self {
            header_name: "x-staffctl-user".to_string(),
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 64,
            // Secure defaults for production (Argon2id RFC recommendations)
            argon2_memory_kib: 19456, // 19 MB
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

impl Default for PasswordResetConfig {
    fn default() -> Self {
        Self {
            token_duration: Duration::from_secs(72 * 60 * 60), // 72 hours
            subject: "Reset your password".to_string(),
            manager_password_prefix: "manager_".to_string(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            transport: EmailTransportConfig::default(),
            from_email: "noreply@staffctl.local".to_string(),
            from_name: "Staff Control".to_string(),
            reply_to: None,
        }
    }
}

impl Default for EmailTransportConfig {
    fn default() -> Self {
        Self::File {
            path: "./emails".to_string(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { queue_capacity: 256 }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            allow_credentials: false,
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        if let Some(url) = config.database_url.take() {
            config.database.url = url;
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        let password = &self.auth.password;
        if password.min_length > password.max_length {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: Invalid password configuration: min_length ({}) cannot be greater than max_length ({})",
                    password.min_length, password.max_length
                ),
            });
        }

        if password.min_length < 1 {
            return Err(Error::Internal {
                operation: "Config validation: Invalid password configuration: min_length must be at least 1".to_string(),
            });
        }

        if self.auth.password_reset.token_duration.is_zero() {
            return Err(Error::Internal {
                operation: "Config validation: auth.password_reset.token_duration must be greater than zero".to_string(),
            });
        }

        if self.auth.proxy_header.header_name.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: auth.proxy_header.header_name cannot be empty".to_string(),
            });
        }

        if let Err(e) = Url::parse(&self.app_url) {
            return Err(Error::Internal {
                operation: format!("Config validation: app_url '{}' is not a valid URL: {e}", self.app_url),
            });
        }

        if let EmailTransportConfig::Smtp { host, .. } = &self.email.transport
            && host.trim().is_empty()
        {
            return Err(Error::Internal {
                operation: "Config validation: SMTP transport selected but email.host is empty".to_string(),
            });
        }

        if self.notifications.queue_capacity == 0 {
            return Err(Error::Internal {
                operation: "Config validation: notifications.queue_capacity must be at least 1".to_string(),
            });
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }

        let has_wildcard = self.cors.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard));
        if has_wildcard && self.cors.allow_credentials {
            return Err(Error::Internal {
                operation: "Config validation: CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins."
                    .to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // STAFFCTL_CONFIG names the file itself and is consumed by clap
            .merge(Env::prefixed("STAFFCTL_").ignore(&["config"]).split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Public link delivered to the account holder for a freshly issued reset token.
    pub fn password_reset_url(&self, raw_token: &str) -> String {
        format!("{}/api/password/reset?token={}", self.app_url.trim_end_matches('/'), raw_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_load_without_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&args("missing.yaml"))?;

            assert_eq!(config.port, 3001);
            assert_eq!(config.auth.proxy_header.header_name, "x-staffctl-user");
            assert_eq!(config.auth.password_reset.manager_password_prefix, "manager_");
            assert_eq!(config.auth.password_reset.token_duration, Duration::from_secs(72 * 60 * 60));
            assert_eq!(config.database.pool.max_connections, 5);

            Ok(())
        });
    }

    #[test]
    fn test_yaml_and_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
app_url: "https://staff.example.com"
auth:
  password:
    min_length: 12
  password_reset:
    token_duration: "2h"
    subject: "Reset Kata Sandi"
superadmin:
  email: "root@example.com"
"#,
            )?;

            jail.set_env("STAFFCTL_HOST", "127.0.0.1");
            jail.set_env("STAFFCTL_PORT", "8080");
            jail.set_env("STAFFCTL_AUTH__PROXY_HEADER__HEADER_NAME", "x-forwarded-email");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.port, 8080);
            assert_eq!(config.app_url, "https://staff.example.com");
            assert_eq!(config.auth.password.min_length, 12);
            assert_eq!(config.auth.password.max_length, 64); // still default
            assert_eq!(config.auth.password_reset.token_duration, Duration::from_secs(2 * 60 * 60));
            assert_eq!(config.auth.password_reset.subject, "Reset Kata Sandi");
            assert_eq!(config.auth.proxy_header.header_name, "x-forwarded-email");
            assert_eq!(config.superadmin.email, "root@example.com");
            assert_eq!(config.superadmin.name, "Super Admin");

            Ok(())
        });
    }

    #[test]
    fn test_database_url_env_overrides_database_section() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
database:
  url: "sqlite://from-file.db"
  pool:
    max_connections: 2
"#,
            )?;
            jail.set_env("DATABASE_URL", "sqlite://from-env.db");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.database.url, "sqlite://from-env.db");
            assert_eq!(config.database.pool.max_connections, 2);
            assert!(config.database_url.is_none());

            Ok(())
        });
    }

    #[test]
    fn test_smtp_transport_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
email:
  type: smtp
  host: smtp.example.com
  port: 587
  username: mailer
  password: secret
  use_tls: true
  from_email: hr@example.com
  from_name: HR
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;

            match config.email.transport {
                EmailTransportConfig::Smtp { host, port, use_tls, .. } => {
                    assert_eq!(host, "smtp.example.com");
                    assert_eq!(port, 587);
                    assert!(use_tls);
                }
                other => panic!("expected smtp transport, got {other:?}"),
            }
            assert_eq!(config.email.from_email, "hr@example.com");

            Ok(())
        });
    }

    #[test]
    fn test_unknown_fields_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "not_a_real_field: true\n")?;

            assert!(Config::load(&args("test.yaml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_validation_rejects_inverted_password_bounds() {
        let mut config = Config::default();
        config.auth.password.min_length = 20;
        config.auth.password.max_length = 10;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_length"));
    }

    #[test]
    fn test_validation_rejects_zero_token_duration() {
        let mut config = Config::default();
        config.auth.password_reset.token_duration = Duration::ZERO;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_header_name() {
        let mut config = Config::default();
        config.auth.proxy_header.header_name = "  ".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_app_url() {
        let mut config = Config::default();
        config.app_url = "not a url".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_wildcard_with_credentials() {
        let mut config = Config::default();
        config.cors.allow_credentials = true;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_password_reset_url() {
        let mut config = Config::default();
        config.app_url = "https://staff.example.com/".to_string();

        assert_eq!(
            config.password_reset_url("abc123"),
            "https://staff.example.com/api/password/reset?token=abc123"
        );
    }
}
