//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `ORDER_DESK_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; orders are kept in memory when neither is set)
//! - `ORDER_DESK_HOST` - Bind address (default: 127.0.0.1)
//! - `ORDER_DESK_PORT` - Listen port (default: 4000)
//! - `ORDER_DESK_CATALOG_PATH` - Catalog fixture (default: crates/api/fixtures/catalog.yaml)
//! - `ORDER_DESK_GRAPHIQL` - Serve the GraphiQL IDE on `GET /graphql` (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Fraction of errors sent to Sentry (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Fraction of transactions traced (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_CATALOG_PATH: &str = "crates/api/fixtures/catalog.yaml";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Order API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Catalog fixture loaded at startup
    pub catalog_path: PathBuf,
    /// Whether `GET /graphql` serves GraphiQL
    pub graphiql: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. production, staging)
    pub sentry_environment: Option<String>,
    /// Error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Transaction sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a
    /// variable if it is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let database_url = env.database_url("ORDER_DESK_DATABASE_URL");
        let host = env.parsed_or_default::<IpAddr>("ORDER_DESK_HOST", "127.0.0.1")?;
        let port = env.parsed_or_default::<u16>("ORDER_DESK_PORT", "4000")?;
        let catalog_path =
            PathBuf::from(env.get_or_default("ORDER_DESK_CATALOG_PATH", DEFAULT_CATALOG_PATH));
        let graphiql = env.flag("ORDER_DESK_GRAPHIQL")?;

        let sentry_dsn = env.optional("SENTRY_DSN");
        let sentry_environment = env.optional("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = env.rate("SENTRY_SAMPLE_RATE", "1.0")?;
        let sentry_traces_sample_rate = env.rate("SENTRY_TRACES_SAMPLE_RATE", "0.0")?;

        Ok(Self {
            database_url,
            host,
            port,
            catalog_path,
            graphiql,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional environment variable. Blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get an environment variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed_or_default<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get_or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Parse a boolean flag (`true`/`false`/`1`/`0`), default false.
    fn flag(&self, key: &str) -> Result<bool, ConfigError> {
        match self.optional(key).as_deref().map(str::trim) {
            None => Ok(false),
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
            Some(v) => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected true or false, got {v}"),
            )),
        }
    }

    /// Parse a sample rate in `0.0..=1.0`.
    fn rate(&self, key: &str, default: &str) -> Result<f32, ConfigError> {
        let rate = self.parsed_or_default::<f32>(key, default)?;
        if (0.0..=1.0).contains(&rate) {
            Ok(rate)
        } else {
            Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("must be between 0.0 and 1.0 (got {rate})"),
            ))
        }
    }

    /// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
    fn database_url(&self, primary_key: &str) -> Option<SecretString> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
    }
}
