//! Configuration loading and constants.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file, then
//! environment variables. `AppConfig` is the root configuration struct; it is
//! built once at startup and never mutated afterwards.

use const_format::formatcp;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

// =============================================================================
// Health Check Response Headers
// =============================================================================
// Set on every probe response that passes request validation.

pub const CACHE_CONTROL_NO_STORE: &str = "no-cache, no-store, must-revalidate";
pub const PRAGMA_NO_CACHE: &str = "no-cache";
pub const CONTENT_TYPE_OPTIONS_NOSNIFF: &str = "nosniff";

// =============================================================================
// Health Check Probe
// =============================================================================

/// Schema holding the probe table
pub const HEALTH_CHECK_SCHEMA: &str = "webapp";

/// Probe table; must already exist with a `checked_at TIMESTAMP` column
pub const HEALTH_CHECK_TABLE: &str = "health_checks";

/// Statement executed once per successful validation
pub const HEALTH_CHECK_INSERT: &str = formatcp!(
    "INSERT INTO {}.{} (checked_at) VALUES (CURRENT_TIMESTAMP)",
    HEALTH_CHECK_SCHEMA,
    HEALTH_CHECK_TABLE
);

// =============================================================================
// Defaults
// =============================================================================

/// Default log filter when neither --log-level nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "webapp=info";

pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Time allowed for in-flight requests after SIGTERM/SIGINT
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_SSLMODE: &str = "prefer";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_DB_PROBE_TIMEOUT_SECS: u64 = 5;

/// Accepted values for `database.sslmode` (libpq naming)
pub const SSL_MODES: &[&str] = &[
    "disable",
    "allow",
    "prefer",
    "require",
    "verify-ca",
    "verify-full",
];

// =============================================================================
// Environment Variables
// =============================================================================

pub const ENV_SERVER_HOST: &str = "SERVER_HOST";
pub const ENV_SERVER_PORT: &str = "SERVER_PORT";
pub const ENV_SHUTDOWN_GRACE: &str = "SHUTDOWN_GRACE_SECONDS";
pub const ENV_DB_HOST: &str = "DB_HOST";
pub const ENV_DB_PORT: &str = "DB_PORT";
pub const ENV_DB_USER: &str = "DB_USER";
pub const ENV_DB_PASSWORD: &str = "DB_PASSWORD";
pub const ENV_DB_NAME: &str = "DB_NAME";
pub const ENV_DB_SSLMODE: &str = "DB_SSLMODE";
pub const ENV_DB_MAX_CONNECTIONS: &str = "DB_MAX_CONNECTIONS";
pub const ENV_DB_CONNECT_TIMEOUT: &str = "DB_CONNECT_TIMEOUT";
pub const ENV_DB_PROBE_TIMEOUT: &str = "DB_PROBE_TIMEOUT";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub http: HttpServerConfig,
    /// Database connection parameters
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
    /// Grace period for in-flight requests on shutdown, in seconds
    #[serde(default = "HttpServerConfig::default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            shutdown_grace_seconds: Self::default_shutdown_grace(),
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        DEFAULT_HTTP_HOST.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_HTTP_PORT
    }

    fn default_shutdown_grace() -> u64 {
        DEFAULT_SHUTDOWN_GRACE_SECS
    }
}

/// Postgres connection parameters
#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "DatabaseConfig::default_host")]
    pub host: String,
    #[serde(default = "DatabaseConfig::default_port")]
    pub port: u16,
    /// Login role (required)
    #[serde(default)]
    pub user: String,
    /// Password, if the server requires one
    pub password: Option<String>,
    /// Database name (required)
    #[serde(default)]
    pub name: String,
    #[serde(default = "DatabaseConfig::default_sslmode")]
    pub sslmode: String,
    /// Upper bound on pooled connections
    #[serde(default = "DatabaseConfig::default_max_connections")]
    pub max_connections: u32,
    /// Timeout for establishing or acquiring a connection, in seconds
    #[serde(default = "DatabaseConfig::default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Timeout for the per-request probe insert, in seconds
    #[serde(default = "DatabaseConfig::default_probe_timeout")]
    pub probe_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            user: String::new(),
            password: None,
            name: String::new(),
            sslmode: Self::default_sslmode(),
            max_connections: Self::default_max_connections(),
            connect_timeout_seconds: Self::default_connect_timeout(),
            probe_timeout_seconds: Self::default_probe_timeout(),
        }
    }
}

// Hand-written so the password never reaches the logs.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("name", &self.name)
            .field("sslmode", &self.sslmode)
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .field("probe_timeout_seconds", &self.probe_timeout_seconds)
            .finish()
    }
}

impl DatabaseConfig {
    fn default_host() -> String {
        DEFAULT_DB_HOST.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_DB_PORT
    }

    fn default_sslmode() -> String {
        DEFAULT_DB_SSLMODE.to_string()
    }

    fn default_max_connections() -> u32 {
        DEFAULT_DB_MAX_CONNECTIONS
    }

    fn default_connect_timeout() -> u64 {
        DEFAULT_DB_CONNECT_TIMEOUT_SECS
    }

    fn default_probe_timeout() -> u64 {
        DEFAULT_DB_PROBE_TIMEOUT_SECS
    }

    /// Check if a password is configured
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                toml::from_str(&contents)?
            }
            None => AppConfig::default(),
        };

        config.apply_env(lookup)?;
        config.validate()?;

        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_SERVER_HOST) {
            self.http.host = host;
        }
        if let Some(port) = parse_var(&lookup, ENV_SERVER_PORT)? {
            self.http.port = port;
        }
        if let Some(grace) = parse_var(&lookup, ENV_SHUTDOWN_GRACE)? {
            self.http.shutdown_grace_seconds = grace;
        }

        let db = &mut self.database;
        if let Some(host) = lookup(ENV_DB_HOST) {
            db.host = host;
        }
        if let Some(port) = parse_var(&lookup, ENV_DB_PORT)? {
            db.port = port;
        }
        if let Some(user) = lookup(ENV_DB_USER) {
            db.user = user;
        }
        if let Some(password) = lookup(ENV_DB_PASSWORD) {
            db.password = Some(password);
        }
        if let Some(name) = lookup(ENV_DB_NAME) {
            db.name = name;
        }
        if let Some(sslmode) = lookup(ENV_DB_SSLMODE) {
            db.sslmode = sslmode;
        }
        if let Some(max) = parse_var(&lookup, ENV_DB_MAX_CONNECTIONS)? {
            db.max_connections = max;
        }
        if let Some(secs) = parse_var(&lookup, ENV_DB_CONNECT_TIMEOUT)? {
            db.connect_timeout_seconds = secs;
        }
        if let Some(secs) = parse_var(&lookup, ENV_DB_PROBE_TIMEOUT)? {
            db.probe_timeout_seconds = secs;
        }

        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let db = &self.database;

        if db.user.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Database user is required (set database.user or {})",
                ENV_DB_USER
            )));
        }
        if db.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Database name is required (set database.name or {})",
                ENV_DB_NAME
            )));
        }
        if !SSL_MODES.contains(&db.sslmode.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Unsupported database.sslmode '{}', expected one of {:?}",
                db.sslmode, SSL_MODES
            )));
        }
        if db.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if db.connect_timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "database.connect_timeout_seconds must be at least 1".to_string(),
            ));
        }
        if db.probe_timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "database.probe_timeout_seconds must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse an optional environment value, reporting the variable name on failure.
fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { name, value }),
        None => Ok(None),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {name}: '{value}'")]
    InvalidVar { name: &'static str, value: String },
    #[error("Configuration error: {0}")]
    Validation(String),
}
