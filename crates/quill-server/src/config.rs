//! Configuration loading and management

use anyhow::{Context, Result, bail};
use quill_auth::{
    AccountPolicy, CookieSettings, EmailPolicy, HashingParams, ThrottlePolicy, jwt::MIN_SECRET_BYTES,
};
use quill_db::DatabaseOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Environment variable holding the token signing secret
pub const JWT_SECRET_ENV: &str = "QUILL_JWT_SECRET";
/// Environment variable overriding the database path
pub const DATABASE_PATH_ENV: &str = "QUILL_DATABASE_PATH";
/// Longest accepted session lifetime (one year)
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout_secs(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    /// SQLite connection URL for the configured path
    pub fn url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }

    pub fn options(&self) -> DatabaseOptions {
        DatabaseOptions {
            max_connections: self.max_connections,
            busy_timeout: Duration::from_secs(self.busy_timeout_secs),
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
        }
    }
}

/// Authentication configuration
///
/// `jwt_secret` has no default. It must come from the config file or
/// `QUILL_JWT_SECRET`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default, skip_serializing)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    #[serde(default)]
    pub cookie: CookieConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub hashing: HashingConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_hours: default_token_ttl_hours(),
            min_password_length: default_min_password_length(),
            cookie: CookieConfig::default(),
            email: EmailConfig::default(),
            hashing: HashingConfig::default(),
            throttle: ThrottleConfig::default(),
        }
    }
}

impl AuthConfig {
    pub fn account_policy(&self) -> AccountPolicy {
        AccountPolicy {
            min_password_length: self.min_password_length,
            email: EmailPolicy {
                case_insensitive: self.email.case_insensitive,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    #[serde(default = "default_cookie_name")]
    pub name: String,
    #[serde(default = "default_true")]
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            secure: true,
        }
    }
}

impl From<&CookieConfig> for CookieSettings {
    fn from(config: &CookieConfig) -> Self {
        CookieSettings {
            name: config.name.clone(),
            secure: config.secure,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Fold emails to lowercase before storing and comparing
    #[serde(default = "default_true")]
    pub case_insensitive: bool,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            case_insensitive: true,
        }
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashingConfig {
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

impl From<&HashingConfig> for HashingParams {
    fn from(config: &HashingConfig) -> Self {
        HashingParams {
            memory_kib: config.memory_kib,
            iterations: config.iterations,
            parallelism: config.parallelism,
        }
    }
}

/// Login throttle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_free_attempts")]
    pub free_attempts: u32,
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            free_attempts: default_free_attempts(),
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl From<&ThrottleConfig> for ThrottlePolicy {
    fn from(config: &ThrottleConfig) -> Self {
        ThrottlePolicy {
            enabled: config.enabled,
            free_attempts: config.free_attempts,
            base_delay: Duration::from_secs(config.base_delay_secs),
            max_delay: Duration::from_secs(config.max_delay_secs),
        }
    }
}

/// CORS configuration
///
/// Credentials are always allowed, so origins must be listed explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_db_path() -> String {
    "./data/quill.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_busy_timeout_secs() -> u64 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    10
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_min_password_length() -> usize {
    7
}

fn default_cookie_name() -> String {
    "jwt".to_string()
}

fn default_true() -> bool {
    true
}

fn default_memory_kib() -> u32 {
    65536
}

fn default_iterations() -> u32 {
    3
}

fn default_parallelism() -> u32 {
    4
}

fn default_free_attempts() -> u32 {
    5
}

fn default_base_delay_secs() -> u64 {
    1
}

fn default_max_delay_secs() -> u64 {
    15 * 60
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Load configuration from a file, then apply environment overrides
    ///
    /// A missing file falls back to defaults; the secret must then come
    /// from the environment.
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            let config = Self::from_toml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path))?;
            info!("Loaded configuration from {}", path);
            config
        } else {
            info!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(JWT_SECRET_ENV).filter(|s| !s.is_empty()) {
            self.auth.jwt_secret = secret;
        }
        if let Some(path) = lookup(DATABASE_PATH_ENV).filter(|s| !s.is_empty()) {
            self.database.path = path;
        }
    }

    /// Reject settings the server cannot safely start with
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            bail!(
                "auth.jwt_secret is not set; configure it or set {}",
                JWT_SECRET_ENV
            );
        }
        if self.auth.jwt_secret.len() < MIN_SECRET_BYTES {
            bail!(
                "auth.jwt_secret must be at least {} bytes",
                MIN_SECRET_BYTES
            );
        }
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.auth.token_ttl_hours) {
            bail!(
                "auth.token_ttl_hours must be between 1 and {}",
                MAX_TOKEN_TTL_HOURS
            );
        }
        if self.auth.min_password_length == 0 {
            bail!("auth.min_password_length must be positive");
        }
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be positive");
        }
        if self.server.request_timeout_secs == 0 {
            bail!("server.request_timeout_secs must be positive");
        }
        if self.cors.allowed_origins.iter().any(|o| o == "*") {
            bail!("cors.allowed_origins cannot contain \"*\" when credentials are allowed");
        }
        Ok(())
    }
}
