//! Configuration for the forum service.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

/// Forum service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForumServiceConfig {
    /// Service configuration.
    #[serde(default)]
    pub service: ServiceConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Token and cookie configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Password hashing configuration.
    #[serde(default)]
    pub password: PasswordConfig,
}

/// Service endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL.
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in seconds.
    #[serde(default = "default_session_ttl")]
    pub ttl_seconds: u64,
    /// Interval between expired-session sweeps, in seconds.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

/// Token signing and transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC signing key. Empty means "generate one per process".
    #[serde(default)]
    pub secret_key: String,
    /// Name of the cookie carrying the token.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Mark the token cookie `Secure` (HTTPS only).
    #[serde(default = "default_secure_cookie")]
    pub secure_cookie: bool,
}

/// Password hashing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    /// Argon2 memory cost in KiB.
    #[serde(default = "default_memory_cost")]
    pub memory_cost: u32,
    /// Argon2 time cost (iterations).
    #[serde(default = "default_time_cost")]
    pub time_cost: u32,
    /// Argon2 parallelism factor.
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
    /// Output hash length in bytes.
    #[serde(default = "default_hash_length")]
    pub hash_length: usize,
}

// Default value functions
const fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_database_url() -> String {
    "sqlite://forum.db".to_string()
}

const fn default_max_connections() -> u32 {
    8
}

const fn default_session_ttl() -> u64 {
    86400 // 24 hours
}

const fn default_cleanup_interval() -> u64 {
    300 // 5 minutes
}

fn default_cookie_name() -> String {
    "token".to_string()
}

const fn default_secure_cookie() -> bool {
    !cfg!(debug_assertions)
}

const fn default_memory_cost() -> u32 {
    19456 // OWASP recommended minimum
}

const fn default_time_cost() -> u32 {
    2
}

const fn default_parallelism() -> u32 {
    1
}

const fn default_hash_length() -> usize {
    32
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_session_ttl(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            cookie_name: default_cookie_name(),
            secure_cookie: default_secure_cookie(),
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: default_memory_cost(),
            time_cost: default_time_cost(),
            parallelism: default_parallelism(),
            hash_length: default_hash_length(),
        }
    }
}

impl ForumServiceConfig {
    /// Load configuration from files and environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment().extract().map_err(Box::new)
    }

    /// The provider chain: defaults file, local overrides, then `FORUM_SERVICE_*` env.
    #[must_use]
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Toml::file("config/local.toml"))
            .merge(Env::prefixed("FORUM_SERVICE_").split("__"))
    }
}
