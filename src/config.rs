//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Secret used when `JWT_SECRET` is unset. Startup warns when it is in use.
pub const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

/// Which key-value store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    /// External redis server
    Redis,
    /// In-process store, for development and tests
    Memory,
}

impl FromStr for CacheBackendKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "memory" => CacheBackendKind::Memory,
            _ => CacheBackendKind::Redis,
        })
    }
}

/// Optional principal created at startup so the API can be logged into.
#[derive(Debug, Clone)]
pub struct BootstrapUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Connection URL of the redis store
    pub redis_url: String,
    /// Cache backend selection
    pub cache_backend: CacheBackendKind,
    /// Upper bound for a single store round trip, in milliseconds
    pub cache_op_timeout_ms: u64,
    /// HMAC secret for access tokens
    pub jwt_secret: String,
    /// Lifetime of issued access tokens
    pub access_token_expire_minutes: i64,
    /// Initial principal, if configured
    pub bootstrap_user: Option<BootstrapUser>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8000)
    /// - `REDIS_URL` - redis connection URL (default: redis://127.0.0.1:6379/0)
    /// - `CACHE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `CACHE_OP_TIMEOUT_MS` - per-operation store timeout (default: 250)
    /// - `JWT_SECRET` - token signing secret (default: insecure development value)
    /// - `ACCESS_TOKEN_EXPIRE_MINUTES` - token lifetime (default: 30)
    /// - `BOOTSTRAP_EMAIL`, `BOOTSTRAP_PASSWORD`, `BOOTSTRAP_NAME` - initial user
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bootstrap_user = match (env::var("BOOTSTRAP_EMAIL"), env::var("BOOTSTRAP_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => {
                Some(BootstrapUser {
                    name: env::var("BOOTSTRAP_NAME").unwrap_or_else(|_| "Administrator".into()),
                    email,
                    password,
                })
            }
            _ => None,
        };

        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            cache_backend: parse_var("CACHE_BACKEND").unwrap_or(defaults.cache_backend),
            cache_op_timeout_ms: parse_var("CACHE_OP_TIMEOUT_MS")
                .unwrap_or(defaults.cache_op_timeout_ms),
            jwt_secret: env::var("JWT_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.jwt_secret),
            access_token_expire_minutes: parse_var("ACCESS_TOKEN_EXPIRE_MINUTES")
                .unwrap_or(defaults.access_token_expire_minutes),
            bootstrap_user,
        }
    }

    /// True when the signing secret is the built-in development value.
    pub fn uses_insecure_secret(&self) -> bool {
        self.jwt_secret == INSECURE_DEFAULT_SECRET
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8000,
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            cache_backend: CacheBackendKind::Redis,
            cache_op_timeout_ms: 250,
            jwt_secret: INSECURE_DEFAULT_SECRET.to_string(),
            access_token_expire_minutes: 30,
            bootstrap_user: None,
        }
    }
}
