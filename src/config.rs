//! Configuration Module
//!
//! Handles loading and managing client configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_EXCLUDED_PATHS;

/// Client configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL every request path is resolved against
    pub base_url: String,
    /// Lifetime of a cached read response, in seconds
    pub cache_ttl: u64,
    /// Maximum number of cached responses
    pub cache_max_entries: usize,
    /// Path substrings that are never cached
    pub cache_exclusions: Vec<String>,
    /// Interval between proactive session refreshes, in seconds
    pub refresh_interval: u64,
    /// Endpoint that rotates the session credential
    pub refresh_path: String,
    /// Endpoint that hands out a fresh CSRF token
    pub csrf_path: String,
    /// Header carrying the CSRF token on mutating requests
    pub csrf_header: String,
    /// Body field the server uses to publish a (rotated) CSRF token
    pub csrf_body_field: String,
    /// Error code identifying a CSRF rejection
    pub csrf_error_code: String,
    /// Status identifying an expired session
    pub auth_expired_status: u16,
    /// Login entry point used for the terminal redirect
    pub login_url: String,
    /// Query parameter carrying the return path on the login redirect
    pub return_param: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `API_BASE_URL` - Base URL of the backend (default: http://localhost:8080/api/)
    /// - `CACHE_TTL_SECS` - Cache entry lifetime (default: 300)
    /// - `CACHE_MAX_ENTRIES` - Cache capacity (default: 100)
    /// - `REFRESH_INTERVAL_SECS` - Proactive refresh interval (default: 840)
    /// - `REFRESH_PATH` - Refresh endpoint (default: auth/refresh)
    /// - `CSRF_PATH` - CSRF token endpoint (default: auth/csrf-token)
    /// - `CSRF_HEADER` - CSRF header name (default: X-CSRF-Token)
    /// - `CSRF_BODY_FIELD` - Body field carrying a token (default: csrfToken)
    /// - `CSRF_ERROR_CODE` - Error code of a CSRF rejection (default: CSRF_TOKEN_INVALID)
    /// - `AUTH_EXPIRED_STATUS` - Status of an expired session (default: 401)
    /// - `LOGIN_URL` - Login entry point (default: /login)
    /// - `RETURN_PARAM` - Return path query parameter (default: returnUrl)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env_or("API_BASE_URL", defaults.base_url),
            cache_ttl: env_or("CACHE_TTL_SECS", defaults.cache_ttl),
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", defaults.cache_max_entries),
            cache_exclusions: defaults.cache_exclusions,
            refresh_interval: env_or("REFRESH_INTERVAL_SECS", defaults.refresh_interval),
            refresh_path: env_or("REFRESH_PATH", defaults.refresh_path),
            csrf_path: env_or("CSRF_PATH", defaults.csrf_path),
            csrf_header: env_or("CSRF_HEADER", defaults.csrf_header),
            csrf_body_field: env_or("CSRF_BODY_FIELD", defaults.csrf_body_field),
            csrf_error_code: env_or("CSRF_ERROR_CODE", defaults.csrf_error_code),
            auth_expired_status: env_or("AUTH_EXPIRED_STATUS", defaults.auth_expired_status),
            login_url: env_or("LOGIN_URL", defaults.login_url),
            return_param: env_or("RETURN_PARAM", defaults.return_param),
        }
    }

    /// Cache lifetime as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    /// Proactive refresh interval as a Duration.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/".to_string(),
            cache_ttl: 300,
            cache_max_entries: 100,
            cache_exclusions: DEFAULT_EXCLUDED_PATHS.iter().map(|p| p.to_string()).collect(),
            refresh_interval: 840,
            refresh_path: "auth/refresh".to_string(),
            csrf_path: "auth/csrf-token".to_string(),
            csrf_header: "X-CSRF-Token".to_string(),
            csrf_body_field: "csrfToken".to_string(),
            csrf_error_code: "CSRF_TOKEN_INVALID".to_string(),
            auth_expired_status: 401,
            login_url: "/login".to_string(),
            return_param: "returnUrl".to_string(),
        }
    }
}
