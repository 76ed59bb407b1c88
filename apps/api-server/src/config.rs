//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use gatekeep_core::ConfigError;
use gatekeep_infra::env::{flag_env, parse_env};
use gatekeep_infra::{CacheConfig, IdentityPolicyKind, RateLimitConfig};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    /// Upper bound on computing a cached report.
    pub compute_timeout: Duration,
    pub identity: IdentityPolicyKind,
    /// Honour `Forwarded` / `X-Forwarded-For`. Off unless a proxy sets them.
    pub trust_forwarded_headers: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            compute_timeout: Duration::from_millis(5000),
            identity: IdentityPolicyKind::default(),
            trust_forwarded_headers: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_env("PORT")?.unwrap_or(defaults.port),
            rate_limit: RateLimitConfig::from_env()?,
            cache: CacheConfig::from_env()?,
            compute_timeout: parse_env("CACHE_COMPUTE_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.compute_timeout),
            identity: IdentityPolicyKind::from_env()?,
            trust_forwarded_headers: flag_env(
                "TRUST_FORWARDED_HEADERS",
                defaults.trust_forwarded_headers,
            ),
        })
    }
}
