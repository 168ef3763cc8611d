//! Cache configuration.
//!
//! Built from the `[cache]` section of the layered settings.

use std::time::Duration;

pub(crate) const DEFAULT_TTL_SECS: u64 = 60;
pub(crate) const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub(crate) const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;
pub(crate) const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 500;
pub(crate) const DEFAULT_HEALTH_CHECK_INTERVAL_MS: u64 = 5_000;
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Which key-value store backs the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Redis => "redis",
            StoreBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Master switch for the response cache and invalidation hooks.
    pub enabled: bool,
    pub backend: StoreBackend,
    pub redis_url: String,
    /// TTL applied to routes that do not declare their own.
    pub default_ttl: Duration,
    pub connect_timeout: Duration,
    /// Upper bound for any single store command.
    pub operation_timeout: Duration,
    pub health_check_interval: Duration,
    /// Responses with larger bodies are served but never stored.
    pub max_body_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: StoreBackend::Redis,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
            health_check_interval: Duration::from_millis(DEFAULT_HEALTH_CHECK_INTERVAL_MS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            default_ttl: settings.default_ttl,
            connect_timeout: settings.connect_timeout,
            operation_timeout: settings.operation_timeout,
            health_check_interval: settings.health_check_interval,
            max_body_bytes: settings.max_body_bytes,
        }
    }
}
