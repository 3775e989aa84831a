//! Configuration module
//!
//! Loads engine tuning parameters from environment variables.

use std::env;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a fetched exchange rate stays usable, in seconds
    pub rate_cache_ttl_secs: u64,

    /// Per-call timeout for external providers, in milliseconds
    pub provider_timeout_ms: u64,

    /// Default deadline applied to an operation context, in milliseconds
    pub operation_deadline_ms: u64,
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let rate_cache_ttl_secs = env::var("RATE_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("RATE_CACHE_TTL_SECS"))?;

        let provider_timeout_ms = env::var("PROVIDER_TIMEOUT_MS")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PROVIDER_TIMEOUT_MS"))?;

        let operation_deadline_ms = env::var("OPERATION_DEADLINE_MS")
            .unwrap_or_else(|_| "10000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("OPERATION_DEADLINE_MS"))?;

        Ok(Self {
            rate_cache_ttl_secs,
            provider_timeout_ms,
            operation_deadline_ms,
        })
    }

    pub fn rate_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.rate_cache_ttl_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn operation_deadline(&self) -> Duration {
        Duration::from_millis(self.operation_deadline_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rate_cache_ttl_secs: 60,
            provider_timeout_ms: 3000,
            operation_deadline_ms: 10000,
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
