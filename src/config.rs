//! Storefront configuration.
//!
//! Loads configuration from `STOREFRONT_*` environment variables with defaults.
//! A `.env` file in the working directory is read first if present; variables
//! already set in the process environment take precedence over it.

use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {key} value: {value}")]
    Invalid { key: String, value: String },
}

/// Top-level configuration handed to [`StorefrontSystem`](crate::app_system::StorefrontSystem).
#[derive(Debug, Clone, PartialEq)]
pub struct StorefrontConfig {
    /// Channel capacity of every store actor
    pub actor_buffer: usize,
    /// Upper bound on a single store request
    pub store_timeout: Duration,
    /// Inline attempts for rollback and cart clearing before handing off to a background task
    pub retry_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent attempt
    pub retry_backoff: Duration,
    pub cache: CacheConfig,
}

/// Read cache configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub product_ttl: Duration,
    pub listing_ttl: Duration,
    /// Upper bound on a single cache backend call
    pub op_timeout: Duration,
    pub invalidation_attempts: u32,
    pub invalidation_backoff: Duration,
    /// Minimum spacing between redelivery attempts of pending invalidations
    pub flush_interval: Duration,
    /// How often the in-memory backend drops expired entries
    pub sweep_interval: Duration,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        Ok(Self {
            actor_buffer: load_env("STOREFRONT_ACTOR_BUFFER", defaults.actor_buffer)?,
            store_timeout: load_millis_env("STOREFRONT_STORE_TIMEOUT_MS", defaults.store_timeout)?,
            retry_attempts: load_env("STOREFRONT_RETRY_ATTEMPTS", defaults.retry_attempts)?,
            retry_backoff: load_millis_env("STOREFRONT_RETRY_BACKOFF_MS", defaults.retry_backoff)?,
            cache: CacheConfig {
                product_ttl: load_secs_env("STOREFRONT_CACHE_PRODUCT_TTL_SECS", defaults.cache.product_ttl)?,
                listing_ttl: load_secs_env("STOREFRONT_CACHE_LISTING_TTL_SECS", defaults.cache.listing_ttl)?,
                op_timeout: load_millis_env("STOREFRONT_CACHE_TIMEOUT_MS", defaults.cache.op_timeout)?,
                invalidation_attempts: load_env(
                    "STOREFRONT_CACHE_INVALIDATION_ATTEMPTS",
                    defaults.cache.invalidation_attempts,
                )?,
                invalidation_backoff: load_millis_env(
                    "STOREFRONT_CACHE_INVALIDATION_BACKOFF_MS",
                    defaults.cache.invalidation_backoff,
                )?,
                flush_interval: load_millis_env("STOREFRONT_CACHE_FLUSH_INTERVAL_MS", defaults.cache.flush_interval)?,
                sweep_interval: load_secs_env("STOREFRONT_CACHE_SWEEP_INTERVAL_SECS", defaults.cache.sweep_interval)?,
            },
        })
    }

    /// Fast timings for tests.
    pub fn test() -> Self {
        Self {
            actor_buffer: 64,
            store_timeout: Duration::from_millis(500),
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(1),
            cache: CacheConfig {
                product_ttl: Duration::from_secs(60),
                listing_ttl: Duration::from_secs(600),
                op_timeout: Duration::from_millis(50),
                invalidation_attempts: 2,
                invalidation_backoff: Duration::from_millis(1),
                flush_interval: Duration::ZERO,
                sweep_interval: Duration::from_secs(30),
            },
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            actor_buffer: 32,
            store_timeout: Duration::from_secs(2),
            retry_attempts: 5,
            retry_backoff: Duration::from_millis(20),
            cache: CacheConfig {
                product_ttl: Duration::from_secs(60),
                listing_ttl: Duration::from_secs(600),
                op_timeout: Duration::from_millis(250),
                invalidation_attempts: 3,
                invalidation_backoff: Duration::from_millis(10),
                flush_interval: Duration::from_secs(1),
                sweep_interval: Duration::from_secs(30),
            },
        }
    }
}

fn load_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(val) => val.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: val,
        }),
        Err(_) => Ok(default),
    }
}

fn load_millis_env(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    let millis = load_env(key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(millis))
}

fn load_secs_env(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    let secs = load_env(key, default.as_secs())?;
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable names; the process environment is shared across test threads.

    #[test]
    fn test_default_cache_ttls_are_minutes_not_hours() {
        let config = StorefrontConfig::default();
        assert_eq!(config.cache.product_ttl, Duration::from_secs(60));
        assert_eq!(config.cache.listing_ttl, Duration::from_secs(600));
        assert!(config.store_timeout > Duration::ZERO);
    }

    #[test]
    fn test_load_env_parses_and_rejects() {
        env::set_var("STOREFRONT_TEST_PARSE_OK", " 42 ");
        assert_eq!(load_env("STOREFRONT_TEST_PARSE_OK", 1u32), Ok(42));

        env::set_var("STOREFRONT_TEST_PARSE_BAD", "forty-two");
        assert_eq!(
            load_env("STOREFRONT_TEST_PARSE_BAD", 1u32),
            Err(ConfigError::Invalid {
                key: "STOREFRONT_TEST_PARSE_BAD".to_string(),
                value: "forty-two".to_string(),
            })
        );

        assert_eq!(load_env("STOREFRONT_TEST_PARSE_UNSET", 7u32), Ok(7));
    }

    #[test]
    fn test_duration_helpers_use_their_units() {
        env::set_var("STOREFRONT_TEST_MILLIS", "150");
        env::set_var("STOREFRONT_TEST_SECS", "90");
        assert_eq!(
            load_millis_env("STOREFRONT_TEST_MILLIS", Duration::ZERO),
            Ok(Duration::from_millis(150))
        );
        assert_eq!(
            load_secs_env("STOREFRONT_TEST_SECS", Duration::ZERO),
            Ok(Duration::from_secs(90))
        );
    }

    #[test]
    fn test_env_file_fills_gaps_without_overriding_process_env() {
        let path = env::temp_dir().join(format!("storefront-{}.env", std::process::id()));
        std::fs::write(
            &path,
            "STOREFRONT_CACHE_FLUSH_INTERVAL_MS=321\nSTOREFRONT_CACHE_SWEEP_INTERVAL_SECS=99\n",
        )
        .unwrap();
        env::set_var("STOREFRONT_CACHE_SWEEP_INTERVAL_SECS", "7");

        dotenvy::from_path(&path).unwrap();
        let config = StorefrontConfig::from_env().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.cache.flush_interval, Duration::from_millis(321));
        assert_eq!(config.cache.sweep_interval, Duration::from_secs(7));
    }
}
