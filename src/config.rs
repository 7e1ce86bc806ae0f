//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment
//! variables or an embedding application's own config file.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use serde::Deserialize;
use tokio::time::Duration;
use tracing::warn;

use crate::cache::ExpiryPolicy;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults. Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold, 0 = unbounded
    pub capacity: usize,
    /// TTL in milliseconds shared by every entry, 0 = no expiration
    pub ttl_ms: u64,
    /// What the TTL is measured from
    pub expiry_policy: ExpiryPolicy,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `CACHE_TTL_MS` - TTL in milliseconds (default: 0, disabled)
    /// - `CACHE_EXPIRY_POLICY` - `since_insert` or `since_write` (default: `since_insert`)
    ///
    /// Unparsable values are logged and replaced by the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: env_or("CACHE_CAPACITY", defaults.capacity),
            ttl_ms: env_or("CACHE_TTL_MS", defaults.ttl_ms),
            expiry_policy: env_or("CACHE_EXPIRY_POLICY", defaults.expiry_policy),
        }
    }

    /// Returns the TTL as a Duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl_ms: 0,
            expiry_policy: ExpiryPolicy::SinceInsert,
        }
    }
}

fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|err| {
            warn!(var = name, value = %raw, error = %err, "Ignoring invalid environment variable");
            default
        }),
        Err(_) => default,
    }
}
