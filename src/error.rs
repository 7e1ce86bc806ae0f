//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Normal cache operations
//! never fail; these variants cover construction and structural audits.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// TTL expiration was requested but no Tokio runtime is available to
    /// host the sweeper task
    #[error("TTL expiration requires a Tokio runtime to run the sweeper")]
    NoRuntime,

    /// Internal structures disagree with each other
    #[error("Cache corrupted: {0}")]
    Corrupted(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
