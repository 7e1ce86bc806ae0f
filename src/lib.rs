//! Mini Cache - An in-process key/value cache
//!
//! Provides a concurrency-safe cache with capacity-bounded LRU eviction and
//! optional TTL expiration. Expired entries are removed by a background
//! sweeper task, so no caller has to trigger cleanup.
//!
//! ```
//! # async fn demo() -> mini_cache::Result<()> {
//! use std::time::Duration;
//! use mini_cache::Cache;
//!
//! let cache = Cache::new(2, Duration::from_secs(60))?;
//! cache.set("a", 1).await;
//! cache.set("b", 2).await;
//! cache.set("c", 3).await;
//!
//! assert_eq!(cache.get("a").await, None);
//! assert_eq!(cache.get("c").await, Some(3));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

#[cfg(test)]
mod test_support;

pub use cache::{Cache, CacheStore, ExpiryPolicy};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use tasks::{spawn_sweeper, Sweeper};
