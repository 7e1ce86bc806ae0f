//! Shared Cache Module
//!
//! Thread-safe cache handle: a [`CacheStore`] behind a single reader/writer
//! lock, plus the TTL sweeper when expiration is enabled.

use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::Duration;

use crate::cache::{CacheStore, ExpiryPolicy};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::tasks::{spawn_sweeper, Sweeper};

// == Cache ==
/// Concurrency-safe LRU cache with optional TTL expiration.
///
/// One lock guards every internal structure. `get` takes it exclusively
/// because a hit reorders the recency list; `len` shares it.
///
/// Clones are cheap and share the same entries and sweeper. The sweeper
/// stops when [`Cache::shutdown`] is called or when the last clone is
/// dropped.
#[derive(Clone)]
pub struct Cache<V> {
    store: Arc<RwLock<CacheStore<V>>>,
    sweeper: Option<Arc<Sweeper>>,
    capacity: usize,
    ttl: Duration,
    policy: ExpiryPolicy,
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries (0 = unbounded)
    /// that expire `ttl` after insertion (zero = never).
    ///
    /// # Errors
    /// With a non-zero `ttl` the sweeper is spawned on the current Tokio
    /// runtime; outside one this returns [`CacheError::NoRuntime`].
    ///
    /// [`CacheError::NoRuntime`]: crate::CacheError::NoRuntime
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self> {
        Self::with_policy(capacity, ttl, ExpiryPolicy::default())
    }

    /// Creates a cache measuring TTL according to `policy`.
    pub fn with_policy(capacity: usize, ttl: Duration, policy: ExpiryPolicy) -> Result<Self> {
        let store = Arc::new(RwLock::new(CacheStore::with_policy(capacity, ttl, policy)));
        let sweeper = if ttl.is_zero() {
            None
        } else {
            Some(Arc::new(spawn_sweeper(Arc::clone(&store), ttl)?))
        };

        Ok(Self {
            store,
            sweeper,
            capacity,
            ttl,
            policy,
        })
    }

    /// Creates a cache from a loaded configuration.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::with_policy(config.capacity, config.ttl(), config.expiry_policy)
    }

    // == Set ==
    /// Inserts or updates `key`, evicting the least recently used entry if
    /// the cache grows past capacity.
    pub async fn set(&self, key: impl Into<String>, value: V) {
        self.store.write().await.set(key, value);
    }

    // == Get ==
    /// Returns a clone of the value under `key` and marks it recently used.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.store.write().await.get(key)
    }

    // == Delete ==
    /// Removes `key`, returning false if it was not present.
    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Returns true when no entries are stored.
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    // == Flush ==
    /// Discards every entry. The sweeper keeps running.
    pub async fn flush(&self) {
        self.store.write().await.flush();
    }

    // == Audit ==
    /// Verifies the internal structures agree with each other.
    pub async fn audit(&self) -> Result<()> {
        self.store.read().await.audit()
    }

    // == Shutdown ==
    /// Stops the sweeper for every clone of this cache.
    ///
    /// Entries stay readable but are no longer removed proactively; `get`
    /// still hides entries whose TTL has passed.
    pub fn shutdown(&self) {
        if let Some(sweeper) = &self.sweeper {
            sweeper.stop();
        }
    }

    /// Returns true while a sweeper task is running for this cache.
    pub fn sweeper_running(&self) -> bool {
        self.sweeper
            .as_ref()
            .is_some_and(|sweeper| !sweeper.is_finished())
    }

    /// Returns the configured capacity, 0 meaning unbounded.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the shared TTL, zero meaning entries never expire.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns what the TTL is measured from.
    pub fn expiry_policy(&self) -> ExpiryPolicy {
        self.policy
    }
}

impl<V> fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("policy", &self.policy)
            .field("sweeper", &self.sweeper.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use tokio::time::sleep;

    #[test]
    fn test_new_without_ttl_needs_no_runtime() {
        let cache: Cache<u32> = Cache::new(10, Duration::ZERO).unwrap();
        assert!(!cache.sweeper_running());
        assert_eq!(cache.capacity(), 10);
    }

    #[test]
    fn test_new_with_ttl_outside_runtime_fails() {
        let result: Result<Cache<u32>> = Cache::new(10, Duration::from_secs(1));
        assert!(matches!(result, Err(CacheError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = Cache::new(100, Duration::ZERO).unwrap();

        cache.set("test_key", "test_value".to_string()).await;
        assert_eq!(cache.get("test_key").await, Some("test_value".to_string()));
        assert_eq!(cache.len().await, 1);

        assert!(cache.delete("test_key").await);
        assert!(!cache.delete("test_key").await);
        assert_eq!(cache.get("test_key").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let cache = Cache::new(100, Duration::ZERO).unwrap();
        let other = cache.clone();

        cache.set("shared", 7).await;
        assert_eq!(other.get("shared").await, Some(7));

        other.flush().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_sweeper() {
        let cache: Cache<u32> = Cache::new(0, Duration::from_millis(100)).unwrap();
        assert!(cache.sweeper_running());

        cache.shutdown();
        sleep(Duration::from_millis(10)).await;

        assert!(!cache.sweeper_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_a_clone_keeps_sweeper() {
        let cache: Cache<u32> = Cache::new(0, Duration::from_millis(100)).unwrap();
        let other = cache.clone();

        drop(other);
        sleep(Duration::from_millis(250)).await;

        assert!(cache.sweeper_running());
    }

    #[tokio::test]
    async fn test_from_config() {
        let config = CacheConfig {
            capacity: 3,
            ttl_ms: 0,
            expiry_policy: ExpiryPolicy::SinceWrite,
        };
        let cache: Cache<u32> = Cache::from_config(&config).unwrap();

        assert_eq!(cache.capacity(), 3);
        assert_eq!(cache.ttl(), Duration::ZERO);
        assert_eq!(cache.expiry_policy(), ExpiryPolicy::SinceWrite);
        assert!(cache.audit().await.is_ok());
    }
}
