//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and the timestamps
//! used for TTL expiration.

use tokio::time::{Duration, Instant};

use crate::cache::ExpiryPolicy;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The key this entry is stored under
    pub key: String,
    /// The stored value
    pub value: V,
    /// Instant of the first write for this key
    pub inserted_at: Instant,
    /// Instant of the most recent write
    pub written_at: Instant,
    /// Sequence number of this entry's live expiry ticket, 0 when TTL is off
    pub(crate) expiry_seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry written at `now`.
    pub fn new(key: String, value: V, now: Instant) -> Self {
        Self {
            key,
            value,
            inserted_at: now,
            written_at: now,
            expiry_seq: 0,
        }
    }

    // == Refresh ==
    /// Replaces the value in place and records a new write time.
    ///
    /// The insertion time is left alone.
    pub fn refresh(&mut self, value: V, now: Instant) {
        self.value = value;
        self.written_at = now;
    }

    // == Expires At ==
    /// Returns the instant this entry becomes eligible for removal.
    pub fn expires_at(&self, ttl: Duration, policy: ExpiryPolicy) -> Instant {
        match policy {
            ExpiryPolicy::SinceInsert => self.inserted_at + ttl,
            ExpiryPolicy::SinceWrite => self.written_at + ttl,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired once `now` reaches its expiry
    /// instant, so a fully elapsed TTL is always expired. A zero `ttl` means
    /// expiration is disabled and nothing ever expires.
    pub fn is_expired(&self, ttl: Duration, policy: ExpiryPolicy, now: Instant) -> bool {
        !ttl.is_zero() && now >= self.expires_at(ttl, policy)
    }
}
