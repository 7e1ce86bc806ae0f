//! Cache Store Module
//!
//! Main cache engine combining the key lookup with LRU recency tracking and
//! the TTL expiry queue. The store itself is single-threaded; `Cache` wraps
//! it in a lock and runs the sweeper against it.

use std::collections::HashMap;
use std::fmt;

use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::cache::{CacheEntry, ExpiryPolicy, ExpiryQueue, ExpiryTicket, RecencyList, Slot};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Main cache storage with LRU eviction and TTL support.
pub struct CacheStore<V> {
    /// Entry arena threaded in recency order
    entries: RecencyList<V>,
    /// Key lookup into the arena
    index: HashMap<String, Slot>,
    /// Expiry order, present only when TTL is enabled
    expiry: Option<ExpiryQueue>,
    /// Maximum number of entries, 0 = unbounded
    capacity: usize,
    /// Shared TTL, zero = expiration disabled
    ttl: Duration,
    policy: ExpiryPolicy,
}

impl<V> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore with the default expiry policy.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, 0 for no limit
    /// * `ttl` - Time-to-live shared by every entry, zero to disable expiration
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self::with_policy(capacity, ttl, ExpiryPolicy::default())
    }

    /// Creates a new CacheStore measuring TTL according to `policy`.
    pub fn with_policy(capacity: usize, ttl: Duration, policy: ExpiryPolicy) -> Self {
        Self {
            entries: RecencyList::default(),
            index: HashMap::new(),
            expiry: (!ttl.is_zero()).then(ExpiryQueue::default),
            capacity,
            ttl,
            policy,
        }
    }

    // == Set ==
    /// Stores a key-value pair.
    ///
    /// An existing key has its value and write time refreshed in place and
    /// becomes the most recently used entry; the cache does not grow, so no
    /// eviction happens. An existing key whose TTL has already run out is
    /// dropped and inserted anew. A new key is inserted at the front, and if that
    /// pushes the cache over capacity the least recently used entry is
    /// evicted. Never fails.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = Instant::now();

        if let Some(&slot) = self.index.get(&key) {
            let expired = self
                .entries
                .get(slot)
                .is_some_and(|entry| entry.is_expired(self.ttl, self.policy, now));
            if !expired {
                self.entries.touch(slot);
                if let Some(entry) = self.entries.get_mut(slot) {
                    entry.refresh(value, now);
                }
                if self.policy == ExpiryPolicy::SinceWrite {
                    self.requeue(slot);
                }
                return;
            }
            // An unswept expired entry is replaced, not refreshed
            if let Some(stale) = self.remove_slot(slot) {
                debug!(key = %stale.key, "Replaced expired entry");
            }
        }

        let slot = self
            .entries
            .push_front(CacheEntry::new(key.clone(), value, now));
        self.enqueue(slot);
        self.index.insert(key, slot);

        if self.capacity > 0 && self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.back().and_then(|lru| self.remove_slot(lru)) {
                debug!(key = %evicted.key, "Evicted least recently used entry");
            }
        }
    }

    // == Get ==
    /// Retrieves a clone of the value stored under `key`.
    ///
    /// A hit promotes the entry to most recently used. Entries whose TTL has
    /// run out but which the sweeper has not reached yet are reported as
    /// misses. A miss has no side effects.
    pub fn get(&mut self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let slot = *self.index.get(key)?;
        let entry = self.entries.get(slot)?;
        if entry.is_expired(self.ttl, self.policy, Instant::now()) {
            return None;
        }
        let value = entry.value.clone();
        self.entries.touch(slot);
        Some(value)
    }

    // == Delete ==
    /// Removes an entry by key.
    ///
    /// Returns false if the key was not present.
    pub fn delete(&mut self, key: &str) -> bool {
        let Some(&slot) = self.index.get(key) else {
            return false;
        };
        self.remove_slot(slot).is_some()
    }

    // == Flush ==
    /// Discards every entry.
    pub fn flush(&mut self) {
        self.entries.clear();
        self.index.clear();
        if let Some(queue) = self.expiry.as_mut() {
            queue.clear();
        }
    }

    // == Next Expiry ==
    /// Returns the oldest live expiry ticket and the instant it expires.
    ///
    /// None when TTL is disabled or no entries are stored.
    pub fn next_expiry(&self) -> Option<(ExpiryTicket, Instant)> {
        let queue = self.expiry.as_ref()?;
        let ticket = queue.front(|t| ticket_is_live(&self.entries, t))?;
        let entry = self.entries.get(ticket.slot)?;
        Some((ticket, entry.expires_at(self.ttl, self.policy)))
    }

    // == Expire ==
    /// Removes the entry `ticket` refers to, if the ticket is still live.
    ///
    /// The caller decides whether the ticket is due; a ticket goes stale once
    /// its entry is deleted, evicted, flushed or re-enqueued, and stale
    /// tickets are ignored.
    pub fn expire(&mut self, ticket: ExpiryTicket) -> bool {
        if !ticket_is_live(&self.entries, &ticket) {
            return false;
        }
        match self.remove_slot(ticket.slot) {
            Some(entry) => {
                debug!(key = %entry.key, "Expired entry removed");
                true
            }
            None => false,
        }
    }

    // == Cleanup Expired ==
    /// Removes every entry that has expired by now.
    ///
    /// Returns the number of entries removed. Useful for callers driving
    /// expiration themselves instead of relying on the sweeper.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        while let Some((ticket, expires_at)) = self.next_expiry() {
            if now < expires_at || !self.expire(ticket) {
                break;
            }
            removed += 1;
        }
        removed
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        self.policy
    }

    // == Audit ==
    /// Cross-checks the recency list, the key lookup and the expiry queue.
    ///
    /// Returns [`CacheError::Corrupted`] naming the first broken invariant.
    pub fn audit(&self) -> Result<()> {
        self.entries.check_links().map_err(CacheError::Corrupted)?;

        if self.index.len() != self.entries.len() {
            return Err(CacheError::Corrupted(format!(
                "index holds {} keys but recency list holds {} entries",
                self.index.len(),
                self.entries.len()
            )));
        }
        for (slot, entry) in self.entries.iter() {
            if self.index.get(&entry.key) != Some(&slot) {
                return Err(CacheError::Corrupted(format!(
                    "key {:?} at slot {} is not indexed to its slot",
                    entry.key, slot
                )));
            }
        }

        if self.capacity > 0 && self.entries.len() > self.capacity {
            return Err(CacheError::Corrupted(format!(
                "{} entries exceed capacity {}",
                self.entries.len(),
                self.capacity
            )));
        }

        match &self.expiry {
            None if !self.ttl.is_zero() => Err(CacheError::Corrupted(
                "TTL is enabled but the expiry queue is missing".to_string(),
            )),
            Some(_) if self.ttl.is_zero() => Err(CacheError::Corrupted(
                "expiry queue present with TTL disabled".to_string(),
            )),
            None => Ok(()),
            Some(queue) => self.audit_expiry(queue),
        }
    }

    fn audit_expiry(&self, queue: &ExpiryQueue) -> Result<()> {
        if queue.len() != self.entries.len() {
            return Err(CacheError::Corrupted(format!(
                "expiry queue counts {} live tickets for {} entries",
                queue.len(),
                self.entries.len()
            )));
        }

        let mut live = 0;
        let mut previous: Option<Instant> = None;
        for ticket in queue.iter().filter(|t| ticket_is_live(&self.entries, t)) {
            let Some(entry) = self.entries.get(ticket.slot) else {
                continue;
            };
            let expires_at = entry.expires_at(self.ttl, self.policy);
            if previous.is_some_and(|prev| expires_at < prev) {
                return Err(CacheError::Corrupted(format!(
                    "expiry queue out of order at key {:?}",
                    entry.key
                )));
            }
            previous = Some(expires_at);
            live += 1;
        }

        if live != self.entries.len() {
            return Err(CacheError::Corrupted(format!(
                "found {} live tickets for {} entries",
                live,
                self.entries.len()
            )));
        }
        Ok(())
    }

    /// Keys from most to least recently used.
    #[cfg(test)]
    pub(crate) fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(_, e)| e.key.clone()).collect()
    }

    fn enqueue(&mut self, slot: Slot) {
        if let Some(queue) = self.expiry.as_mut() {
            let ticket = queue.push(slot);
            if let Some(entry) = self.entries.get_mut(slot) {
                entry.expiry_seq = ticket.seq;
            }
        }
    }

    /// Moves an entry's ticket to the tail of the expiry queue.
    fn requeue(&mut self, slot: Slot) {
        if let Some(queue) = self.expiry.as_mut() {
            queue.retire();
        }
        self.enqueue(slot);
        self.tidy_expiry();
    }

    /// Shared removal path for delete, eviction and expiry.
    fn remove_slot(&mut self, slot: Slot) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(slot)?;
        self.index.remove(&entry.key);
        if let Some(queue) = self.expiry.as_mut() {
            queue.retire();
        }
        self.tidy_expiry();
        Some(entry)
    }

    fn tidy_expiry(&mut self) {
        let entries = &self.entries;
        if let Some(queue) = self.expiry.as_mut() {
            queue.tidy(|ticket| ticket_is_live(entries, ticket));
        }
    }
}

impl<V> fmt::Debug for CacheStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn ticket_is_live<V>(entries: &RecencyList<V>, ticket: &ExpiryTicket) -> bool {
    entries
        .get(ticket.slot)
        .is_some_and(|entry| entry.expiry_seq == ticket.seq)
}
