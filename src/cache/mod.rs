//! Cache Module
//!
//! Provides in-memory caching with LRU eviction and TTL expiration.

mod entry;
mod expiry;
mod lru;
mod shared;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use expiry::{ExpiryPolicy, ExpiryQueue, ExpiryTicket};
pub use lru::{RecencyList, Slot};
pub use shared::Cache;
pub use store::CacheStore;
