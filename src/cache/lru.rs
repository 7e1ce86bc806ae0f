//! LRU Recency Module
//!
//! Implements Least Recently Used ordering for cache eviction.
//!
//! Entries live in a slot arena and are threaded into a doubly linked list by
//! slot index, so the key lookup and the expiry queue can refer to an entry
//! through a stable slot handle instead of a pointer.

use crate::cache::CacheEntry;

/// Stable handle of an entry inside the [`RecencyList`] arena.
///
/// A slot stays valid until its entry is removed; vacated slots are reused.
pub type Slot = usize;

struct Node<V> {
    entry: CacheEntry<V>,
    prev: Option<Slot>,
    next: Option<Slot>,
}

// == Recency List ==
/// Tracks access order for LRU eviction strategy.
///
/// - Front = Most recently used
/// - Back = Least recently used
pub struct RecencyList<V> {
    slots: Vec<Option<Node<V>>>,
    /// Vacated slots available for reuse
    free: Vec<Slot>,
    head: Option<Slot>,
    tail: Option<Slot>,
    len: usize,
}

impl<V> RecencyList<V> {
    // == Constructor ==
    /// Creates a new empty recency list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Front ==
    /// Stores an entry as the most recently used and returns its slot.
    pub fn push_front(&mut self, entry: CacheEntry<V>) -> Slot {
        let node = Node {
            entry,
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.link_front(slot);
        self.len += 1;
        slot
    }

    // == Touch ==
    /// Marks a slot as recently used (moves to front).
    ///
    /// Does nothing if the slot is vacant.
    pub fn touch(&mut self, slot: Slot) {
        if self.head == Some(slot) || self.get(slot).is_none() {
            return;
        }
        self.unlink(slot);
        self.link_front(slot);
    }

    // == Remove ==
    /// Removes the entry at `slot` and frees the slot.
    ///
    /// Returns None if the slot is vacant.
    pub fn remove(&mut self, slot: Slot) -> Option<CacheEntry<V>> {
        self.get(slot)?;
        self.unlink(slot);
        let node = self.slots.get_mut(slot)?.take()?;
        self.free.push(slot);
        self.len -= 1;
        Some(node.entry)
    }

    // == Back ==
    /// Returns the slot of the least recently used entry.
    pub fn back(&self) -> Option<Slot> {
        self.tail
    }

    pub fn get(&self, slot: Slot) -> Option<&CacheEntry<V>> {
        self.slots.get(slot)?.as_ref().map(|node| &node.entry)
    }

    pub fn get_mut(&mut self, slot: Slot) -> Option<&mut CacheEntry<V>> {
        self.slots.get_mut(slot)?.as_mut().map(|node| &mut node.entry)
    }

    // == Length ==
    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.len
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Clear ==
    /// Drops every entry and releases the arena.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    // == Iter ==
    /// Iterates entries from most to least recently used.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            list: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    // == Check Links ==
    /// Walks the list in both directions and verifies the links agree.
    ///
    /// Returns a description of the first inconsistency found.
    pub fn check_links(&self) -> std::result::Result<(), String> {
        let mut count = 0;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let node = self
                .node(slot)
                .ok_or_else(|| format!("list links to vacant slot {slot}"))?;
            if node.prev != prev {
                return Err(format!("slot {slot} has a broken back link"));
            }
            count += 1;
            if count > self.len {
                return Err(format!("forward walk exceeds length {}", self.len));
            }
            prev = Some(slot);
            cursor = node.next;
        }
        if prev != self.tail {
            return Err("tail does not match last node".to_string());
        }
        if count != self.len {
            return Err(format!("walked {count} nodes but length is {}", self.len));
        }
        let occupied = self.slots.iter().filter(|node| node.is_some()).count();
        if occupied != self.len {
            return Err(format!("{occupied} occupied slots but length is {}", self.len));
        }
        Ok(())
    }

    fn node(&self, slot: Slot) -> Option<&Node<V>> {
        self.slots.get(slot)?.as_ref()
    }

    fn node_mut(&mut self, slot: Slot) -> Option<&mut Node<V>> {
        self.slots.get_mut(slot)?.as_mut()
    }

    fn link_front(&mut self, slot: Slot) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(slot) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head.and_then(|head| self.node_mut(head)) {
            Some(head) => head.prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }

    fn unlink(&mut self, slot: Slot) {
        let Some((prev, next)) = self.node(slot).map(|node| (node.prev, node.next)) else {
            return;
        };
        match prev.and_then(|p| self.node_mut(p)) {
            Some(node) => node.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.node_mut(n)) {
            Some(node) => node.prev = prev,
            None => self.tail = prev,
        }
        if let Some(node) = self.node_mut(slot) {
            node.prev = None;
            node.next = None;
        }
    }
}

impl<V> Default for RecencyList<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over `(slot, entry)` pairs, most recent first.
pub struct Iter<'a, V> {
    list: &'a RecencyList<V>,
    cursor: Option<Slot>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (Slot, &'a CacheEntry<V>);

    fn next(&mut self) -> Option<Self::Item> {
        // remaining bounds the walk even if links form a cycle
        if self.remaining == 0 {
            return None;
        }
        let slot = self.cursor?;
        let node = self.list.node(slot)?;
        self.cursor = node.next;
        self.remaining -= 1;
        Some((slot, &node.entry))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn entry(key: &str) -> CacheEntry<()> {
        CacheEntry::new(key.to_string(), (), Instant::now())
    }

    fn keys(lru: &RecencyList<()>) -> Vec<String> {
        lru.iter().map(|(_, e)| e.key.clone()).collect()
    }

    fn back_key(lru: &RecencyList<()>) -> Option<String> {
        lru.back().and_then(|slot| lru.get(slot)).map(|e| e.key.clone())
    }

    #[test]
    fn test_lru_new() {
        let lru: RecencyList<()> = RecencyList::new();
        assert!(lru.is_empty());
        assert_eq!(lru.len(), 0);
        assert_eq!(lru.back(), None);
        assert!(lru.check_links().is_ok());
    }

    #[test]
    fn test_lru_push_front_order() {
        let mut lru = RecencyList::new();

        lru.push_front(entry("key1"));
        lru.push_front(entry("key2"));
        lru.push_front(entry("key3"));

        assert_eq!(lru.len(), 3);
        assert_eq!(keys(&lru), vec!["key3", "key2", "key1"]);
        // key1 is oldest (added first)
        assert_eq!(back_key(&lru), Some("key1".to_string()));
    }

    #[test]
    fn test_lru_touch_existing_slot() {
        let mut lru = RecencyList::new();

        let key1 = lru.push_front(entry("key1"));
        lru.push_front(entry("key2"));
        lru.push_front(entry("key3"));

        lru.touch(key1);

        assert_eq!(lru.len(), 3);
        assert_eq!(back_key(&lru), Some("key2".to_string()));
        assert_eq!(lru.iter().next().map(|(slot, _)| slot), Some(key1));
        assert!(lru.check_links().is_ok());
    }

    #[test]
    fn test_lru_touch_head_is_noop() {
        let mut lru = RecencyList::new();

        lru.push_front(entry("a"));
        let b = lru.push_front(entry("b"));
        lru.touch(b);

        assert_eq!(keys(&lru), vec!["b", "a"]);
        assert!(lru.check_links().is_ok());
    }

    #[test]
    fn test_lru_remove_back_in_order() {
        let mut lru = RecencyList::new();

        lru.push_front(entry("key1"));
        lru.push_front(entry("key2"));
        lru.push_front(entry("key3"));

        let evicted = lru.back().and_then(|slot| lru.remove(slot));
        assert_eq!(evicted.map(|e| e.key), Some("key1".to_string()));
        assert_eq!(lru.len(), 2);

        let evicted = lru.back().and_then(|slot| lru.remove(slot));
        assert_eq!(evicted.map(|e| e.key), Some("key2".to_string()));
        assert_eq!(lru.len(), 1);
        assert!(lru.check_links().is_ok());
    }

    #[test]
    fn test_lru_remove_middle() {
        let mut lru = RecencyList::new();

        lru.push_front(entry("key1"));
        let key2 = lru.push_front(entry("key2"));
        lru.push_front(entry("key3"));

        assert!(lru.remove(key2).is_some());

        assert_eq!(keys(&lru), vec!["key3", "key1"]);
        assert!(lru.check_links().is_ok());
    }

    #[test]
    fn test_lru_remove_vacant_slot() {
        let mut lru = RecencyList::new();

        let key1 = lru.push_front(entry("key1"));
        lru.push_front(entry("key2"));

        assert!(lru.remove(key1).is_some());
        // Removing twice or removing an unknown slot must not disturb the list
        assert!(lru.remove(key1).is_none());
        assert!(lru.remove(42).is_none());

        assert_eq!(lru.len(), 1);
        assert!(lru.check_links().is_ok());
    }

    #[test]
    fn test_lru_reuses_vacated_slots() {
        let mut lru = RecencyList::new();

        let a = lru.push_front(entry("a"));
        lru.push_front(entry("b"));
        lru.remove(a);

        let c = lru.push_front(entry("c"));
        assert_eq!(c, a);
        assert_eq!(lru.get(c).map(|e| e.key.as_str()), Some("c"));
        assert_eq!(keys(&lru), vec!["c", "b"]);
    }

    #[test]
    fn test_lru_order_after_multiple_touches() {
        let mut lru = RecencyList::new();

        let a = lru.push_front(entry("a"));
        let b = lru.push_front(entry("b"));
        let c = lru.push_front(entry("c"));

        // [c, b, a] -> a: [a, c, b] -> c: [c, a, b] -> b: [b, c, a]
        lru.touch(a);
        lru.touch(c);
        lru.touch(b);

        assert_eq!(keys(&lru), vec!["b", "c", "a"]);
        assert!(lru.check_links().is_ok());
    }

    #[test]
    fn test_lru_clear() {
        let mut lru = RecencyList::new();

        lru.push_front(entry("a"));
        lru.push_front(entry("b"));
        lru.clear();

        assert!(lru.is_empty());
        assert_eq!(lru.back(), None);
        assert_eq!(lru.iter().count(), 0);
        assert!(lru.check_links().is_ok());
    }
}
