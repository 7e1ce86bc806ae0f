//! Expiry Queue Module
//!
//! Tracks entries in TTL order. Every entry shares one TTL, so enqueue order
//! doubles as expiry order and the head of the queue is always the next entry
//! to expire.
//!
//! The queue never searches for an entry to remove it. A ticket is live while
//! its slot holds an entry carrying the same sequence number; once the entry
//! is removed or re-enqueued the ticket turns into a tombstone that is dropped
//! lazily from the head, or in bulk when tombstones outnumber live tickets.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::cache::Slot;

/// Tombstones tolerated before a compaction is considered.
const COMPACTION_SLACK: usize = 32;

// == Expiry Policy ==
/// Decides what an entry's TTL is measured from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// TTL counts from the first write of a key. Updating an existing key
    /// leaves its place in the expiry queue untouched, so a key that keeps
    /// being rewritten still expires `ttl` after it was first inserted.
    #[default]
    SinceInsert,
    /// TTL counts from the most recent write. Updating an existing key moves
    /// it to the tail of the expiry queue.
    SinceWrite,
}

impl fmt::Display for ExpiryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpiryPolicy::SinceInsert => f.write_str("since_insert"),
            ExpiryPolicy::SinceWrite => f.write_str("since_write"),
        }
    }
}

impl FromStr for ExpiryPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "since_insert" => Ok(ExpiryPolicy::SinceInsert),
            "since_write" => Ok(ExpiryPolicy::SinceWrite),
            other => Err(format!("unknown expiry policy: {other}")),
        }
    }
}

// == Expiry Ticket ==
/// A position in the expiry queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryTicket {
    /// Slot of the entry in the recency arena
    pub slot: Slot,
    /// Sequence number the entry must still carry for the ticket to be live
    pub seq: u64,
}

// == Expiry Queue ==
/// Insertion-ordered queue of expiry tickets.
#[derive(Debug)]
pub struct ExpiryQueue {
    tickets: VecDeque<ExpiryTicket>,
    /// Number of live tickets in `tickets`
    live: usize,
    /// Next sequence number to hand out; 0 is never issued
    next_seq: u64,
}

impl ExpiryQueue {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            tickets: VecDeque::new(),
            live: 0,
            next_seq: 1,
        }
    }

    // == Push ==
    /// Appends a fresh ticket for `slot` and returns it.
    pub fn push(&mut self, slot: Slot) -> ExpiryTicket {
        let ticket = ExpiryTicket {
            slot,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.tickets.push_back(ticket);
        self.live += 1;
        ticket
    }

    // == Retire ==
    /// Records that one live ticket has become a tombstone.
    pub fn retire(&mut self) {
        self.live = self.live.saturating_sub(1);
    }

    // == Front ==
    /// Returns the oldest live ticket without removing it.
    pub fn front(&self, is_live: impl Fn(&ExpiryTicket) -> bool) -> Option<ExpiryTicket> {
        if self.is_empty() {
            return None;
        }
        self.tickets.iter().find(|ticket| is_live(*ticket)).copied()
    }

    // == Tidy ==
    /// Drops tombstones from the head, and compacts the whole queue once
    /// tombstones outnumber live tickets.
    pub fn tidy(&mut self, is_live: impl Fn(&ExpiryTicket) -> bool) {
        while let Some(ticket) = self.tickets.front() {
            if is_live(ticket) {
                break;
            }
            self.tickets.pop_front();
        }
        if self.tickets.len() > 2 * self.live + COMPACTION_SLACK {
            self.tickets.retain(|ticket| is_live(ticket));
        }
    }

    // == Length ==
    /// Returns the number of live tickets.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns the number of stored tickets, tombstones included.
    pub fn raw_len(&self) -> usize {
        self.tickets.len()
    }

    /// Iterates every stored ticket in queue order, tombstones included.
    pub fn iter(&self) -> impl Iterator<Item = &ExpiryTicket> {
        self.tickets.iter()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.tickets.clear();
        self.live = 0;
    }
}

impl Default for ExpiryQueue {
    fn default() -> Self {
        Self::new()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Liveness driven by an explicit set of live sequence numbers.
    fn live_in(set: &HashSet<u64>) -> impl Fn(&ExpiryTicket) -> bool + '_ {
        move |ticket: &ExpiryTicket| set.contains(&ticket.seq)
    }

    #[test]
    fn test_push_assigns_increasing_sequence() {
        let mut queue = ExpiryQueue::new();

        let a = queue.push(0);
        let b = queue.push(1);

        assert!(a.seq > 0);
        assert!(b.seq > a.seq);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_front_skips_tombstones() {
        let mut queue = ExpiryQueue::new();
        let a = queue.push(0);
        let b = queue.push(1);

        let mut live: HashSet<u64> = [a.seq, b.seq].into_iter().collect();
        assert_eq!(queue.front(live_in(&live)), Some(a));

        live.remove(&a.seq);
        queue.retire();
        assert_eq!(queue.front(live_in(&live)), Some(b));
    }

    #[test]
    fn test_front_empty() {
        let queue = ExpiryQueue::new();
        assert_eq!(queue.front(|_| true), None);
    }

    #[test]
    fn test_tidy_pops_head_tombstones() {
        let mut queue = ExpiryQueue::new();
        let a = queue.push(0);
        let b = queue.push(1);
        let c = queue.push(2);

        let live: HashSet<u64> = [c.seq].into_iter().collect();
        queue.retire();
        queue.retire();
        queue.tidy(live_in(&live));

        assert_eq!(queue.raw_len(), 1);
        assert_eq!(queue.iter().next(), Some(&c));
        assert!(!queue.iter().any(|t| *t == a || *t == b));
    }

    #[test]
    fn test_tidy_compacts_scattered_tombstones() {
        let mut queue = ExpiryQueue::new();
        let tickets: Vec<ExpiryTicket> = (0..100).map(|slot| queue.push(slot)).collect();

        // Keep the head live so only compaction can reclaim the rest
        let live: HashSet<u64> = [tickets[0].seq, tickets[99].seq].into_iter().collect();
        for _ in 0..98 {
            queue.retire();
        }
        queue.tidy(live_in(&live));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.raw_len(), 2);
        let order: Vec<_> = queue.iter().copied().collect();
        assert_eq!(order, vec![tickets[0], tickets[99]]);
    }

    #[test]
    fn test_clear() {
        let mut queue = ExpiryQueue::new();
        queue.push(0);
        queue.push(1);
        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(queue.raw_len(), 0);
    }

    #[test]
    fn test_policy_parse_and_display() {
        assert_eq!("since_insert".parse(), Ok(ExpiryPolicy::SinceInsert));
        assert_eq!(" SINCE_WRITE ".parse(), Ok(ExpiryPolicy::SinceWrite));
        assert!("sometimes".parse::<ExpiryPolicy>().is_err());
        assert_eq!(ExpiryPolicy::SinceWrite.to_string(), "since_write");
        assert_eq!(ExpiryPolicy::default(), ExpiryPolicy::SinceInsert);
    }
}
