//! Insertion-ordered transaction container with id index and bloom chain.
//!
//! Two coordinated structures: a doubly-linked list over a slot arena
//! (stable iteration in arrival order, O(1) unlink) and a map from
//! transaction id to slot (O(1) lookup and removal). Outside of a mutation
//! the two always agree on membership.
//!
//! Entries are additionally grouped into bloom *segments*: each segment owns
//! a filter containing every id ever linked to it. Segments are append-only;
//! once one has seen [`SEGMENT_CAPACITY`] insertions the next insertion
//! starts a new segment. Removal leaves the segment bits set, so a segment
//! filter is a superset of its live ids, which is the safe direction for
//! gossip filtering.

use crate::core::transaction::{Transaction, TxError};
use crate::pool::bloom::TxBloom;
use crate::pool::PoolError;
use crate::types::hash::Hash;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Insertions per bloom segment before a new one is started.
pub const SEGMENT_CAPACITY: usize = 512;

/// A staged transaction with its pool-side bookkeeping.
pub struct TxEntry {
    pub tx: Arc<Transaction>,
    /// Monotonic nanoseconds at insertion; 0 when the transaction was
    /// re-added from a block rather than submitted directly.
    pub insertion_ts: u64,
    /// First rejection reason observed for this entry; set once.
    pub err: Option<TxError>,
    /// Index of the bloom segment holding this entry's id.
    pub segment: usize,
    /// Identity token: distinguishes this entry from a later re-add of the
    /// same id when a reference was taken outside the pool lock.
    pub seq: u64,

    prev: Option<usize>,
    next: Option<usize>,
}

struct Segment {
    bloom: TxBloom,
    added: usize,
}

/// Deterministically ordered list of staged transactions.
pub struct TxList {
    slots: Vec<Option<TxEntry>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    index: HashMap<Hash, usize>,
    segments: Vec<Segment>,
    next_seq: u64,
    len: usize,
    epoch: Instant,
}

impl TxList {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            index: HashMap::new(),
            segments: vec![Segment {
                bloom: TxBloom::new(),
                added: 0,
            }],
            next_seq: 0,
            len: 0,
            epoch: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Monotonic clock reading used for insertion timestamps and latency.
    pub fn now_nanos(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    pub fn has_tx(&self, id: &Hash) -> bool {
        self.index.contains_key(id)
    }

    /// Appends a transaction, keyed by its id.
    ///
    /// Returns [`PoolError::DuplicateTransaction`] without touching the list
    /// if the id is already present.
    pub fn add(&mut self, tx: Arc<Transaction>, direct: bool) -> Result<(), PoolError> {
        let id = tx.id();
        if self.index.contains_key(&id) {
            return Err(PoolError::DuplicateTransaction);
        }

        // `max(1)` keeps a direct insertion at the epoch instant from
        // reading as a re-add.
        let insertion_ts = if direct { self.now_nanos().max(1) } else { 0 };

        if self.segments[self.segments.len() - 1].added >= SEGMENT_CAPACITY {
            self.segments.push(Segment {
                bloom: TxBloom::new(),
                added: 0,
            });
        }
        let segment = self.segments.len() - 1;
        self.segments[segment].bloom.add(&id);
        self.segments[segment].added += 1;

        let seq = self.next_seq;
        self.next_seq += 1;

        let entry = TxEntry {
            tx,
            insertion_ts,
            err: None,
            segment,
            seq,
            prev: self.tail,
            next: None,
        };

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => {
                if let Some(previous) = self.slots[tail].as_mut() {
                    previous.next = Some(slot);
                }
            }
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);

        self.index.insert(id, slot);
        self.len += 1;
        Ok(())
    }

    pub fn entry(&self, slot: usize) -> Option<&TxEntry> {
        self.slots.get(slot).and_then(|entry| entry.as_ref())
    }

    pub fn entry_mut(&mut self, slot: usize) -> Option<&mut TxEntry> {
        self.slots.get_mut(slot).and_then(|entry| entry.as_mut())
    }

    /// Resolves an id back to its slot, but only if the entry is still the
    /// same instance the caller saw (same `seq`).
    pub fn slot_for(&self, id: &Hash, seq: u64) -> Option<usize> {
        let slot = *self.index.get(id)?;
        let entry = self.entry(slot)?;
        (entry.seq == seq).then_some(slot)
    }

    /// Unlinks and returns the entry at `slot`.
    ///
    /// The id leaves the index; its bits stay in the segment bloom.
    pub fn remove_slot(&mut self, slot: usize) -> Option<TxEntry> {
        let entry = self.slots.get_mut(slot)?.take()?;

        match entry.prev {
            Some(prev) => {
                if let Some(previous) = self.slots[prev].as_mut() {
                    previous.next = entry.next;
                }
            }
            None => self.head = entry.next,
        }
        match entry.next {
            Some(next) => {
                if let Some(following) = self.slots[next].as_mut() {
                    following.prev = entry.prev;
                }
            }
            None => self.tail = entry.prev,
        }

        self.index.remove(&entry.tx.id());
        self.free.push(slot);
        self.len -= 1;
        Some(entry)
    }

    pub fn remove_tx(&mut self, id: &Hash) -> Option<TxEntry> {
        let slot = *self.index.get(id)?;
        self.remove_slot(slot)
    }

    pub fn front(&self) -> Option<&TxEntry> {
        self.head.and_then(|slot| self.entry(slot))
    }

    /// Iterates entries in insertion order, yielding `(slot, entry)`.
    pub fn iter(&self) -> TxIter<'_> {
        TxIter {
            list: self,
            cursor: self.head,
        }
    }

    /// Union of every segment filter: contains every staged id.
    pub fn bloom(&self) -> TxBloom {
        let mut out = TxBloom::new();
        for segment in &self.segments {
            out.merge(&segment.bloom);
        }
        out
    }

    pub fn segment_bloom(&self, segment: usize) -> &TxBloom {
        &self.segments[segment].bloom
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

impl Default for TxList {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TxIter<'a> {
    list: &'a TxList,
    cursor: Option<usize>,
}

impl<'a> Iterator for TxIter<'a> {
    type Item = (usize, &'a TxEntry);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let entry = self.list.entry(slot)?;
        self.cursor = entry.next;
        Some((slot, entry))
    }
}
