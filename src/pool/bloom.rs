//! Rolling membership filter over transaction ids.
//!
//! A fixed 4096-bit filter with four hash positions taken from the first
//! eight bytes of the id, read as little-endian u16 values. Used to answer
//! "which transactions do you hold that I don't" during gossip: false
//! positives only suppress a retransmission, so the filter staying a
//! superset after removals is harmless.

use crate::types::hash::Hash;

/// Filter width in bytes (4096 bits).
pub const BLOOM_BYTES: usize = 512;

/// Number of hash positions per id.
pub const BLOOM_HASH_COUNT: usize = 4;

const WORDS: usize = BLOOM_BYTES / 8;
const BITS: usize = BLOOM_BYTES * 8;

/// Fixed-width bloom filter keyed by transaction id prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct TxBloom {
    words: [u64; WORDS],
}

impl TxBloom {
    pub fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    /// The four bit positions for an id.
    fn positions(id: &Hash) -> [usize; BLOOM_HASH_COUNT] {
        let bytes = id.as_slice();
        let mut out = [0usize; BLOOM_HASH_COUNT];
        for (i, position) in out.iter_mut().enumerate() {
            let index = u16::from_le_bytes([bytes[i * 2], bytes[i * 2 + 1]]) as usize;
            *position = index % BITS;
        }
        out
    }

    pub fn add(&mut self, id: &Hash) {
        for position in Self::positions(id) {
            self.words[position / 64] |= 1u64 << (position % 64);
        }
    }

    /// Membership test; may report false positives, never false negatives.
    pub fn contains(&self, id: &Hash) -> bool {
        Self::positions(id)
            .iter()
            .all(|&position| self.words[position / 64] & (1u64 << (position % 64)) != 0)
    }

    /// True if every bit set in `other` is set in `self`.
    pub fn contains_all_of(&self, other: &TxBloom) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(mine, theirs)| theirs & !mine == 0)
    }

    /// Unions `other` into `self`.
    pub fn merge(&mut self, other: &TxBloom) {
        for (mine, theirs) in self.words.iter_mut().zip(other.words.iter()) {
            *mine |= theirs;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }
}

impl Default for TxBloom {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TxBloom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set: u32 = self.words.iter().map(|word| word.count_ones()).sum();
        write!(f, "TxBloom({set}/{BITS} bits)")
    }
}
