//! Block structure as consumed by catch-up and finalization.
//!
//! The node core never validates whole blocks; it only needs the header
//! identity, the height, and the ordered list of normal transactions whose
//! ids drive receipt prefetching and pool removal.

use crate::core::transaction::Transaction;
use crate::types::hash::Hash;
use chaincore_derive::BinaryCodec;

/// Block header metadata.
#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Header {
    /// Block format version.
    pub version: u16,
    /// Height in the chain (genesis = 0).
    pub height: i64,
    /// Block timestamp, microseconds since the epoch.
    pub timestamp: i64,
    /// Hash of the previous block's header.
    pub previous_block: Hash,
    /// Commitment over the block's transactions.
    pub tx_root: Hash,
}

impl Header {
    /// Domain-separated header hash identifying the block.
    pub fn hash(&self) -> Hash {
        let mut h = Hash::sha3();
        h.update(b"BLOCK_HEADER");
        crate::types::encoding::Encode::encode(self, &mut h);
        h.finalize()
    }
}

/// Immutable block: header plus its normal transactions.
#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Block {
    pub header: Header,
    normal_transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: Header, normal_transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            normal_transactions,
        }
    }

    pub fn height(&self) -> i64 {
        self.header.height
    }

    pub fn id(&self) -> Hash {
        self.header.hash()
    }

    /// Transactions in block order.
    pub fn normal_transactions(&self) -> &[Transaction] {
        &self.normal_transactions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::encoding::{Decode, Encode};
    use crate::utils::test_utils::utils::{deterministic_key, tx_at};

    fn header(height: i64) -> Header {
        Header {
            version: 1,
            height,
            timestamp: height * 2_000_000,
            previous_block: Hash::zero(),
            tx_root: Hash::zero(),
        }
    }

    #[test]
    fn height_and_transactions_are_exposed() {
        let key = deterministic_key(1);
        let txs = vec![tx_at(&key, 100), tx_at(&key, 200)];
        let block = Block::new(header(7), txs.clone());

        assert_eq!(block.height(), 7);
        assert_eq!(block.normal_transactions().len(), 2);
        assert_eq!(block.normal_transactions()[0].id(), txs[0].id());
    }

    #[test]
    fn header_hash_changes_with_height() {
        assert_ne!(header(1).hash(), header(2).hash());
    }

    #[test]
    fn codec_roundtrip() {
        let key = deterministic_key(2);
        let block = Block::new(header(3), vec![tx_at(&key, 100)]);
        let decoded = Block::from_bytes(&block.to_bytes()).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.id(), block.id());
    }
}
