//! Transaction execution receipts.
//!
//! A receipt records the outcome of a finalized transaction. The catch-up
//! path prefetches one per normal transaction of every fetched block.

use crate::types::encoding::Encode;
use crate::types::hash::Hash;
use crate::types::hexint::HexInt;
use chaincore_derive::BinaryCodec;

/// Execution outcome of a single finalized transaction.
#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Receipt {
    /// Id of the transaction this receipt belongs to.
    pub tx_hash: Hash,
    /// Whether execution succeeded.
    pub success: bool,
    /// Steps consumed by the execution.
    pub step_used: HexInt,
    /// Step price charged.
    pub step_price: HexInt,
}

impl Receipt {
    /// Domain-separated receipt hash.
    pub fn hash(&self) -> Hash {
        let mut h = Hash::sha3();
        h.update(b"RECEIPT");
        self.encode(&mut h);
        h.finalize()
    }
}
