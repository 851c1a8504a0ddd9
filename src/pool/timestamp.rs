//! Per-block timestamp admissibility window.
//!
//! Built once per candidate pass from the world snapshot: a transaction is
//! admissible for the block being built when its timestamp is neither behind
//! the group's expiry threshold nor ahead of the forward margin.

use crate::core::transaction::{Transaction, TxError, TIMESTAMP_FORWARD_MARGIN};
use crate::state::{TxGroup, WorldContext};

/// Admissibility window for one block and transaction group.
pub struct TxTimestampRange {
    block_ts: i64,
    min_ts: i64,
    max_ts: i64,
}

impl TxTimestampRange {
    pub fn new(wc: &dyn WorldContext, group: TxGroup) -> Self {
        let block_ts = wc.block_timestamp();
        let threshold = wc.tx_timestamp_threshold(group);
        Self {
            block_ts,
            min_ts: block_ts - threshold,
            max_ts: block_ts + TIMESTAMP_FORWARD_MARGIN,
        }
    }

    /// Checks a transaction against the window.
    pub fn check_tx(&self, tx: &Transaction) -> Result<(), TxError> {
        let ts = tx.timestamp();
        if ts < self.min_ts {
            return Err(TxError::ExpiredTransaction {
                diff_us: self.block_ts - ts,
            });
        }
        if ts > self.max_ts {
            return Err(TxError::FutureTransaction {
                base: self.block_ts,
                tx: ts,
            });
        }
        Ok(())
    }
}
