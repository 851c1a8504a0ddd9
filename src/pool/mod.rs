//! Transaction staging subsystem.
//!
//! - [`txpool::TransactionPool`]: admission, expiry, candidate selection and
//!   finalize-removal of unconfirmed transactions
//! - [`tx_list`]: insertion-ordered container with id index and bloom chain
//! - [`bloom`]: rolling membership filter over transaction ids
//! - [`timestamp`]: per-block timestamp admissibility window

pub mod bloom;
pub mod timestamp;
pub mod tx_list;
pub mod txpool;

use chaincore_derive::Error;

/// Admission failures returned synchronously to the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// A transaction with the same id is already staged.
    #[error("duplicate transaction")]
    DuplicateTransaction,
    /// The pool is at capacity; the transaction was not admitted.
    #[error("transaction pool over flow")]
    PoolOverflow,
}
