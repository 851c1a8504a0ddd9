//! World-state interfaces consumed by transaction pre-validation.
//!
//! The node core never owns account state; it sees it through
//! [`WorldContext`], a snapshot of the world at the block being built, and
//! [`AccountState`], a mutable per-account view inside that snapshot.
//! Candidate selection relies on `set_balance` writing into a transient
//! overlay so cumulative spending by one sender is visible to the next
//! pre-validation in the same pass.

use crate::types::address::Address;
use crate::types::hexint::HexInt;
use serde_json::Value;
use std::sync::Arc;

/// Transaction group, determining which pool and thresholds apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxGroup {
    /// User-submitted transactions.
    Normal,
    /// Consensus patch transactions.
    Patch,
}

/// Step cost categories used for the minimum-step calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepType {
    /// Flat cost charged once per transaction.
    Default,
    /// Per-byte cost of the transaction input data.
    Input,
    /// Cost of invoking a contract method.
    ContractCall,
}

/// Mutable view of a single account inside a world snapshot.
///
/// Implementations use interior mutability; `set_balance` writes to the
/// snapshot's overlay, never to finalized state.
pub trait AccountState: Send + Sync {
    fn balance(&self) -> HexInt;
    fn set_balance(&self, value: HexInt);

    /// True if the account holds a contract.
    fn is_contract(&self) -> bool;

    /// True if the contract is deployed, enabled and not blocked.
    fn has_active_contract(&self) -> bool;

    fn is_contract_owner(&self, owner: &Address) -> bool;

    /// True if the account exposes an API at all.
    fn has_api(&self) -> bool;

    /// True if the contract API accepts the given method and parameters.
    fn accepts_call(&self, method: &str, params: Option<&Value>) -> bool;
}

/// Read view of the world at a specific block, plus a transient overlay.
pub trait WorldContext: Send + Sync {
    /// Timestamp of the block being built, in microseconds.
    fn block_timestamp(&self) -> i64;

    /// Active protocol revision.
    fn revision(&self) -> u32;

    /// Step cost for `count` units of the given type.
    fn steps_for(&self, step_type: StepType, count: i64) -> i64;

    /// Current price per step.
    fn step_price(&self) -> HexInt;

    /// Account view for the given address, creating an empty one if absent.
    fn account_state(&self, address: &Address) -> Arc<dyn AccountState>;

    /// How far behind the block timestamp a transaction of this group may
    /// lag before it is considered expired, in microseconds.
    fn tx_timestamp_threshold(&self, group: TxGroup) -> i64;
}
