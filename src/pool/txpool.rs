//! Transaction pool: admission, expiry, candidate selection and
//! finalize-removal of unconfirmed transactions.
//!
//! One mutex serializes every mutation of the pool's aggregated state (list,
//! bloom chain, observer registrations). The expensive part of candidate
//! selection, pre-validation against the world state, runs outside that
//! mutex on a snapshot of selected entries; cleanup of entries invalidated
//! along the way re-acquires the lock on a background thread. Entries
//! referenced outside the lock are re-identified by `(id, seq)` so a removal
//! never hits a later re-add of the same id.

use crate::core::transaction::{Transaction, TxError};
use crate::pool::bloom::TxBloom;
use crate::pool::timestamp::TxTimestampRange;
use crate::pool::tx_list::TxList;
use crate::pool::PoolError;
use crate::state::{TxGroup, WorldContext};
use crate::storage::bucket::Bucket;
use crate::types::hash::Hash;
use crate::utils::log::Logger;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

/// Upper bound on transactions returned by one candidate pass.
pub const CONFIG_MAX_TX_COUNT: usize = 1500;

/// Default byte budget for one candidate pass.
pub const CONFIG_MAX_TX_BYTES_IN_A_BLOCK: usize = 1024 * 1024;

/// Initial capacity of candidate working slices.
const DEFAULT_TX_SLICE_CAPACITY: usize = 1024;

/// Pool traffic observer.
pub trait Monitor: Send + Sync {
    /// A transaction entered the pool (`user` = direct submission).
    fn on_add_tx(&self, n: usize, user: bool);
    /// A transaction was dropped (expired or invalid).
    fn on_drop_tx(&self, n: usize, user: bool);
    /// A transaction left the pool through finalization.
    fn on_remove_tx(&self, n: usize, user: bool);
    /// A finalized list was removed; `avg_latency` averages submit-to-commit
    /// time over the directly submitted entries.
    fn on_commit(&self, id: Hash, at: SystemTime, avg_latency: Duration);
}

/// Receives the sticky rejection reason when a staged transaction is
/// dropped, exactly once per entry.
pub trait TxWaiterManager: Send + Sync {
    fn on_tx_drop(&self, id: Hash, err: &TxError);
}

/// Receives pool occupancy updates.
pub trait PoolCapacityMonitor: Send + Sync {
    fn on_pool_capacity_updated(&self, group: TxGroup, size: usize, used: usize);
}

struct DummyTxWaiterManager;

impl TxWaiterManager for DummyTxWaiterManager {
    fn on_tx_drop(&self, _id: Hash, _err: &TxError) {}
}

struct DummyPoolCapacityMonitor;

impl PoolCapacityMonitor for DummyPoolCapacityMonitor {
    fn on_pool_capacity_updated(&self, _group: TxGroup, _size: usize, _used: usize) {}
}

/// Pool construction parameters.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub group: TxGroup,
    /// Maximum number of staged transactions.
    pub size: usize,
    /// Enables contract-level data checks during pre-validation.
    pub check_data_on_pre_validate: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            group: TxGroup::Normal,
            size: 5000,
            check_data_on_pre_validate: false,
        }
    }
}

struct PoolState {
    list: TxList,
    txm: Arc<dyn TxWaiterManager>,
    pcm: Arc<dyn PoolCapacityMonitor>,
}

/// Ordered, deduplicating staging area for unconfirmed transactions.
pub struct TransactionPool {
    group: TxGroup,
    size: usize,
    check_data: bool,
    txdb: Arc<dyn Bucket>,
    monitor: Arc<dyn Monitor>,
    log: Logger,
    state: Mutex<PoolState>,
}

impl TransactionPool {
    pub fn new(
        config: PoolConfig,
        txdb: Arc<dyn Bucket>,
        monitor: Arc<dyn Monitor>,
    ) -> TransactionPool {
        TransactionPool {
            group: config.group,
            size: config.size,
            check_data: config.check_data_on_pre_validate,
            txdb,
            monitor,
            log: Logger::new("txpool"),
            state: Mutex::new(PoolState {
                list: TxList::new(),
                txm: Arc::new(DummyTxWaiterManager),
                pcm: Arc::new(DummyPoolCapacityMonitor),
            }),
        }
    }

    /// Admits a transaction.
    ///
    /// Returns [`PoolError::PoolOverflow`] when the pool is full and
    /// [`PoolError::DuplicateTransaction`] when the id is already staged;
    /// neither mutates the pool.
    pub fn add(&self, tx: Arc<Transaction>, direct: bool) -> Result<(), PoolError> {
        let byte_len = tx.byte_len();
        let state = &mut *self.state.lock().unwrap();
        if state.list.len() >= self.size {
            return Err(PoolError::PoolOverflow);
        }
        state.list.add(tx, direct)?;
        self.monitor.on_add_tx(byte_len, direct);
        state
            .pcm
            .on_pool_capacity_updated(self.group, self.size, state.list.len());
        Ok(())
    }

    /// Drops every transaction whose timestamp is at or before `bts`.
    ///
    /// The list is insertion-ordered, not timestamp-ordered, so the scan
    /// cannot stop early. Each dropped entry gets a sticky expiry error if
    /// none was recorded before, and the waiter is notified once.
    pub fn remove_old_txs(&self, bts: i64) {
        let state = &mut *self.state.lock().unwrap();

        let stale: Vec<usize> = state
            .list
            .iter()
            .filter(|(_, entry)| entry.tx.timestamp() <= bts)
            .map(|(slot, _)| slot)
            .collect();

        for slot in stale {
            if let Some(entry) = state.list.entry_mut(slot) {
                if entry.err.is_none() {
                    entry.err = Some(TxError::ExpiredTransaction {
                        diff_us: bts - entry.tx.timestamp(),
                    });
                }
            }
            if let Some(entry) = state.list.remove_slot(slot) {
                let id = entry.tx.id();
                let direct = entry.insertion_ts != 0;
                if let Some(err) = &entry.err {
                    self.log.debug(&format!("DROP TX: id={id} reason={err}"));
                    state.txm.on_tx_drop(id, err);
                }
                self.monitor.on_drop_tx(entry.tx.byte_len(), direct);
            }
        }

        state
            .pcm
            .on_pool_capacity_updated(self.group, self.size, state.list.len());
    }

    /// Selects an ordered candidate set for the next block.
    ///
    /// `None` budgets fall back to [`CONFIG_MAX_TX_BYTES_IN_A_BLOCK`] and
    /// [`CONFIG_MAX_TX_COUNT`]. Selection walks the list front to back under
    /// the lock; pre-validation (including the cumulative balance overlay)
    /// runs unlocked afterwards. Entries found expired or invalid are handed
    /// to a background remover.
    pub fn candidate(
        self: &Arc<Self>,
        wc: &dyn WorldContext,
        max_bytes: Option<usize>,
        max_count: Option<usize>,
    ) -> (Vec<Arc<Transaction>>, usize) {
        let started = Instant::now();
        let max_bytes = max_bytes.unwrap_or(CONFIG_MAX_TX_BYTES_IN_A_BLOCK);
        let max_count = max_count.unwrap_or(CONFIG_MAX_TX_COUNT);

        let tsr = TxTimestampRange::new(wc, self.group);
        let mut selected: Vec<(Hash, u64, Arc<Transaction>)> =
            Vec::with_capacity(DEFAULT_TX_SLICE_CAPACITY);
        let mut expired: Vec<(Hash, u64)> = Vec::with_capacity(DEFAULT_TX_SLICE_CAPACITY);
        let pool_size;

        {
            let state = &mut *self.state.lock().unwrap();
            pool_size = state.list.len();
            if pool_size == 0 {
                return (Vec::new(), 0);
            }

            let mut total = 0usize;
            let mut stale_slots: Vec<usize> = Vec::new();
            for (slot, entry) in state.list.iter() {
                if total >= max_bytes || selected.len() >= max_count {
                    break;
                }
                match tsr.check_tx(&entry.tx) {
                    Ok(()) => {}
                    Err(err) if err.is_expired() => {
                        stale_slots.push(slot);
                        continue;
                    }
                    // Future transactions stay untouched for a later block.
                    Err(_) => continue,
                }
                let byte_len = entry.tx.byte_len();
                if total + byte_len > max_bytes {
                    break;
                }
                total += byte_len;
                selected.push((entry.tx.id(), entry.seq, entry.tx.clone()));
            }

            for slot in stale_slots {
                if let Some(entry) = state.list.entry_mut(slot) {
                    if entry.err.is_none() {
                        entry.err = tsr.check_tx(&entry.tx).err();
                    }
                    expired.push((entry.tx.id(), entry.seq));
                }
            }
        }

        let mut valid: Vec<Arc<Transaction>> = Vec::with_capacity(selected.len());
        let mut invalid: Vec<(Hash, u64, TxError)> = Vec::new();
        let mut total = 0usize;
        for (id, seq, tx) in selected {
            if self.txdb.get(id.as_slice()).is_some() {
                invalid.push((id, seq, TxError::AlreadyProcessed));
                continue;
            }
            match tx.pre_validate(wc, true, self.check_data) {
                Ok(()) => {
                    total += tx.byte_len();
                    valid.push(tx);
                }
                Err(err) => {
                    self.log
                        .debug(&format!("PREVALIDATE FAIL: id={id} reason={err}"));
                    if !err.is_transient() {
                        invalid.push((id, seq, err));
                    }
                }
            }
        }

        let mut to_remove: Vec<(Hash, u64, Option<TxError>)> = invalid
            .into_iter()
            .map(|(id, seq, err)| (id, seq, Some(err)))
            .collect();
        to_remove.extend(expired.into_iter().map(|(id, seq)| (id, seq, None)));
        let removed = to_remove.len();
        if removed > 0 {
            let pool = Arc::clone(self);
            thread::spawn(move || pool.remove_transactions(to_remove));
        }

        self.log.info(&format!(
            "candidate collected={} removed={} poolsize={} duration={:?}",
            valid.len(),
            removed,
            pool_size,
            started.elapsed()
        ));
        (valid, total)
    }

    /// True if the pool holds at least one transaction fresh enough to be
    /// worth building a block for.
    pub fn check_txs(&self, wc: &dyn WorldContext) -> bool {
        let state = self.state.lock().unwrap();
        if state.list.is_empty() {
            return false;
        }
        let horizon = wc.block_timestamp() - wc.tx_timestamp_threshold(self.group);
        state
            .list
            .iter()
            .any(|(_, entry)| entry.tx.timestamp() > horizon)
    }

    /// Removes finalized transactions and reports the average commit latency
    /// of the directly submitted ones.
    pub fn remove_list(&self, finalized: &[Arc<Transaction>]) {
        let state = &mut *self.state.lock().unwrap();
        if state.list.is_empty() {
            return;
        }

        let now = state.list.now_nanos();
        let at = SystemTime::now();
        let mut latency_total = 0u64;
        let mut direct_count = 0u64;

        for tx in finalized {
            if let Some(entry) = state.list.remove_tx(&tx.id()) {
                let direct = entry.insertion_ts != 0;
                if direct {
                    latency_total += now.saturating_sub(entry.insertion_ts);
                    direct_count += 1;
                }
                self.monitor.on_remove_tx(entry.tx.byte_len(), direct);
            }
        }

        if direct_count > 0 {
            state
                .pcm
                .on_pool_capacity_updated(self.group, self.size, state.list.len());
            let avg = Duration::from_nanos(latency_total / direct_count);
            self.monitor.on_commit(tx_list_hash(finalized), at, avg);
        }
    }

    pub fn has_tx(&self, id: &Hash) -> bool {
        self.state.lock().unwrap().list.has_tx(id)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn used(&self) -> usize {
        self.state.lock().unwrap().list.len()
    }

    pub fn set_tx_manager(&self, txm: Arc<dyn TxWaiterManager>) {
        self.state.lock().unwrap().txm = txm;
    }

    /// Registers the capacity monitor and pushes the first snapshot from a
    /// fresh thread, so a caller holding its own lock is never re-entered.
    pub fn set_pool_capacity_monitor(&self, pcm: Arc<dyn PoolCapacityMonitor>) {
        let used;
        {
            let state = &mut *self.state.lock().unwrap();
            state.pcm = pcm.clone();
            used = state.list.len();
        }
        let (group, size) = (self.group, self.size);
        thread::spawn(move || pcm.on_pool_capacity_updated(group, size, used));
    }

    /// Union bloom filter over every staged transaction id.
    pub fn get_bloom(&self) -> TxBloom {
        self.state.lock().unwrap().list.bloom()
    }

    /// Returns up to `max` staged transactions whose ids the peer's filter
    /// does not contain.
    ///
    /// Whole bloom segments already covered by the peer's filter are skipped
    /// without per-entry checks. Staged transactions found in the finalized
    /// index along the way are scheduled for removal.
    pub fn filter_transactions(
        self: &Arc<Self>,
        bloom: &TxBloom,
        max: usize,
    ) -> Vec<Arc<Transaction>> {
        let mut txs = Vec::with_capacity(max.min(DEFAULT_TX_SLICE_CAPACITY));
        let mut invalid: Vec<(Hash, u64, Option<TxError>)> = Vec::new();

        {
            let state = self.state.lock().unwrap();
            let mut working: Option<usize> = None;
            let mut skip: Option<usize> = None;
            for (_, entry) in state.list.iter() {
                if txs.len() >= max {
                    break;
                }
                if working != Some(entry.segment) {
                    if skip == Some(entry.segment) {
                        continue;
                    }
                    if bloom.contains_all_of(state.list.segment_bloom(entry.segment)) {
                        skip = Some(entry.segment);
                        continue;
                    }
                    working = Some(entry.segment);
                }
                let id = entry.tx.id();
                if !bloom.contains(&id) {
                    if self.txdb.get(id.as_slice()).is_some() {
                        invalid.push((id, entry.seq, Some(TxError::AlreadyProcessed)));
                        continue;
                    }
                    txs.push(entry.tx.clone());
                }
            }
        }

        if !invalid.is_empty() {
            let pool = Arc::clone(self);
            thread::spawn(move || pool.remove_transactions(invalid));
        }
        txs
    }

    /// Background removal of entries invalidated during an unlocked phase.
    ///
    /// Each item re-resolves through `(id, seq)`; entries that were already
    /// removed or re-added in the meantime are skipped.
    fn remove_transactions(&self, items: Vec<(Hash, u64, Option<TxError>)>) {
        let state = &mut *self.state.lock().unwrap();
        for (id, seq, err) in items {
            let Some(slot) = state.list.slot_for(&id, seq) else {
                continue;
            };
            if let Some(entry) = state.list.entry_mut(slot) {
                if entry.err.is_none() {
                    entry.err = err;
                }
            }
            let Some(entry) = state.list.remove_slot(slot) else {
                continue;
            };
            let direct = entry.insertion_ts != 0;
            match &entry.err {
                Some(err) => {
                    self.log.debug(&format!("DROP TX: id={id} reason={err}"));
                    state.txm.on_tx_drop(id, err);
                }
                None => self.log.error(&format!("no drop reason for tx id={id}")),
            }
            self.monitor.on_drop_tx(entry.tx.byte_len(), direct);
        }
    }
}

/// Identity hash of a finalized transaction list, for commit reporting.
fn tx_list_hash(txs: &[Arc<Transaction>]) -> Hash {
    let mut h = Hash::sha3();
    h.update(b"TX_LIST");
    for tx in txs {
        h.update(tx.id().as_slice());
    }
    h.finalize()
}
