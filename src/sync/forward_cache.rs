//! Forward prefetch cache for blockchain catch-up.
//!
//! Wraps a blocking remote [`Store`] and overlaps it with the consumer's
//! sequential access: returning block `N` schedules blocks `N+1..` up to the
//! configured depth plus a receipt fetch for every normal transaction of
//! `N`, all executed by a bounded worker pool behind a TPS regulator.
//!
//! Coordination invariants:
//!
//! - the pending maps are the dedup mechanism: at most one task exists per
//!   height or receipt id, and scheduling is idempotent under the lock
//! - only a consumer removes a task from its map, so results are delivered
//!   exactly once; workers just complete the task's channel
//! - workers never hold the cache lock while calling the store or the
//!   regulator, and exit when the queue drains
//!
//! Task channels have capacity one, so a worker completing an abandoned
//! task never blocks; the buffered result is bounded leakage.

use crate::core::block::Block;
use crate::core::receipt::Receipt;
use crate::sync::tps::TpsRegulator;
use crate::types::hash::Hash;
use crate::utils::log::Logger;
use chaincore_derive::Error;
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Attempts per fetch before the last error surfaces to the caller.
pub const MAX_TRIALS: usize = 5;

/// Pause between retry attempts.
pub const DELAY_BEFORE_RETRY: Duration = Duration::from_millis(500);

/// Errors surfaced by the remote store and, after retries, by the cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The requested block or receipt does not exist on the remote.
    #[error("not found")]
    NotFound,
    /// Transport or server failure; retried up to [`MAX_TRIALS`] times.
    #[error("store failure: {0}")]
    Store(String),
}

/// Blocking remote block store.
///
/// Shared by every worker, so implementations must be thread-safe. Calls
/// may fail transiently; the cache retries.
pub trait Store: Send + Sync {
    fn get_block_by_height(&self, height: i64) -> Result<Arc<Block>, FetchError>;
    fn get_receipt(&self, id: &Hash) -> Result<Receipt, FetchError>;
}

/// Prefetcher tuning knobs.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Upper bound on concurrently running fetch workers.
    pub max_workers: usize,
    /// Target number of pending block fetches ahead of the consumer.
    pub max_blocks: usize,
    /// Outbound fetch rate limit; 0 disables it.
    pub max_tps: i32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_workers: 8,
            max_blocks: 32,
            max_tps: 0,
        }
    }
}

enum Work {
    Block {
        height: i64,
        sender: SyncSender<Result<Arc<Block>, FetchError>>,
    },
    Receipt {
        id: Hash,
        sender: SyncSender<Result<Receipt, FetchError>>,
    },
}

struct CacheState {
    queue: VecDeque<Work>,
    block_info: HashMap<i64, Receiver<Result<Arc<Block>, FetchError>>>,
    receipt_info: HashMap<Hash, Receiver<Result<Receipt, FetchError>>>,
    workers: usize,
}

/// Bounded concurrent prefetcher over a remote block store.
pub struct ForwardCache<S: Store + 'static> {
    store: S,
    config: CacheConfig,
    regulator: TpsRegulator,
    log: Logger,
    state: Mutex<CacheState>,
}

impl<S: Store + 'static> ForwardCache<S> {
    pub fn new(store: S, config: CacheConfig) -> ForwardCache<S> {
        let regulator = TpsRegulator::new(config.max_tps);
        ForwardCache {
            store,
            config,
            regulator,
            log: Logger::new("fwdcache"),
            state: Mutex::new(CacheState {
                queue: VecDeque::new(),
                block_info: HashMap::new(),
                receipt_info: HashMap::new(),
                workers: 0,
            }),
        }
    }

    /// Fetches the block at `height`, blocking until it is available.
    ///
    /// A pending prefetch task for the height is consumed instead of issuing
    /// a new store call; otherwise the fetch runs on the caller's thread.
    /// Either way, returning a block schedules its followings.
    pub fn get_block_by_height(self: &Arc<Self>, height: i64) -> Result<Arc<Block>, FetchError> {
        if let Some(task) = self.detach_block_task(height) {
            if let Ok(result) = task.recv() {
                if let Ok(block) = &result {
                    self.schedule_followings(block);
                }
                return result;
            }
            // The worker died before completing the task; fetch directly.
        }
        self.do_get_block_by_height(height)
    }

    /// Fetches the receipt for transaction `id`, blocking.
    pub fn get_receipt(self: &Arc<Self>, id: &Hash) -> Result<Receipt, FetchError> {
        if let Some(task) = self.detach_receipt_task(id) {
            if let Ok(result) = task.recv() {
                return result;
            }
        }
        self.do_get_receipt(id)
    }

    /// Current outbound fetch rate.
    pub fn get_tps(&self) -> f32 {
        self.regulator.get_tps()
    }

    fn detach_block_task(
        &self,
        height: i64,
    ) -> Option<Receiver<Result<Arc<Block>, FetchError>>> {
        self.state.lock().unwrap().block_info.remove(&height)
    }

    fn detach_receipt_task(&self, id: &Hash) -> Option<Receiver<Result<Receipt, FetchError>>> {
        self.state.lock().unwrap().receipt_info.remove(id)
    }

    fn do_get_block_by_height(self: &Arc<Self>, height: i64) -> Result<Arc<Block>, FetchError> {
        self.regulator.wait();
        self.log.trace(&format!("BLOCK start height={height}"));
        let mut trial = 0;
        loop {
            match self.store.get_block_by_height(height) {
                Ok(block) => {
                    self.log.trace(&format!("BLOCK done height={height}"));
                    self.schedule_followings(&block);
                    return Ok(block);
                }
                Err(err) => {
                    trial += 1;
                    if trial >= MAX_TRIALS {
                        self.log.trace(&format!("BLOCK failed height={height}"));
                        return Err(err);
                    }
                    self.log.debug(&format!(
                        "BLOCK retry height={height} trial={trial} err={err}"
                    ));
                    thread::sleep(DELAY_BEFORE_RETRY);
                }
            }
        }
    }

    fn do_get_receipt(self: &Arc<Self>, id: &Hash) -> Result<Receipt, FetchError> {
        self.regulator.wait();
        self.log.trace(&format!("RECEIPT start id={id}"));
        let mut trial = 0;
        loop {
            match self.store.get_receipt(id) {
                Ok(receipt) => {
                    self.log.trace(&format!("RECEIPT done id={id}"));
                    return Ok(receipt);
                }
                Err(err) => {
                    trial += 1;
                    if trial >= MAX_TRIALS {
                        self.log.trace(&format!("RECEIPT failed id={id}"));
                        return Err(err);
                    }
                    self.log
                        .debug(&format!("RECEIPT retry id={id} trial={trial} err={err}"));
                    thread::sleep(DELAY_BEFORE_RETRY);
                }
            }
        }
    }

    /// Schedules the receipts of `block` and the next heights up to the
    /// prefetch depth. Idempotent per key.
    fn schedule_followings(self: &Arc<Self>, block: &Block) {
        let state = &mut *self.state.lock().unwrap();
        for tx in block.normal_transactions() {
            self.schedule_receipt_in_lock(state, tx.id());
        }
        let mut height = block.height() + 1;
        while state.block_info.len() < self.config.max_blocks {
            self.schedule_block_in_lock(state, height);
            height += 1;
        }
    }

    fn schedule_block_in_lock(self: &Arc<Self>, state: &mut CacheState, height: i64) {
        if state.block_info.contains_key(&height) {
            return;
        }
        self.log.trace(&format!("BLOCK schedule height={height}"));
        let (sender, receiver) = sync_channel(1);
        state.queue.push_back(Work::Block { height, sender });
        state.block_info.insert(height, receiver);
        self.add_worker_in_lock(state);
    }

    fn schedule_receipt_in_lock(self: &Arc<Self>, state: &mut CacheState, id: Hash) {
        if state.receipt_info.contains_key(&id) {
            return;
        }
        self.log.trace(&format!("RECEIPT schedule id={id}"));
        let (sender, receiver) = sync_channel(1);
        state.queue.push_back(Work::Receipt { id, sender });
        state.receipt_info.insert(id, receiver);
        self.add_worker_in_lock(state);
    }

    fn add_worker_in_lock(self: &Arc<Self>, state: &mut CacheState) {
        if state.workers < self.config.max_workers {
            state.workers += 1;
            let cache = Arc::clone(self);
            thread::spawn(move || cache.work_loop());
        }
    }

    /// Drains queued tasks; exits (and gives its slot back) when the queue
    /// is empty. The lock is never held across a fetch.
    fn work_loop(self: Arc<Self>) {
        loop {
            let work = {
                let state = &mut *self.state.lock().unwrap();
                match state.queue.pop_front() {
                    Some(work) => work,
                    None => {
                        state.workers -= 1;
                        return;
                    }
                }
            };
            match work {
                Work::Block { height, sender } => {
                    let _ = sender.send(self.do_get_block_by_height(height));
                }
                Work::Receipt { id, sender } => {
                    let _ = sender.send(self.do_get_receipt(&id));
                }
            }
        }
    }
}
