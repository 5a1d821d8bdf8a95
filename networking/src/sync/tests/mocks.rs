use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use containers::{BlockNumber, L2Block, Tx, TxHash};
use parking_lot::Mutex;
use tokio::task::JoinError;

use crate::block_source::{InMemoryBlockSource, L2BlockSource};
use crate::service::P2pService;
use crate::sync::{P2pClientState, SyncObserver};

/// Block source whose reported height is set independently of the blocks it serves.
///
/// Lets a test announce a target height at start and release the blocks up
/// to it one batch at a time.
#[derive(Default)]
pub struct MockBlockSource {
    pub chain: InMemoryBlockSource,
    announced_height: AtomicU64,
    fail_height: AtomicBool,
    hang_height: AtomicBool,
    pub height_calls: AtomicUsize,
}

impl MockBlockSource {
    pub fn new(announced_height: BlockNumber) -> Self {
        let source = Self::default();
        source.announce(announced_height);
        source
    }

    pub fn announce(&self, height: BlockNumber) {
        self.announced_height.store(height, Ordering::SeqCst);
    }

    pub fn release(&self, blocks: impl IntoIterator<Item = L2Block>) {
        self.chain.add_blocks(blocks).unwrap();
    }

    pub fn release_empty(&self, numbers: std::ops::RangeInclusive<BlockNumber>) {
        self.release(numbers.map(L2Block::empty));
    }

    pub fn set_fail_height(&self, fail: bool) {
        self.fail_height.store(fail, Ordering::SeqCst);
    }

    /// Make `block_height()` never answer.
    pub fn set_hang_height(&self, hang: bool) {
        self.hang_height.store(hang, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl L2BlockSource for MockBlockSource {
    async fn block_height(&self) -> Result<BlockNumber> {
        self.height_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_height.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_height.load(Ordering::SeqCst) {
            bail!("archiver unreachable");
        }
        Ok(self.announced_height.load(Ordering::SeqCst))
    }

    async fn get_blocks(&self, from: BlockNumber, limit: usize) -> Result<Vec<L2Block>> {
        self.chain.get_blocks(from, limit).await
    }
}

/// P2p service that records every call.
#[derive(Default)]
pub struct MockP2pService {
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub propagated: Mutex<Vec<TxHash>>,
    pub settled: Mutex<Vec<Vec<TxHash>>>,
    pub settle_attempts: AtomicUsize,
    fail_start: AtomicBool,
    hang_start: AtomicBool,
    fail_propagate: AtomicBool,
    panic_on_settle: AtomicBool,
}

impl MockP2pService {
    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Make `start()` never answer.
    pub fn set_hang_start(&self, hang: bool) {
        self.hang_start.store(hang, Ordering::SeqCst);
    }

    pub fn set_fail_propagate(&self, fail: bool) {
        self.fail_propagate.store(fail, Ordering::SeqCst);
    }

    pub fn set_panic_on_settle(&self, panic: bool) {
        self.panic_on_settle.store(panic, Ordering::SeqCst);
    }

    pub fn starts(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// How many settle notifications mentioned `tx_hash`.
    pub fn settle_count(&self, tx_hash: &TxHash) -> usize {
        self.settled
            .lock()
            .iter()
            .filter(|hashes| hashes.contains(tx_hash))
            .count()
    }
}

#[async_trait::async_trait]
impl P2pService for MockP2pService {
    async fn start(&self) -> Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_start.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_start.load(Ordering::SeqCst) {
            bail!("bind failed");
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn propagate_tx(&self, tx: &Tx) -> Result<()> {
        if self.fail_propagate.load(Ordering::SeqCst) {
            bail!("no peers");
        }
        self.propagated.lock().push(tx.hash());
        Ok(())
    }

    fn settled_txs(&self, tx_hashes: &[TxHash]) {
        self.settle_attempts.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_settle.load(Ordering::SeqCst) {
            panic!("settle handler crashed");
        }
        self.settled.lock().push(tx_hashes.to_vec());
    }
}

/// Observer that keeps what it was told.
#[derive(Default)]
pub struct RecordingObserver {
    pub transitions: Mutex<Vec<(P2pClientState, P2pClientState)>>,
    pub invalid_transitions: Mutex<Vec<(P2pClientState, P2pClientState)>>,
    pub synced_heights: Mutex<Vec<BlockNumber>>,
    pub sync_starts: Mutex<Vec<(BlockNumber, BlockNumber)>>,
    pub propagation_failures: Mutex<Vec<TxHash>>,
    pub network_failures: Mutex<Vec<&'static str>>,
    pub loop_failures: Mutex<Vec<String>>,
}

impl SyncObserver for RecordingObserver {
    fn state_changed(&self, from: P2pClientState, to: P2pClientState) {
        self.transitions.lock().push((from, to));
    }

    fn invalid_transition(&self, from: P2pClientState, to: P2pClientState) {
        self.invalid_transitions.lock().push((from, to));
    }

    fn sync_started(&self, from: BlockNumber, target: BlockNumber) {
        self.sync_starts.lock().push((from, target));
    }

    fn blocks_reconciled(
        &self,
        synced_to: BlockNumber,
        _blocks: usize,
        _settled: usize,
        _removed: usize,
    ) {
        self.synced_heights.lock().push(synced_to);
    }

    fn propagation_failed(&self, tx_hash: TxHash, _error: &anyhow::Error) {
        self.propagation_failures.lock().push(tx_hash);
    }

    fn network_service_failed(&self, action: &'static str, _error: &anyhow::Error) {
        self.network_failures.lock().push(action);
    }

    fn reconciliation_loop_failed(&self, error: &JoinError) {
        self.loop_failures.lock().push(error.to_string());
    }
}

/// Poll `condition` until it holds, panicking after two seconds.
pub async fn wait_for(description: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {description}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
