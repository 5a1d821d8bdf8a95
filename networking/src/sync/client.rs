/// P2p client coordinating block sync and the transaction pool.
///
/// The P2pClient is the entry point used by transaction submission and block
/// production. It coordinates:
/// - L2BlockDownloader: fetching confirmed blocks in order
/// - TxPool: pending transactions, reconciled against every confirmed block
/// - P2pService: gossip lifecycle, tx propagation, settle notifications
/// - State machine: IDLE -> SYNCHING -> RUNNING -> STOPPED
use std::sync::Arc;
use std::time::Duration;

use containers::{BlockNumber, L2Block, Tx, TxHash};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    config::P2pConfig,
    downloader::L2BlockDownloader,
    observer::{SyncObserver, TracingObserver},
    states::{P2pClientState, P2pSyncState},
};
use crate::{block_source::L2BlockSource, error::P2pError, service::P2pService, tx_pool::TxPool};

/// Completion handle returned by `begin_sync()`.
///
/// Resolves once the client reaches RUNNING. Every clone observes the same
/// outcome, so concurrent `start()` callers share a single sync attempt.
pub type SyncHandle = Shared<BoxFuture<'static, Result<(), P2pError>>>;

type SyncSignal = oneshot::Sender<Result<(), P2pError>>;

fn completed_handle() -> SyncHandle {
    futures::future::ready(Ok(())).boxed().shared()
}

fn pending_handle() -> (SyncSignal, SyncHandle) {
    let (signal, receiver) = oneshot::channel();
    let handle = receiver
        .map(|result| result.unwrap_or(Err(P2pError::SyncAborted)))
        .boxed()
        .shared();
    (signal, handle)
}

/// State shared between API calls and the reconciliation loop.
///
/// Guarded by one mutex that is never held across an await point.
struct SyncShared<P: TxPool> {
    state: P2pClientState,
    synced_block_number: BlockNumber,
    latest_block_number_at_start: BlockNumber,
    tx_pool: P,
    sync_handle: SyncHandle,
    sync_signal: Option<SyncSignal>,
}

impl<P: TxPool> SyncShared<P> {
    fn transition(&mut self, to: P2pClientState, observer: &dyn SyncObserver) -> bool {
        if !self.state.can_transition_to(to) {
            observer.invalid_transition(self.state, to);
            return false;
        }
        let from = std::mem::replace(&mut self.state, to);
        observer.state_changed(from, to);
        true
    }
}

struct Inner<S: L2BlockSource, P: TxPool, N: P2pService> {
    block_source: Arc<S>,
    p2p_service: Arc<N>,
    block_downloader: L2BlockDownloader<S>,
    shared: Mutex<SyncShared<P>>,
    /// Cancelled as soon as `stop()` is called, before it takes the lifecycle lock.
    shutdown: CancellationToken,
    /// How often a failed p2p service start is retried once caught up.
    retry_interval: Duration,
    /// Serializes start and stop; holds the reconciliation loop once spawned.
    lifecycle: AsyncMutex<Option<JoinHandle<()>>>,
    observer: Arc<dyn SyncObserver>,
}

/// P2p client.
///
/// Cheap to clone; clones share the same pool and state machine.
pub struct P2pClient<S: L2BlockSource, P: TxPool, N: P2pService> {
    inner: Arc<Inner<S, P, N>>,
}

impl<S: L2BlockSource, P: TxPool, N: P2pService> Clone for P2pClient<S, P, N> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: L2BlockSource, P: TxPool, N: P2pService> P2pClient<S, P, N> {
    pub fn new(block_source: Arc<S>, tx_pool: P, p2p_service: Arc<N>, config: &P2pConfig) -> Self {
        Self::new_with_observer(
            block_source,
            tx_pool,
            p2p_service,
            config,
            Arc::new(TracingObserver),
        )
    }

    pub fn new_with_observer(
        block_source: Arc<S>,
        tx_pool: P,
        p2p_service: Arc<N>,
        config: &P2pConfig,
        observer: Arc<dyn SyncObserver>,
    ) -> Self {
        let block_downloader = L2BlockDownloader::from_config(block_source.clone(), config);

        Self {
            inner: Arc::new(Inner {
                block_source,
                p2p_service,
                block_downloader,
                shared: Mutex::new(SyncShared {
                    state: P2pClientState::default(),
                    synced_block_number: 0,
                    latest_block_number_at_start: 0,
                    tx_pool,
                    sync_handle: completed_handle(),
                    sync_signal: None,
                }),
                shutdown: CancellationToken::new(),
                retry_interval: config.check_interval,
                lifecycle: AsyncMutex::new(None),
                observer,
            }),
        }
    }

    /// Start the client and wait until it has caught up with the chain.
    pub async fn start(&self) -> Result<(), P2pError> {
        self.begin_sync().await?.await
    }

    /// Start the client without waiting for the catch-up to finish.
    ///
    /// Snapshots the chain height. If blocks are missing the client moves to
    /// SYNCHING and the returned handle resolves once they are reconciled;
    /// otherwise the p2p service is started, the client moves to RUNNING and
    /// the handle is already complete. Either way the reconciliation loop
    /// keeps following the chain afterwards.
    ///
    /// Calling it again while SYNCHING or RUNNING returns the existing handle.
    /// If the height query or the p2p service start fails the client stays
    /// IDLE and the call can be retried. A concurrent `stop()` interrupts
    /// both calls and makes this return `SyncAborted`.
    pub async fn begin_sync(&self) -> Result<SyncHandle, P2pError> {
        let inner = &self.inner;
        let mut running_loop = inner.lifecycle.lock().await;

        {
            let shared = inner.shared.lock();
            match shared.state {
                P2pClientState::Stopped => return Err(P2pError::IllegalState),
                P2pClientState::Idle => {}
                P2pClientState::Synching | P2pClientState::Running => {
                    return Ok(shared.sync_handle.clone());
                }
            }
        }

        if inner.is_stopping() {
            return Err(P2pError::SyncAborted);
        }

        let latest_block_number = tokio::select! {
            _ = inner.shutdown.cancelled() => return Err(P2pError::SyncAborted),
            height = inner.block_source.block_height() => height.map_err(P2pError::block_source)?,
        };
        let block_to_download_from = inner.shared.lock().synced_block_number + 1;

        let handle = if block_to_download_from <= latest_block_number {
            let (signal, handle) = pending_handle();
            {
                let mut shared = inner.shared.lock();
                shared.latest_block_number_at_start = latest_block_number;
                shared.transition(P2pClientState::Synching, inner.observer.as_ref());
                shared.sync_signal = Some(signal);
                shared.sync_handle = handle.clone();
            }
            inner
                .observer
                .sync_started(block_to_download_from, latest_block_number);
            handle
        } else {
            let started = tokio::select! {
                _ = inner.shutdown.cancelled() => return Err(P2pError::SyncAborted),
                started = inner.p2p_service.start() => started,
            };
            if let Err(err) = started {
                inner.observer.network_service_failed("start", &err);
                return Err(P2pError::network(err));
            }
            let mut shared = inner.shared.lock();
            shared.latest_block_number_at_start = latest_block_number;
            shared.transition(P2pClientState::Running, inner.observer.as_ref());
            shared.sync_handle = completed_handle();
            shared.sync_handle.clone()
        };

        inner.block_downloader.start(block_to_download_from);
        let loop_inner = inner.clone();
        *running_loop = Some(tokio::spawn(async move {
            loop_inner.run_block_loop().await;
        }));

        Ok(handle)
    }

    /// Stop the client.
    ///
    /// Stops the downloader, waits for the reconciliation loop to exit, then
    /// stops the p2p service and moves to STOPPED. Callers still waiting on
    /// a sync handle get `SyncAborted`. Safe to call repeatedly and
    /// concurrently; later calls return once the first one has finished.
    ///
    /// An in-flight `begin_sync()` is interrupted first, so a block source or
    /// p2p service that never answers cannot hold up shutdown.
    pub async fn stop(&self) {
        let inner = &self.inner;
        inner.shutdown.cancel();
        let mut running_loop = inner.lifecycle.lock().await;

        let state = inner.shared.lock().state;
        match state {
            P2pClientState::Stopped => return,
            P2pClientState::Idle => {}
            P2pClientState::Synching | P2pClientState::Running => {
                inner.block_downloader.stop().await;

                if let Some(handle) = running_loop.take() {
                    if let Err(err) = handle.await {
                        inner.observer.reconciliation_loop_failed(&err);
                    }
                }

                if let Err(err) = inner.p2p_service.stop().await {
                    inner.observer.network_service_failed("stop", &err);
                }
            }
        }

        let pending_signal = {
            let mut shared = inner.shared.lock();
            shared.transition(P2pClientState::Stopped, inner.observer.as_ref());
            shared.sync_signal.take()
        };
        drop(pending_signal);
    }

    /// Add a transaction to the pool and relay it to peers.
    ///
    /// Only pool admission is guaranteed; relay failures are reported to the
    /// observer and never returned.
    pub fn send_tx(&self, tx: Tx) -> Result<(), P2pError> {
        let inner = &self.inner;
        let tx_hash = tx.hash();

        {
            let mut shared = inner.shared.lock();
            if shared.state != P2pClientState::Running {
                return Err(P2pError::NotReady);
            }
            shared.tx_pool.add_txs(vec![tx.clone()]);
        }
        inner.observer.tx_admitted(tx_hash);

        if let Err(err) = inner.p2p_service.propagate_tx(&tx) {
            inner.observer.propagation_failed(tx_hash, &err);
        }
        Ok(())
    }

    /// Remove transactions from the pool. Unknown hashes are ignored.
    ///
    /// Not needed when transactions go through `send_tx`; reconciliation
    /// removes them once they are settled.
    pub fn delete_txs(&self, tx_hashes: &[TxHash]) -> Result<(), P2pError> {
        let mut shared = self.inner.shared.lock();
        if shared.state != P2pClientState::Running {
            return Err(P2pError::NotReady);
        }
        shared.tx_pool.delete_txs(tx_hashes);
        Ok(())
    }

    pub fn get_txs(&self) -> Vec<Tx> {
        self.inner.shared.lock().tx_pool.get_all_txs()
    }

    pub fn get_tx_by_hash(&self, tx_hash: &TxHash) -> Option<Tx> {
        self.inner.shared.lock().tx_pool.get_tx_by_hash(tx_hash)
    }

    /// Whether the client is synced and accepting transactions.
    pub fn is_ready(&self) -> bool {
        self.inner.shared.lock().state == P2pClientState::Running
    }

    pub fn synced_block_number(&self) -> BlockNumber {
        self.inner.shared.lock().synced_block_number
    }

    pub fn get_status(&self) -> P2pSyncState {
        let shared = self.inner.shared.lock();
        P2pSyncState {
            state: shared.state,
            synced_to_l2_block: shared.synced_block_number,
        }
    }
}

impl<S: L2BlockSource, P: TxPool, N: P2pService> Inner<S, P, N> {
    fn is_stopping(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Caught up, but the p2p service has not started yet.
    fn network_start_pending(&self) -> bool {
        let shared = self.shared.lock();
        shared.state == P2pClientState::Synching
            && shared.synced_block_number >= shared.latest_block_number_at_start
    }

    async fn run_block_loop(self: Arc<Self>) {
        while !self.is_stopping() {
            let blocks = if self.network_start_pending() {
                // A quiet chain yields no batches, so retry on a timer instead
                let next = self.block_downloader.next_batch();
                match tokio::time::timeout(self.retry_interval, next).await {
                    Ok(blocks) => blocks,
                    Err(_) => {
                        self.finish_sync().await;
                        continue;
                    }
                }
            } else {
                self.block_downloader.next_batch().await
            };
            if blocks.is_empty() {
                continue;
            }
            self.handle_l2_blocks(blocks).await;
        }
    }

    /// Reconcile a batch of confirmed blocks with the pool.
    ///
    /// The synced height only moves once every block of the batch has been
    /// removed from the pool and reported as settled.
    async fn handle_l2_blocks(&self, blocks: Vec<L2Block>) {
        let mut settled = 0;
        let mut removed = 0;

        for block in &blocks {
            let tx_hashes = block.tx_hashes();
            {
                let mut shared = self.shared.lock();
                if self.is_stopping() {
                    return;
                }
                removed += shared.tx_pool.delete_txs(&tx_hashes);
            }
            self.p2p_service.settled_txs(&tx_hashes);
            settled += tx_hashes.len();
        }

        let highest = blocks
            .iter()
            .map(|block| block.number)
            .max()
            .unwrap_or_default();

        let (synced_to, caught_up) = {
            let mut shared = self.shared.lock();
            shared.synced_block_number = shared.synced_block_number.max(highest);
            let caught_up = shared.state == P2pClientState::Synching
                && shared.synced_block_number >= shared.latest_block_number_at_start;
            (shared.synced_block_number, caught_up)
        };
        self.observer
            .blocks_reconciled(synced_to, blocks.len(), settled, removed);

        if caught_up {
            self.finish_sync().await;
        }
    }

    /// Start the p2p service and move from SYNCHING to RUNNING.
    ///
    /// If the p2p service fails to start, waiting callers get the error, the
    /// client stays SYNCHING and the start is retried after the next batch or
    /// after `retry_interval`, whichever comes first.
    async fn finish_sync(&self) {
        if self.is_stopping() {
            return;
        }

        let started = tokio::select! {
            _ = self.shutdown.cancelled() => return,
            started = self.p2p_service.start() => started,
        };

        match started {
            Ok(()) => {
                let signal = {
                    let mut shared = self.shared.lock();
                    if !shared.transition(P2pClientState::Running, self.observer.as_ref()) {
                        return;
                    }
                    shared.sync_handle = completed_handle();
                    shared.sync_signal.take()
                };
                if let Some(signal) = signal {
                    let _ = signal.send(Ok(()));
                }
            }
            Err(err) => {
                self.observer.network_service_failed("start", &err);
                let (next_signal, next_handle) = pending_handle();
                let signal = {
                    let mut shared = self.shared.lock();
                    shared.sync_handle = next_handle;
                    shared.sync_signal.replace(next_signal)
                };
                if let Some(signal) = signal {
                    let _ = signal.send(Err(P2pError::network(err)));
                }
            }
        }
    }
}
