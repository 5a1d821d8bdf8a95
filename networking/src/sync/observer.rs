/// Observation hooks for the p2p client.
///
/// The client reports what it does through a `SyncObserver` instead of
/// logging inline, so the state machine can be tested without a subscriber
/// and metrics can be attached without touching it.
use containers::{BlockNumber, TxHash};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use super::states::P2pClientState;

pub trait SyncObserver: Send + Sync + 'static {
    fn state_changed(&self, _from: P2pClientState, _to: P2pClientState) {}

    fn invalid_transition(&self, _from: P2pClientState, _to: P2pClientState) {}

    /// Catch-up began; blocks `from..=target` will be reconciled.
    fn sync_started(&self, _from: BlockNumber, _target: BlockNumber) {}

    /// A batch of blocks was reconciled against the pool.
    fn blocks_reconciled(
        &self,
        _synced_to: BlockNumber,
        _blocks: usize,
        _settled: usize,
        _removed: usize,
    ) {
    }

    fn tx_admitted(&self, _tx_hash: TxHash) {}

    fn propagation_failed(&self, _tx_hash: TxHash, _error: &anyhow::Error) {}

    /// The p2p service failed to start or stop.
    fn network_service_failed(&self, _action: &'static str, _error: &anyhow::Error) {}

    /// The reconciliation loop panicked or was cancelled; reported by `stop()`.
    fn reconciliation_loop_failed(&self, _error: &JoinError) {}
}

/// Observer that turns client events into `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn state_changed(&self, from: P2pClientState, to: P2pClientState) {
        info!(from = %from, to = %to, "Moved to state {to}");
    }

    fn invalid_transition(&self, from: P2pClientState, to: P2pClientState) {
        warn!(from = %from, to = %to, "Invalid state transition attempted");
    }

    fn sync_started(&self, from: BlockNumber, target: BlockNumber) {
        info!(from, target, "Starting sync");
    }

    fn blocks_reconciled(
        &self,
        synced_to: BlockNumber,
        blocks: usize,
        settled: usize,
        removed: usize,
    ) {
        debug!(synced_to, blocks, settled, removed, "Synched to block {synced_to}");
    }

    fn tx_admitted(&self, tx_hash: TxHash) {
        debug!(tx = %tx_hash, "Added tx to pool");
    }

    fn propagation_failed(&self, tx_hash: TxHash, error: &anyhow::Error) {
        warn!(tx = %tx_hash, "Failed to propagate tx: {error:#}");
    }

    fn network_service_failed(&self, action: &'static str, error: &anyhow::Error) {
        error!(action, "P2p service failure: {error:#}");
    }

    fn reconciliation_loop_failed(&self, error: &JoinError) {
        error!("Block reconciliation loop failed: {error}");
    }
}
