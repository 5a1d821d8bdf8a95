use containers::{BlockNumber, TxHash};
use metrics::SharedMetrics;
use networking::sync::{P2pClientState, SyncObserver, TracingObserver};
use tokio::task::JoinError;

/// Records client events in Prometheus metrics, then logs them.
pub struct MetricsObserver {
    metrics: SharedMetrics,
    logger: TracingObserver,
}

impl MetricsObserver {
    pub fn new(metrics: SharedMetrics) -> Self {
        Self {
            metrics,
            logger: TracingObserver,
        }
    }
}

impl SyncObserver for MetricsObserver {
    fn state_changed(&self, from: P2pClientState, to: P2pClientState) {
        self.metrics.set_client_state(to.as_str());
        self.logger.state_changed(from, to);
    }

    fn invalid_transition(&self, from: P2pClientState, to: P2pClientState) {
        self.logger.invalid_transition(from, to);
    }

    fn sync_started(&self, from: BlockNumber, target: BlockNumber) {
        self.logger.sync_started(from, target);
    }

    fn blocks_reconciled(
        &self,
        synced_to: BlockNumber,
        blocks: usize,
        settled: usize,
        removed: usize,
    ) {
        self.metrics.set_synced_block(synced_to as i64);
        self.metrics.inc_blocks_reconciled(blocks as u64);
        self.metrics.inc_txs_settled(settled as u64);
        self.metrics.inc_txs_removed(removed as u64);
        self.logger.blocks_reconciled(synced_to, blocks, settled, removed);
    }

    fn tx_admitted(&self, tx_hash: TxHash) {
        self.metrics.inc_txs_admitted();
        self.logger.tx_admitted(tx_hash);
    }

    fn propagation_failed(&self, tx_hash: TxHash, error: &anyhow::Error) {
        self.metrics.inc_tx_propagation_failures();
        self.logger.propagation_failed(tx_hash, error);
    }

    fn network_service_failed(&self, action: &'static str, error: &anyhow::Error) {
        self.metrics.inc_p2p_service_failures();
        self.logger.network_service_failed(action, error);
    }

    fn reconciliation_loop_failed(&self, error: &JoinError) {
        self.logger.reconciliation_loop_failed(error);
    }
}
