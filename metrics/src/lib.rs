pub mod server;

use prometheus::{Encoder, IntCounter, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// State labels exported on `p2p_client_state`, in lifecycle order.
pub const CLIENT_STATES: [&str; 4] = ["idle", "synching", "running", "stopped"];

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    // Sync
    synced_block: IntGauge,
    client_state: IntGaugeVec,
    blocks_reconciled: IntCounter,
    // Tx pool
    txs_settled: IntCounter,
    txs_removed: IntCounter,
    txs_admitted: IntCounter,
    tx_propagation_failures: IntCounter,
    p2p_service_failures: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        // Sync
        let synced_block = IntGauge::with_opts(Opts::new(
            "p2p_synced_l2_block",
            "Highest L2 block reconciled into the tx pool",
        ))
        .unwrap();
        registry.register(Box::new(synced_block.clone())).unwrap();

        let client_state = IntGaugeVec::new(
            Opts::new("p2p_client_state", "Current p2p client state (1 for the active state)"),
            &["state"],
        )
        .unwrap();
        registry.register(Box::new(client_state.clone())).unwrap();

        let blocks_reconciled = IntCounter::with_opts(Opts::new(
            "p2p_blocks_reconciled_total",
            "Total number of L2 blocks reconciled",
        ))
        .unwrap();
        registry.register(Box::new(blocks_reconciled.clone())).unwrap();

        // Tx pool
        let txs_settled = IntCounter::with_opts(Opts::new(
            "p2p_txs_settled_total",
            "Total number of txs seen in confirmed blocks",
        ))
        .unwrap();
        registry.register(Box::new(txs_settled.clone())).unwrap();

        let txs_removed = IntCounter::with_opts(Opts::new(
            "p2p_tx_pool_removed_total",
            "Total number of pending txs removed after settling",
        ))
        .unwrap();
        registry.register(Box::new(txs_removed.clone())).unwrap();

        let txs_admitted = IntCounter::with_opts(Opts::new(
            "p2p_tx_pool_admitted_total",
            "Total number of txs admitted to the pool",
        ))
        .unwrap();
        registry.register(Box::new(txs_admitted.clone())).unwrap();

        let tx_propagation_failures = IntCounter::with_opts(Opts::new(
            "p2p_tx_propagation_failures_total",
            "Total number of failed tx propagations",
        ))
        .unwrap();
        registry.register(Box::new(tx_propagation_failures.clone())).unwrap();

        let p2p_service_failures = IntCounter::with_opts(Opts::new(
            "p2p_service_failures_total",
            "Total number of p2p service start/stop failures",
        ))
        .unwrap();
        registry.register(Box::new(p2p_service_failures.clone())).unwrap();

        let metrics = Self {
            registry,
            synced_block,
            client_state,
            blocks_reconciled,
            txs_settled,
            txs_removed,
            txs_admitted,
            tx_propagation_failures,
            p2p_service_failures,
        };
        metrics.set_client_state("idle");
        metrics
    }

    pub fn gather(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::<u8>::new();
        let encoder = TextEncoder::new();
        encoder.encode(&metric_families, &mut buffer).expect("failed to encode metrics");
        String::from_utf8(buffer).expect("metrics not utf8")
    }

    // Sync
    pub fn set_synced_block(&self, v: i64) {
        self.synced_block.set(v);
    }

    /// Flag `state` as the active client state and clear the others.
    pub fn set_client_state(&self, state: &str) {
        for label in CLIENT_STATES {
            self.client_state.with_label_values(&[label]).set(i64::from(label == state));
        }
    }

    pub fn inc_blocks_reconciled(&self, count: u64) {
        self.blocks_reconciled.inc_by(count);
    }

    // Tx pool
    pub fn inc_txs_settled(&self, count: u64) {
        self.txs_settled.inc_by(count);
    }

    pub fn inc_txs_removed(&self, count: u64) {
        self.txs_removed.inc_by(count);
    }

    pub fn inc_txs_admitted(&self) {
        self.txs_admitted.inc();
    }

    pub fn inc_tx_propagation_failures(&self) {
        self.tx_propagation_failures.inc();
    }

    pub fn inc_p2p_service_failures(&self) {
        self.p2p_service_failures.inc();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedMetrics = Arc<Metrics>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_contains_registered_metrics() {
        let metrics = Metrics::new();
        metrics.set_synced_block(12);
        metrics.inc_txs_admitted();

        let text = metrics.gather();
        assert!(text.contains("p2p_synced_l2_block 12"));
        assert!(text.contains("p2p_tx_pool_admitted_total 1"));
    }

    #[test]
    fn test_single_active_state() {
        let metrics = Metrics::new();
        metrics.set_client_state("running");

        let text = metrics.gather();
        assert!(text.contains(r#"p2p_client_state{state="running"} 1"#));
        assert!(text.contains(r#"p2p_client_state{state="idle"} 0"#));
    }
}
