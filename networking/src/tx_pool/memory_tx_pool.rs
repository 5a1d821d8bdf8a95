use std::collections::HashMap;

use containers::{Tx, TxHash};
use tracing::trace;

use super::TxPool;

/// Memory-resident transaction pool.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTxPool {
    /// Pending transactions, indexed by hash
    txs: HashMap<TxHash, Tx>,
}

impl InMemoryTxPool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TxPool for InMemoryTxPool {
    fn add_txs(&mut self, txs: Vec<Tx>) {
        for tx in txs {
            let tx_hash = tx.hash();
            trace!(tx = %tx_hash, "Adding tx to pool");
            self.txs.insert(tx_hash, tx);
        }
    }

    fn delete_txs(&mut self, tx_hashes: &[TxHash]) -> usize {
        tx_hashes
            .iter()
            .filter(|tx_hash| self.txs.remove(*tx_hash).is_some())
            .count()
    }

    fn get_all_txs(&self) -> Vec<Tx> {
        self.txs.values().cloned().collect()
    }

    fn get_all_tx_hashes(&self) -> Vec<TxHash> {
        self.txs.keys().copied().collect()
    }

    fn get_tx_by_hash(&self, tx_hash: &TxHash) -> Option<Tx> {
        self.txs.get(tx_hash).cloned()
    }

    fn has_tx(&self, tx_hash: &TxHash) -> bool {
        self.txs.contains_key(tx_hash)
    }

    fn len(&self) -> usize {
        self.txs.len()
    }
}
