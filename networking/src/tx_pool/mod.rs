/// Transaction pool for pending L2 transactions.
///
/// Holds transactions that were admitted locally but have not been settled
/// in a block yet. Entries are keyed by transaction hash, so admission is
/// idempotent and deletion is a set difference.
///
/// Implementations are not required to lock internally. The p2p client owns
/// its pool behind a mutex and every call below runs while that lock is held.
pub mod memory_tx_pool;

pub use memory_tx_pool::InMemoryTxPool;

use containers::{Tx, TxHash};

pub trait TxPool: Send + 'static {
    /// Add transactions to the pool. A hash that is already present is overwritten.
    fn add_txs(&mut self, txs: Vec<Tx>);

    /// Remove transactions by hash. Hashes that are not present are ignored.
    ///
    /// Returns how many transactions were actually removed.
    fn delete_txs(&mut self, tx_hashes: &[TxHash]) -> usize;

    /// Owned copies of every transaction in the pool, in no particular order.
    fn get_all_txs(&self) -> Vec<Tx>;

    /// Hashes of every transaction in the pool, in no particular order.
    fn get_all_tx_hashes(&self) -> Vec<TxHash>;

    fn get_tx_by_hash(&self, tx_hash: &TxHash) -> Option<Tx>;

    fn has_tx(&self, tx_hash: &TxHash) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
