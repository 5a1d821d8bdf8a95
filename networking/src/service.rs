use anyhow::Result;
use containers::{Tx, TxHash};
use tracing::{debug, info};

/// Gossip layer used by the p2p client.
///
/// Owns peer discovery, transport and message framing. The client only
/// drives its lifecycle and hands it transactions to relay.
#[async_trait::async_trait]
pub trait P2pService: Send + Sync + 'static {
    /// Start discovery and gossip.
    async fn start(&self) -> Result<()>;

    /// Stop discovery and gossip.
    async fn stop(&self) -> Result<()>;

    /// Relay a transaction to peers.
    fn propagate_tx(&self, tx: &Tx) -> Result<()>;

    /// Transactions that were settled in a block and should no longer be relayed.
    fn settled_txs(&self, tx_hashes: &[TxHash]);
}

/// A p2p service that talks to nobody.
///
/// Lets a single node run its pool and sync machinery without any peers.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyP2pService;

#[async_trait::async_trait]
impl P2pService for DummyP2pService {
    async fn start(&self) -> Result<()> {
        info!("Dummy p2p service started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        info!("Dummy p2p service stopped");
        Ok(())
    }

    fn propagate_tx(&self, tx: &Tx) -> Result<()> {
        debug!(tx = %tx.hash(), "Dropping tx propagation, no peers");
        Ok(())
    }

    fn settled_txs(&self, _tx_hashes: &[TxHash]) {}
}
