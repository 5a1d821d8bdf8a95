pub mod block_source;
pub mod error;
pub mod service;
pub mod sync;
pub mod tx_pool;

pub use block_source::{InMemoryBlockSource, L2BlockSource};
pub use error::P2pError;
pub use service::{DummyP2pService, P2pService};
pub use sync::{P2pClient, P2pClientState, P2pConfig, P2pSyncState, SyncHandle, SyncObserver};
pub use tx_pool::{InMemoryTxPool, TxPool};
