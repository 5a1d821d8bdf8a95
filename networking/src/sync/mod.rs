/// Sync machinery for the L2 p2p client.
///
/// This module keeps the local transaction pool consistent with the chain of
/// confirmed L2 blocks. It includes:
///
/// - **Block Downloader**: Fetches confirmed blocks in ordered, bounded batches
/// - **P2p Client**: Owns the pool, reconciles it against every block and
///   drives the p2p service lifecycle
/// - **Observer**: Receives client events (logging, metrics)
///
/// ## Architecture
///
/// 1. `start()` snapshots the chain height
/// 2. If blocks are missing, the client enters SYNCHING and the downloader
///    starts fetching from the next unsynced block
/// 3. Every batch removes its transactions from the pool and notifies the
///    p2p service that they settled
/// 4. Once the snapshot height is reached, the p2p service starts and the
///    client accepts transactions
///
/// ## State Machine
///
/// - **IDLE**: Created, not started
/// - **SYNCHING**: Catching up with the chain height seen at start
/// - **RUNNING**: Caught up, gossiping, accepting transactions
/// - **STOPPED**: Terminal
pub mod client;
pub mod config;
pub mod downloader;
pub mod observer;
pub mod states;

pub use client::{P2pClient, SyncHandle};
pub use config::*;
pub use downloader::L2BlockDownloader;
pub use observer::{SyncObserver, TracingObserver};
pub use states::{P2pClientState, P2pSyncState};

#[cfg(test)]
mod tests;
