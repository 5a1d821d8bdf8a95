use thiserror::Error;

/// Errors surfaced by the p2p client's local API.
///
/// Cloneable so a single failure can be observed by every caller waiting on
/// the same sync handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum P2pError {
    #[error("p2p client already stopped")]
    IllegalState,

    #[error("p2p client not ready")]
    NotReady,

    #[error("p2p client stopped before sync completed")]
    SyncAborted,

    #[error("block source error: {0}")]
    BlockSource(String),

    #[error("p2p service error: {0}")]
    Network(String),
}

impl P2pError {
    pub(crate) fn block_source(err: anyhow::Error) -> Self {
        P2pError::BlockSource(format!("{err:#}"))
    }

    pub(crate) fn network(err: anyhow::Error) -> Self {
        P2pError::Network(format!("{err:#}"))
    }
}
