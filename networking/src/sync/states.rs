/// P2p client state machine.
use std::fmt;

use containers::BlockNumber;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum P2pClientState {
    /// Idle state: created but not started yet.
    Idle,

    /// Synching state: catching up with the chain height observed at start.
    ///
    /// Blocks are being reconciled against the tx pool. Transaction
    /// submission is rejected until the client reaches RUNNING.
    Synching,

    /// Running state: caught up and gossiping.
    ///
    /// The p2p service is started and new blocks keep being reconciled as
    /// they are confirmed.
    Running,

    /// Stopped state: terminal. The client cannot be restarted.
    Stopped,
}

impl P2pClientState {
    /// Check if a transition to the target state is valid.
    ///
    /// Callers must check validity before transitioning; invalid transitions
    /// are rejected and the current state is kept.
    pub fn can_transition_to(&self, target: P2pClientState) -> bool {
        match self {
            P2pClientState::Idle => matches!(
                target,
                P2pClientState::Synching | P2pClientState::Running | P2pClientState::Stopped
            ),
            P2pClientState::Synching => {
                matches!(target, P2pClientState::Running | P2pClientState::Stopped)
            }
            P2pClientState::Running => matches!(target, P2pClientState::Stopped),
            P2pClientState::Stopped => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            P2pClientState::Idle => "idle",
            P2pClientState::Synching => "synching",
            P2pClientState::Running => "running",
            P2pClientState::Stopped => "stopped",
        }
    }
}

impl Default for P2pClientState {
    fn default() -> Self {
        P2pClientState::Idle
    }
}

impl fmt::Display for P2pClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the client's sync status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct P2pSyncState {
    pub state: P2pClientState,
    pub synced_to_l2_block: BlockNumber,
}
