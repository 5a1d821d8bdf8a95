pub mod types;
pub mod serde_helpers;
pub mod tx;
pub mod block;

pub use block::L2Block;
pub use tx::{Tx, TxHash};
pub use types::{BlockNumber, Bytes32};
