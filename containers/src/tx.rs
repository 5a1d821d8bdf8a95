use crate::Bytes32;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Content identity of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub Bytes32);

impl TxHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl From<[u8; 32]> for TxHash {
    fn from(bytes: [u8; 32]) -> Self {
        TxHash(Bytes32(bytes))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Serialize)]
struct RawTxRef<'a> {
    #[serde(serialize_with = "crate::serde_helpers::serialize")]
    payload: &'a [u8],
}

#[derive(Deserialize)]
struct RawTx {
    #[serde(deserialize_with = "crate::serde_helpers::deserialize")]
    payload: Vec<u8>,
}

/// A pending L2 transaction.
///
/// The payload is opaque to this layer. Its hash is the SHA-256 digest of the
/// payload, computed once when the transaction is built and never again, so
/// equality, hashing and pool membership all go through [`Tx::hash`].
#[derive(Clone, Debug)]
pub struct Tx {
    payload: Vec<u8>,
    hash: TxHash,
}

impl Tx {
    pub fn new(payload: Vec<u8>) -> Self {
        let hash = TxHash(Bytes32(Sha256::digest(&payload).into()));
        Self { payload, hash }
    }

    /// Transaction with 64 random payload bytes. Used by tests and devnets.
    pub fn random() -> Self {
        let mut payload = vec![0u8; 64];
        rand::thread_rng().fill_bytes(&mut payload);
        Self::new(payload)
    }

    pub fn hash(&self) -> TxHash {
        self.hash
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl PartialEq for Tx {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Tx {}

impl Hash for Tx {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl Serialize for Tx {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawTxRef {
            payload: &self.payload,
        }
        .serialize(serializer)
    }
}

// The hash is never trusted from the wire, it is recomputed from the payload
impl<'de> Deserialize<'de> for Tx {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawTx::deserialize(deserializer).map(|raw| Tx::new(raw.payload))
    }
}
