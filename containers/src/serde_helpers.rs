// Serde helpers for byte payloads
// Payloads are written as 0x-prefixed hex strings so JSON dumps stay readable

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize bytes as a `0x`-prefixed hex string
pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
}

/// Deserialize bytes from a hex string, with or without the `0x` prefix
pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let hex_str = String::deserialize(deserializer)?;
    let hex_str = hex_str.trim_start_matches("0x");
    hex::decode(hex_str).map_err(|err| D::Error::custom(format!("invalid hex payload: {err}")))
}
