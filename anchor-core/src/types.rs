//! Core types shared by the anchoring and verification paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// SHA-256 hash (32 bytes)
pub type Hash256 = [u8; 32];

/// Content digest of a data blob.
pub type Fingerprint = Hash256;

/// Raw Ed25519 public key bytes.
pub type PublicKeyBytes = [u8; 32];

/// Ed25519 signature (64 bytes) - wrapped for Serde support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBytes(#[serde(with = "serde_arrays")] pub [u8; 64]);

impl From<[u8; 64]> for SignatureBytes {
    fn from(bytes: [u8; 64]) -> Self {
        SignatureBytes(bytes)
    }
}

impl AsRef<[u8; 64]> for SignatureBytes {
    fn as_ref(&self) -> &[u8; 64] {
        &self.0
    }
}

mod serde_arrays {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 64], serializer: S) -> Result<S::Ok, S::Error> {
        bytes.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 64], D::Error> {
        let bytes: Vec<u8> = Vec::deserialize(deserializer)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("Invalid signature length"))
    }
}

/// Error parsing a hex-encoded 32-byte identifier.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseIdError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("expected 32 bytes, got {0}")]
    Length(usize),
}

fn parse_hash256(s: &str) -> Result<Hash256, ParseIdError> {
    let bytes = hex::decode(s)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| ParseIdError::Length(len))
}

/// Ledger chain identifier, derived from the chain name (see [`crate::identity`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub Hash256);

impl ChainId {
    pub fn as_bytes(&self) -> &Hash256 {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ChainId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hash256(s).map(ChainId)
    }
}

/// Content address of a single ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryHash(pub Hash256);

impl EntryHash {
    pub fn as_bytes(&self) -> &Hash256 {
        &self.0
    }
}

impl fmt::Display for EntryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for EntryHash {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hash256(s).map(EntryHash)
    }
}

/// Ledger transaction identifier returned by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub String);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TxId {
    fn from(s: String) -> Self {
        TxId(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_hex_display_and_parse() {
        let id = ChainId([0xab; 32]);
        let text = id.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<ChainId>().unwrap(), id);
    }

    #[test]
    fn test_entry_hash_rejects_short_input() {
        let err = "abcd".parse::<EntryHash>().unwrap_err();
        assert_eq!(err, ParseIdError::Length(2));
        assert!(matches!("zz".parse::<EntryHash>(), Err(ParseIdError::Hex(_))));
    }

    #[test]
    fn test_tx_id_display() {
        let tx = TxId::from("deadbeef".to_string());
        assert_eq!(tx.to_string(), "deadbeef");
    }
}
