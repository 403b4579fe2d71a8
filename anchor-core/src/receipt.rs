//! Anchor receipts.
//!
//! A receipt records where a blob's fingerprint was anchored, so a later
//! point-lookup check can fetch the exact ledger entry instead of scanning the
//! chain. Receipts are stored as CBOR sidecar files next to the blob
//! (`segment.h264` -> `segment.h264.anchor`).

use crate::crypto::verify_signature;
use crate::types::{ChainId, EntryHash, Fingerprint, PublicKeyBytes, SignatureBytes, TxId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Receipt schema version
pub const RECEIPT_VERSION: u8 = 1;

/// Sidecar file extension appended to the blob's file name.
pub const SIDECAR_EXTENSION: &str = "anchor";

#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("CBOR encoding error: {0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),

    #[error("CBOR decoding error: {0}")]
    Decode(#[from] ciborium::de::Error<std::io::Error>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported receipt version {0}")]
    UnsupportedVersion(u8),
}

/// Proof that a fingerprint was submitted to a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorReceipt {
    pub version: u8,
    pub chain_id: ChainId,
    pub entry_hash: EntryHash,
    pub tx_id: TxId,
    pub fingerprint: Fingerprint,
    pub signature: SignatureBytes,
    pub public_key: PublicKeyBytes,
    pub anchored_at: DateTime<Utc>,
}

impl AnchorReceipt {
    /// Whether the embedded signature covers the embedded fingerprint.
    pub fn is_self_consistent(&self) -> bool {
        verify_signature(&self.public_key, &self.fingerprint, &self.signature.0)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ReceiptError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)?;
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReceiptError> {
        let receipt: AnchorReceipt = ciborium::from_reader(bytes)?;
        if receipt.version != RECEIPT_VERSION {
            return Err(ReceiptError::UnsupportedVersion(receipt.version));
        }
        Ok(receipt)
    }

    /// Write the receipt next to `blob`, returning the sidecar path.
    pub fn write_sidecar(&self, blob: &Path) -> Result<PathBuf, ReceiptError> {
        let path = sidecar_path(blob);
        fs::write(&path, self.to_bytes()?)?;
        Ok(path)
    }

    /// Read the receipt stored next to `blob`.
    pub fn read_sidecar(blob: &Path) -> Result<Self, ReceiptError> {
        let bytes = fs::read(sidecar_path(blob))?;
        Self::from_bytes(&bytes)
    }
}

/// Path of the receipt sidecar for `blob`.
pub fn sidecar_path(blob: &Path) -> PathBuf {
    let mut name: OsString = blob.as_os_str().to_owned();
    name.push(".");
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}
