//! Integrity verification of local files against anchored fingerprints.
//!
//! ## Record Filter
//! A ledger record vouches for a file only if, in this order:
//! 1. it has exactly two ext IDs (signature, public key);
//! 2. the embedded public key equals the claimed owner's key;
//! 3. the signature verifies over the record content under that key;
//! 4. the content equals the file's current fingerprint.
//!
//! Cheap structural checks run before signature verification. Records that
//! fail any check are skipped, never treated as errors: chains may carry
//! records from other protocols or later versions.

use crate::crypto::verify_signature;
use crate::entry::Entry;
use crate::fingerprint::fingerprint_file_from_task;
use crate::ledger::{Ledger, LedgerError};
use crate::types::{ChainId, EntryHash, Fingerprint, PublicKeyBytes};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Number of ext IDs in an anchor record.
const ANCHOR_EXT_IDS: usize = 2;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("failed to fetch ledger data: {0}")]
    Ledger(#[from] LedgerError),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why a record did not vouch for a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Malformed,
    ForeignKey,
    BadSignature,
    FingerprintMismatch,
}

/// Apply the record filter to a single entry.
pub fn check_entry(
    entry: &Entry,
    owner: &PublicKeyBytes,
    expected: &Fingerprint,
) -> Result<(), Rejection> {
    if entry.ext_ids.len() != ANCHOR_EXT_IDS {
        return Err(Rejection::Malformed);
    }
    let (signature, public_key) = (&entry.ext_ids[0], &entry.ext_ids[1]);

    if public_key.as_slice() != owner.as_slice() {
        return Err(Rejection::ForeignKey);
    }
    if !verify_signature(owner, &entry.content, signature) {
        return Err(Rejection::BadSignature);
    }
    if entry.content.as_slice() != expected.as_slice() {
        return Err(Rejection::FingerprintMismatch);
    }
    Ok(())
}

/// Whether any record in `history` vouches for `expected` under `owner`.
///
/// History order only decides which matching record is found first.
pub fn history_contains(history: &[Entry], owner: &PublicKeyBytes, expected: &Fingerprint) -> bool {
    history.iter().any(|entry| match check_entry(entry, owner, expected) {
        Ok(()) => true,
        Err(reason) => {
            trace!("Skipping record on chain {}: {:?}", entry.chain_id, reason);
            false
        }
    })
}

/// Checks local files against a chain's anchored fingerprints.
pub struct IntegrityVerifier {
    ledger: Arc<dyn Ledger>,
}

impl IntegrityVerifier {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Scan `chain_id` for a record, signed by `owner`, matching the file at `path`.
    ///
    /// `Ok(false)` is a normal negative result.
    pub async fn verify_file(
        &self,
        chain_id: &ChainId,
        path: &Path,
        owner: &PublicKeyBytes,
    ) -> Result<bool, VerifyError> {
        let history = self.ledger.chain_entries(chain_id).await?;
        let local = read_fingerprint(path).await?;
        debug!(
            "Scanning {} records on chain {} for {}",
            history.len(),
            chain_id,
            hex::encode(local)
        );

        let verified = history_contains(&history, owner, &local);
        info!(
            "{} {} against chain {}",
            path.display(),
            if verified { "verified" } else { "not verified" },
            chain_id
        );
        Ok(verified)
    }

    /// Check the file at `path` against one known record.
    ///
    /// Applies the same filter as [`verify_file`](Self::verify_file), including
    /// the comparison with the file's freshly computed fingerprint. An unknown
    /// record is a negative result, not an error.
    pub async fn check_record(
        &self,
        path: &Path,
        entry_hash: &EntryHash,
        owner: &PublicKeyBytes,
    ) -> Result<bool, VerifyError> {
        let local = read_fingerprint(path).await?;
        let entry = match self.ledger.entry(entry_hash).await {
            Ok(entry) => entry,
            Err(LedgerError::EntryNotFound(_)) => {
                debug!("Record {} not on the ledger", entry_hash);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        match check_entry(&entry, owner, &local) {
            Ok(()) => Ok(true),
            Err(reason) => {
                debug!("Record {} rejected for {}: {:?}", entry_hash, path.display(), reason);
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for IntegrityVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrityVerifier")
            .field("ledger", &self.ledger.name())
            .finish()
    }
}

async fn read_fingerprint(path: &Path) -> Result<Fingerprint, VerifyError> {
    fingerprint_file_from_task(path).await.map_err(|source| VerifyError::Read {
        path: path.display().to_string(),
        source,
    })
}
