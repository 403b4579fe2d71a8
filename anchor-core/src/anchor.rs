//! Writing signed fingerprints onto a chain.

use crate::crypto::{Signature, Signer};
use crate::entry::Entry;
use crate::fingerprint::fingerprint_file_from_task;
use crate::ledger::Ledger;
use crate::receipt::{AnchorReceipt, RECEIPT_VERSION};
use crate::submit::{submit_entry, SubmitError, Submitted};
use crate::types::{ChainId, Fingerprint, PublicKeyBytes, SignatureBytes};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AnchorFileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Build the anchor record for `fingerprint`: ext IDs are `[signature, public key]`,
/// content is the fingerprint itself.
pub fn anchor_entry(chain_id: ChainId, fingerprint: &Fingerprint, signer: &Signer) -> Entry {
    signed_entry(
        chain_id,
        fingerprint,
        &signer.sign(fingerprint),
        &signer.public_key_bytes(),
    )
}

fn signed_entry(
    chain_id: ChainId,
    fingerprint: &Fingerprint,
    signature: &Signature,
    public_key: &PublicKeyBytes,
) -> Entry {
    Entry::new(
        chain_id,
        vec![signature.to_bytes().to_vec(), public_key.to_vec()],
        fingerprint.to_vec(),
    )
}

/// Appends anchor records, paying with a funding key.
pub struct Anchorer {
    ledger: Arc<dyn Ledger>,
    payer: Signer,
}

impl Anchorer {
    pub fn new(ledger: Arc<dyn Ledger>, payer: Signer) -> Self {
        Self { ledger, payer }
    }

    /// Sign `fingerprint` with `signer` and append it to `chain_id`.
    ///
    /// Submits at most once; retries are up to the caller.
    pub async fn anchor(
        &self,
        chain_id: ChainId,
        fingerprint: &Fingerprint,
        signer: &Signer,
    ) -> Result<Submitted, SubmitError> {
        self.submit(&anchor_entry(chain_id, fingerprint, signer)).await
    }

    async fn submit(&self, entry: &Entry) -> Result<Submitted, SubmitError> {
        let submitted = submit_entry(self.ledger.as_ref(), entry, &self.payer).await?;
        info!(
            "Anchored {} on chain {} (entry {}, tx {})",
            hex::encode(&entry.content),
            entry.chain_id,
            submitted.entry_hash,
            submitted.tx_id
        );
        Ok(submitted)
    }

    /// Fingerprint the file at `path` and anchor it, returning a receipt.
    pub async fn anchor_file(
        &self,
        chain_id: ChainId,
        path: &Path,
        signer: &Signer,
    ) -> Result<AnchorReceipt, AnchorFileError> {
        let fingerprint = fingerprint_file_from_task(path)
            .await
            .map_err(|source| AnchorFileError::Read {
                path: path.display().to_string(),
                source,
            })?;
        let signature = signer.sign(&fingerprint);
        let public_key = signer.public_key_bytes();
        let entry = signed_entry(chain_id, &fingerprint, &signature, &public_key);
        let submitted = self.submit(&entry).await?;

        Ok(AnchorReceipt {
            version: RECEIPT_VERSION,
            chain_id,
            entry_hash: submitted.entry_hash,
            tx_id: submitted.tx_id,
            fingerprint,
            signature: SignatureBytes::from(signature.to_bytes()),
            public_key,
            anchored_at: Utc::now(),
        })
    }
}

impl std::fmt::Debug for Anchorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Anchorer")
            .field("ledger", &self.ledger.name())
            .field("payer", &self.payer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::verify_signature;
    use crate::entity::{Entity, Vehicle};
    use crate::fingerprint::fingerprint;
    use crate::ledger::memory::{MemoryLedger, Operation};
    use crate::registrar::Registrar;

    async fn registered_vehicle(ledger: &Arc<MemoryLedger>) -> Vehicle {
        let vehicle = Vehicle::from_vin("1234567890ABCDEFH").unwrap();
        Registrar::new(ledger.clone(), Signer::generate())
            .register(&vehicle)
            .await
            .unwrap();
        vehicle
    }

    #[test]
    fn test_anchor_entry_shape() {
        let signer = Signer::generate();
        let fp = fingerprint(b"segment");
        let entry = anchor_entry(ChainId([1; 32]), &fp, &signer);

        assert_eq!(entry.ext_ids.len(), 2);
        assert_eq!(entry.ext_ids[0].len(), 64);
        assert_eq!(entry.ext_ids[1], signer.public_key_bytes().to_vec());
        assert_eq!(entry.content, fp.to_vec());
        assert!(verify_signature(&entry.ext_ids[1], &entry.content, &entry.ext_ids[0]));
    }

    #[tokio::test]
    async fn test_anchor_appends_one_record() {
        let ledger = Arc::new(MemoryLedger::new());
        let vehicle = registered_vehicle(&ledger).await;
        let owner = Signer::generate();
        let anchorer = Anchorer::new(ledger.clone(), owner.clone());

        let fp = fingerprint(b"obd log");
        let submitted = anchorer.anchor(vehicle.chain_id(), &fp, &owner).await.unwrap();

        let history = ledger.chain_entries(&vehicle.chain_id()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, fp.to_vec());
        assert_eq!(history[1].hash().unwrap(), submitted.entry_hash);
    }

    #[tokio::test]
    async fn test_anchor_file_receipt() {
        let ledger = Arc::new(MemoryLedger::new());
        let vehicle = registered_vehicle(&ledger).await;
        let owner = Signer::generate();
        let anchorer = Anchorer::new(ledger.clone(), Signer::generate());

        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join("20240101120000.txt");
        std::fs::write(&blob, b"Engine RPM: 812").unwrap();

        let receipt = anchorer
            .anchor_file(vehicle.chain_id(), &blob, &owner)
            .await
            .unwrap();

        assert_eq!(receipt.fingerprint, fingerprint(b"Engine RPM: 812"));
        assert_eq!(receipt.public_key, owner.public_key_bytes());
        assert!(receipt.is_self_consistent());
        let stored = ledger.entry(&receipt.entry_hash).await.unwrap();
        assert_eq!(stored.content, receipt.fingerprint.to_vec());
    }

    #[tokio::test]
    async fn test_anchor_file_missing_blob() {
        let ledger = Arc::new(MemoryLedger::new());
        let anchorer = Anchorer::new(ledger, Signer::generate());
        let dir = tempfile::tempdir().unwrap();

        let err = anchorer
            .anchor_file(ChainId([0; 32]), &dir.path().join("gone.h264"), &Signer::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, AnchorFileError::Read { .. }));
    }

    #[tokio::test]
    async fn test_anchor_surfaces_commit_failure() {
        let ledger = Arc::new(MemoryLedger::new());
        let vehicle = registered_vehicle(&ledger).await;
        let anchorer = Anchorer::new(ledger.clone(), Signer::generate());
        ledger.fail_next(Operation::CommitEntry);

        let err = anchorer
            .anchor(vehicle.chain_id(), &fingerprint(b"x"), &Signer::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::CommitFailed(_)));
        assert_eq!(ledger.chain_entries(&vehicle.chain_id()).await.unwrap().len(), 1);
    }
}
