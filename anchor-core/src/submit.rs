//! Commit-then-reveal submission as a single operation.
//!
//! A failed commit means nothing reached the ledger. A failed reveal after a
//! successful commit leaves a paid-for reservation behind; that case carries
//! the commit's transaction ID so the caller can reconcile before retrying.

use crate::crypto::Signer;
use crate::entry::{Entry, NewChain};
use crate::ledger::{Ledger, LedgerError};
use crate::types::{EntryHash, TxId};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("commit failed: {0}")]
    CommitFailed(#[source] LedgerError),

    #[error("committed as {tx_id} but reveal failed: {source}")]
    RevealFailed {
        tx_id: TxId,
        #[source]
        source: LedgerError,
    },
}

impl SubmitError {
    /// Whether the ledger may hold a commit for this submission.
    pub fn is_partial(&self) -> bool {
        matches!(self, SubmitError::RevealFailed { .. })
    }

    /// The underlying ledger error.
    pub fn ledger_error(&self) -> &LedgerError {
        match self {
            SubmitError::CommitFailed(e) => e,
            SubmitError::RevealFailed { source, .. } => source,
        }
    }
}

/// A completed two-phase submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub tx_id: TxId,
    pub entry_hash: EntryHash,
}

/// Create a chain: commit paid by `payer`, then reveal.
pub async fn submit_chain(
    ledger: &dyn Ledger,
    chain: &NewChain,
    payer: &Signer,
) -> Result<Submitted, SubmitError> {
    let tx_id = ledger
        .commit_chain(chain, payer)
        .await
        .map_err(SubmitError::CommitFailed)?;
    debug!("Chain {} committed in tx {}", chain.chain_id(), tx_id);

    match ledger.reveal_chain(chain).await {
        Ok(entry_hash) => Ok(Submitted { tx_id, entry_hash }),
        Err(source) => {
            warn!("Chain {} committed in tx {} but not revealed", chain.chain_id(), tx_id);
            Err(SubmitError::RevealFailed { tx_id, source })
        }
    }
}

/// Append an entry: commit paid by `payer`, then reveal.
pub async fn submit_entry(
    ledger: &dyn Ledger,
    entry: &Entry,
    payer: &Signer,
) -> Result<Submitted, SubmitError> {
    let tx_id = ledger
        .commit_entry(entry, payer)
        .await
        .map_err(SubmitError::CommitFailed)?;
    debug!("Entry on chain {} committed in tx {}", entry.chain_id, tx_id);

    match ledger.reveal_entry(entry).await {
        Ok(entry_hash) => Ok(Submitted { tx_id, entry_hash }),
        Err(source) => {
            warn!("Entry on chain {} committed in tx {} but not revealed", entry.chain_id, tx_id);
            Err(SubmitError::RevealFailed { tx_id, source })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{ChainName, DRIVER_NAMESPACE};
    use crate::ledger::memory::{MemoryLedger, Operation};

    fn chain() -> NewChain {
        NewChain::new(&ChainName::namespaced(DRIVER_NAMESPACE, &[1u8; 32]).unwrap(), Vec::new())
    }

    #[tokio::test]
    async fn test_submit_chain() {
        let ledger = MemoryLedger::new();
        let chain = chain();
        let submitted = submit_chain(&ledger, &chain, &Signer::generate()).await.unwrap();

        assert_eq!(submitted.entry_hash, chain.first_entry.hash().unwrap());
        assert!(ledger.chain_exists(&chain.chain_id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_commit_failure_is_not_partial() {
        let ledger = MemoryLedger::new();
        ledger.fail_next(Operation::CommitChain);

        let err = submit_chain(&ledger, &chain(), &Signer::generate()).await.unwrap_err();
        assert!(matches!(err, SubmitError::CommitFailed(LedgerError::Network(_))));
        assert!(!err.is_partial());
        assert_eq!(ledger.chain_count(), 0);
    }

    #[tokio::test]
    async fn test_reveal_failure_is_partial() {
        let ledger = MemoryLedger::new();
        let chain = chain();
        ledger.fail_next(Operation::RevealChain);

        let err = submit_chain(&ledger, &chain, &Signer::generate()).await.unwrap_err();
        assert!(err.is_partial());
        assert!(matches!(err.ledger_error(), LedgerError::Network(_)));
        assert!(!ledger.chain_exists(&chain.chain_id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_submit_entry_reveal_failure() {
        let ledger = MemoryLedger::new();
        let payer = Signer::generate();
        let chain = chain();
        submit_chain(&ledger, &chain, &payer).await.unwrap();

        let entry = Entry::new(chain.chain_id(), vec![], b"data".to_vec());
        ledger.fail_next(Operation::RevealEntry);
        let err = submit_entry(&ledger, &entry, &payer).await.unwrap_err();

        match err {
            SubmitError::RevealFailed { tx_id, .. } => assert!(!tx_id.0.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ledger.chain_entries(&chain.chain_id()).await.unwrap().len(), 1);
    }
}
