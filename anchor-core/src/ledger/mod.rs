//! Ledger interface.
//!
//! The ledger is an external, append-only store of content-addressed chains.
//! Chains and entries are created with a two-phase commit/reveal exchange: the
//! commit pays for and reserves the entry hash, the reveal publishes the data.
//! Implementations are injected as `Arc<dyn Ledger>` into the registrar,
//! anchorer and verifier.

pub mod memory;

pub use memory::MemoryLedger;

use crate::crypto::Signer;
use crate::entry::{Entry, EntryError, NewChain};
use crate::types::{ChainId, EntryHash, TxId};
use async_trait::async_trait;
use thiserror::Error;

/// Trait for ledger clients.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Short name of the backend (e.g. "factom", "memory").
    fn name(&self) -> &str;

    /// Whether a chain with this ID has been created.
    async fn chain_exists(&self, chain_id: &ChainId) -> Result<bool, LedgerError>;

    /// Pay for and reserve a chain creation.
    async fn commit_chain(&self, chain: &NewChain, payer: &Signer) -> Result<TxId, LedgerError>;

    /// Publish a previously committed chain.
    async fn reveal_chain(&self, chain: &NewChain) -> Result<EntryHash, LedgerError>;

    /// Pay for and reserve an entry.
    async fn commit_entry(&self, entry: &Entry, payer: &Signer) -> Result<TxId, LedgerError>;

    /// Publish a previously committed entry.
    async fn reveal_entry(&self, entry: &Entry) -> Result<EntryHash, LedgerError>;

    /// Full history of a chain, oldest first.
    async fn chain_entries(&self, chain_id: &ChainId) -> Result<Vec<Entry>, LedgerError>;

    /// Fetch one entry by hash.
    async fn entry(&self, hash: &EntryHash) -> Result<Entry, LedgerError>;
}

/// Errors reported by ledger clients.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Ledger RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Chain {0} not found")]
    ChainNotFound(ChainId),

    #[error("Chain {0} already exists")]
    ChainAlreadyExists(ChainId),

    #[error("Entry {0} not found")]
    EntryNotFound(EntryHash),

    #[error("Entry {0} was revealed without a commit")]
    NotCommitted(EntryHash),

    #[error("Malformed entry: {0}")]
    Entry(#[from] EntryError),
}
