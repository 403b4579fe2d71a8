//! In-process ledger with commit/reveal semantics.

use super::{Ledger, LedgerError};
use crate::crypto::{sha256, Signer};
use crate::entry::{Entry, NewChain};
use crate::types::{ChainId, EntryHash, TxId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Ledger operations, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ChainExists,
    CommitChain,
    RevealChain,
    CommitEntry,
    RevealEntry,
    ChainEntries,
    Entry,
}

#[derive(Debug, Default)]
struct State {
    chains: HashMap<ChainId, Vec<EntryHash>>,
    entries: HashMap<EntryHash, Entry>,
    committed: HashSet<EntryHash>,
    failures: HashSet<Operation>,
    commits: u64,
}

/// A ledger held entirely in memory.
///
/// Reveals require a prior commit of the same entry hash, a chain can be
/// revealed only once, and entries can only be revealed onto existing chains.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<State>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with a network error.
    pub fn fail_next(&self, op: Operation) {
        self.lock().failures.insert(op);
    }

    /// Append an entry directly, bypassing commit/reveal. The chain is created if needed.
    pub fn insert_raw(&self, entry: Entry) -> Result<EntryHash, LedgerError> {
        let hash = entry.hash()?;
        let mut state = self.lock();
        state.chains.entry(entry.chain_id).or_default().push(hash);
        state.entries.insert(hash, entry);
        Ok(hash)
    }

    /// Number of chains created so far.
    pub fn chain_count(&self) -> usize {
        self.lock().chains.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl State {
    fn check(&mut self, op: Operation) -> Result<(), LedgerError> {
        if self.failures.remove(&op) {
            return Err(LedgerError::Network(format!("injected {:?} failure", op)));
        }
        Ok(())
    }

    fn commit(&mut self, hash: EntryHash, payer: &Signer) -> TxId {
        self.commits += 1;
        self.committed.insert(hash);

        let mut buf = Vec::with_capacity(32 + 32 + 8);
        buf.extend_from_slice(hash.as_bytes());
        buf.extend_from_slice(&payer.public_key_bytes());
        buf.extend_from_slice(&self.commits.to_be_bytes());
        TxId(hex::encode(sha256(&buf)))
    }

    fn take_commit(&mut self, hash: EntryHash) -> Result<(), LedgerError> {
        if !self.committed.remove(&hash) {
            return Err(LedgerError::NotCommitted(hash));
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    fn name(&self) -> &str {
        "memory"
    }

    async fn chain_exists(&self, chain_id: &ChainId) -> Result<bool, LedgerError> {
        let mut state = self.lock();
        state.check(Operation::ChainExists)?;
        Ok(state.chains.contains_key(chain_id))
    }

    async fn commit_chain(&self, chain: &NewChain, payer: &Signer) -> Result<TxId, LedgerError> {
        let hash = chain.first_entry.hash()?;
        let mut state = self.lock();
        state.check(Operation::CommitChain)?;
        let tx_id = state.commit(hash, payer);
        debug!("Committed chain {} (entry {})", chain.chain_id(), hash);
        Ok(tx_id)
    }

    async fn reveal_chain(&self, chain: &NewChain) -> Result<EntryHash, LedgerError> {
        let hash = chain.first_entry.hash()?;
        let chain_id = chain.chain_id();
        let mut state = self.lock();
        state.check(Operation::RevealChain)?;
        if state.chains.contains_key(&chain_id) {
            return Err(LedgerError::ChainAlreadyExists(chain_id));
        }
        state.take_commit(hash)?;
        state.chains.insert(chain_id, vec![hash]);
        state.entries.insert(hash, chain.first_entry.clone());
        debug!("Revealed chain {}", chain_id);
        Ok(hash)
    }

    async fn commit_entry(&self, entry: &Entry, payer: &Signer) -> Result<TxId, LedgerError> {
        let hash = entry.hash()?;
        let mut state = self.lock();
        state.check(Operation::CommitEntry)?;
        Ok(state.commit(hash, payer))
    }

    async fn reveal_entry(&self, entry: &Entry) -> Result<EntryHash, LedgerError> {
        let hash = entry.hash()?;
        let mut state = self.lock();
        state.check(Operation::RevealEntry)?;
        if !state.chains.contains_key(&entry.chain_id) {
            return Err(LedgerError::ChainNotFound(entry.chain_id));
        }
        state.take_commit(hash)?;
        state
            .chains
            .get_mut(&entry.chain_id)
            .ok_or(LedgerError::ChainNotFound(entry.chain_id))?
            .push(hash);
        state.entries.insert(hash, entry.clone());
        Ok(hash)
    }

    async fn chain_entries(&self, chain_id: &ChainId) -> Result<Vec<Entry>, LedgerError> {
        let mut state = self.lock();
        state.check(Operation::ChainEntries)?;
        let hashes = state
            .chains
            .get(chain_id)
            .ok_or(LedgerError::ChainNotFound(*chain_id))?;
        hashes
            .iter()
            .map(|h| {
                state
                    .entries
                    .get(h)
                    .cloned()
                    .ok_or(LedgerError::EntryNotFound(*h))
            })
            .collect()
    }

    async fn entry(&self, hash: &EntryHash) -> Result<Entry, LedgerError> {
        let mut state = self.lock();
        state.check(Operation::Entry)?;
        state
            .entries
            .get(hash)
            .cloned()
            .ok_or(LedgerError::EntryNotFound(*hash))
    }
}
