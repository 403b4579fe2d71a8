//! Factom ledger client.
//!
//! Implements [`anchor_core::Ledger`] over the factomd JSON-RPC v2 API.
//!
//! ## Flow
//! 1. Build the commit message locally and sign it with the payer key
//! 2. `commit-chain` / `commit-entry` with the hex-encoded message
//! 3. `reveal-chain` / `reveal-entry` with the hex-encoded entry
//!
//! History is read by following entry blocks from the chain head back to
//! the first block, then fetching each entry.

pub mod commit;
pub mod rpc;

use anchor_core::crypto::Signer;
use anchor_core::entry::{Entry, NewChain};
use anchor_core::ledger::{Ledger, LedgerError};
use anchor_core::types::{ChainId, EntryHash, TxId};
use async_trait::async_trait;
use chrono::Utc;
use rpc::{
    ChainHead, CommitResult, EntryBlock, RawEntry, RevealResult, RpcClient, RpcError,
    MISSING_CHAIN_HEAD, NOT_FOUND,
};
use serde_json::json;
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Key MR of the block before a chain's first block.
const ZERO_KEYMR: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Configuration for the factomd connection.
#[derive(Debug, Clone)]
pub struct FactomConfig {
    /// JSON-RPC endpoint, including the `/v2` path
    pub factomd_url: String,
    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for FactomConfig {
    fn default() -> Self {
        Self {
            factomd_url: "http://courtesy-node.factom.com/v2".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a whole number of seconds, got {value:?}")]
    InvalidTimeout { name: &'static str, value: String },
}

impl FactomConfig {
    pub const URL_VAR: &'static str = "FACTOMD_URL";
    pub const TIMEOUT_VAR: &'static str = "FACTOMD_TIMEOUT_SECS";

    /// Defaults overridden by `FACTOMD_URL` and `FACTOMD_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup(Self::URL_VAR).filter(|url| !url.trim().is_empty()) {
            config.factomd_url = url.trim().to_string();
        }
        if let Some(value) = lookup(Self::TIMEOUT_VAR) {
            config.request_timeout_secs =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidTimeout {
                        name: Self::TIMEOUT_VAR,
                        value: value.clone(),
                    })?;
        }
        Ok(config)
    }
}

impl From<RpcError> for LedgerError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::Network(e) => LedgerError::Network(e.to_string()),
            RpcError::Http(status) => LedgerError::Network(format!("HTTP {}", status)),
            RpcError::Rpc { code, message } => LedgerError::Rpc { code, message },
            RpcError::InvalidResponse(msg) => LedgerError::InvalidResponse(msg),
        }
    }
}

/// A ledger backed by a factomd node.
pub struct FactomLedger {
    rpc: RpcClient,
}

impl FactomLedger {
    pub fn new(config: FactomConfig) -> Result<Self, RpcError> {
        let rpc = RpcClient::new(
            config.factomd_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self { rpc })
    }

    /// Key MR of the newest entry block, or `None` while the chain's first
    /// block is still being built.
    async fn chain_head(&self, chain_id: &ChainId) -> Result<Option<String>, LedgerError> {
        let head: ChainHead = match self
            .rpc
            .call("chain-head", json!({ "chainid": chain_id.to_string() }))
            .await
        {
            Err(e) if e.code() == Some(MISSING_CHAIN_HEAD) => {
                return Err(LedgerError::ChainNotFound(*chain_id))
            }
            other => other?,
        };
        if head.chainhead.is_empty() {
            return Ok(None);
        }
        Ok(Some(head.chainhead))
    }
}

impl std::fmt::Debug for FactomLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactomLedger")
            .field("url", &self.rpc.url())
            .finish()
    }
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, LedgerError> {
    hex::decode(value).map_err(|e| LedgerError::InvalidResponse(format!("{}: {}", field, e)))
}

fn parse_id<T: FromStr>(field: &str, value: &str) -> Result<T, LedgerError>
where
    T::Err: std::fmt::Display,
{
    T::from_str(value).map_err(|e| LedgerError::InvalidResponse(format!("{}: {}", field, e)))
}

impl TryFrom<RawEntry> for Entry {
    type Error = LedgerError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        let chain_id = parse_id("chainid", &raw.chainid)?;
        let ext_ids = raw
            .extids
            .iter()
            .map(|ext_id| decode_hex("extids", ext_id))
            .collect::<Result<Vec<_>, _>>()?;
        let content = decode_hex("content", &raw.content)?;
        Ok(Entry::new(chain_id, ext_ids, content))
    }
}

#[async_trait]
impl Ledger for FactomLedger {
    fn name(&self) -> &str {
        "factom"
    }

    async fn chain_exists(&self, chain_id: &ChainId) -> Result<bool, LedgerError> {
        match self.chain_head(chain_id).await {
            Ok(_) => Ok(true),
            Err(LedgerError::ChainNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn commit_chain(&self, chain: &NewChain, payer: &Signer) -> Result<TxId, LedgerError> {
        let message = commit::chain_commit(chain, payer, Utc::now())?;
        let result: CommitResult = self
            .rpc
            .call("commit-chain", json!({ "message": hex::encode(message) }))
            .await?;
        info!("Committed chain {}: tx {}", chain.chain_id(), result.txid);
        Ok(TxId(result.txid))
    }

    async fn reveal_chain(&self, chain: &NewChain) -> Result<EntryHash, LedgerError> {
        let entry = hex::encode(chain.first_entry.to_bytes()?);
        let result: RevealResult = self
            .rpc
            .call("reveal-chain", json!({ "entry": entry }))
            .await?;
        debug!("Revealed chain {}: {}", chain.chain_id(), result.message);
        parse_id("entryhash", &result.entryhash)
    }

    async fn commit_entry(&self, entry: &Entry, payer: &Signer) -> Result<TxId, LedgerError> {
        let message = commit::entry_commit(entry, payer, Utc::now())?;
        let result: CommitResult = self
            .rpc
            .call("commit-entry", json!({ "message": hex::encode(message) }))
            .await?;
        debug!("Committed entry on {}: tx {}", entry.chain_id, result.txid);
        Ok(TxId(result.txid))
    }

    async fn reveal_entry(&self, entry: &Entry) -> Result<EntryHash, LedgerError> {
        let result: RevealResult = self
            .rpc
            .call("reveal-entry", json!({ "entry": hex::encode(entry.to_bytes()?) }))
            .await?;
        debug!("Revealed entry {}", result.entryhash);
        parse_id("entryhash", &result.entryhash)
    }

    async fn chain_entries(&self, chain_id: &ChainId) -> Result<Vec<Entry>, LedgerError> {
        let Some(mut keymr) = self.chain_head(chain_id).await? else {
            return Ok(Vec::new());
        };

        // Blocks come newest first; entries within a block are in order.
        let mut blocks = Vec::new();
        let mut visited = HashSet::new();
        while keymr != ZERO_KEYMR {
            if !visited.insert(keymr.clone()) {
                return Err(LedgerError::InvalidResponse(format!(
                    "entry block {} of chain {} links back to itself",
                    keymr, chain_id
                )));
            }
            let block: EntryBlock = self
                .rpc
                .call("entry-block", json!({ "keymr": keymr }))
                .await?;
            keymr = block.header.prevkeymr;
            blocks.push(block.entrylist);
        }

        let mut entries = Vec::new();
        for item in blocks.into_iter().rev().flatten() {
            let hash = parse_id("entryhash", &item.entryhash)?;
            entries.push(self.entry(&hash).await?);
        }
        debug!("Read {} entries from chain {}", entries.len(), chain_id);
        Ok(entries)
    }

    async fn entry(&self, hash: &EntryHash) -> Result<Entry, LedgerError> {
        let raw: RawEntry = match self
            .rpc
            .call("entry", json!({ "hash": hash.to_string() }))
            .await
        {
            Err(e) if e.code() == Some(NOT_FOUND) => return Err(LedgerError::EntryNotFound(*hash)),
            other => other?,
        };
        Entry::try_from(raw)
    }
}
