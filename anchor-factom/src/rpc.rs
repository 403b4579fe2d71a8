//! JSON-RPC 2.0 transport to a factomd node.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// factomd: no chain head exists for the requested chain.
pub const MISSING_CHAIN_HEAD: i64 = -32009;

/// factomd: the requested entry or block is unknown.
pub const NOT_FOUND: i64 = -32008;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Http(reqwest::StatusCode),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    /// The JSON-RPC error code, if the node answered with one.
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct Request<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct Response<R> {
    result: Option<R>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: i64,
    message: String,
}

/// factomd JSON-RPC client.
pub struct RpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client for the `/v2` endpoint at `url`, bounding each request by `timeout`.
    pub fn new(url: String, timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            next_id: AtomicU64::new(0),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call `method` with `params` and decode its result.
    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<R, RpcError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let request = Request {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        trace!("factomd call {} #{}", method, request.id);

        let response = self.client.post(&self.url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<Response<R>>(&body) {
            Ok(Response {
                error: Some(error), ..
            }) => Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            }),
            Ok(Response {
                result: Some(result),
                ..
            }) if status.is_success() => Ok(result),
            _ if !status.is_success() => Err(RpcError::Http(status)),
            Ok(_) => Err(RpcError::InvalidResponse(format!(
                "{} returned neither result nor error",
                method
            ))),
            Err(e) => Err(RpcError::InvalidResponse(format!("{}: {}", method, e))),
        }
    }
}

/// `chain-head` result.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainHead {
    pub chainhead: String,
    #[serde(default)]
    pub chaininprocesslist: bool,
}

/// `entry-block` result.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryBlock {
    pub header: EntryBlockHeader,
    #[serde(default)]
    pub entrylist: Vec<EntryBlockItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryBlockHeader {
    pub prevkeymr: String,
    #[serde(default)]
    pub blocksequencenumber: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryBlockItem {
    pub entryhash: String,
    #[serde(default)]
    pub timestamp: i64,
}

/// `entry` result; all byte fields are hex.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEntry {
    pub chainid: String,
    #[serde(default)]
    pub extids: Vec<String>,
    #[serde(default)]
    pub content: String,
}

/// `commit-chain` / `commit-entry` result.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitResult {
    #[serde(default)]
    pub message: String,
    pub txid: String,
}

/// `reveal-chain` / `reveal-entry` result.
#[derive(Debug, Clone, Deserialize)]
pub struct RevealResult {
    #[serde(default)]
    pub message: String,
    pub entryhash: String,
}
