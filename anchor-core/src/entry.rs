//! Ledger entry format and content addressing.
//!
//! ## Binary Layout
//! ```text
//! u8        version (= 0)
//! [32]      chain_id
//! u16 BE    total length of the ext_id section
//! { u16 BE len, [len] bytes }*   ext_ids
//! [..]      content
//! ```
//!
//! The entry hash is `SHA-256(SHA-512(data) || data)` over that layout.

use crate::crypto::{sha256, sha512};
use crate::identity::ChainName;
use crate::types::{ChainId, EntryHash};
use thiserror::Error;

/// Entry format version.
pub const ENTRY_VERSION: u8 = 0;

/// version + chain_id + ext_id section length
pub const ENTRY_HEADER_LEN: usize = 35;

/// Largest payload (ext IDs plus content) the ledger accepts.
pub const MAX_ENTRY_PAYLOAD: usize = 10240;

/// Extra entry credits charged for creating a chain.
pub const CHAIN_CREATION_FEE: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("entry payload is {0} bytes, limit is {MAX_ENTRY_PAYLOAD}")]
    TooLarge(usize),

    #[error("ext ID {index} is {len} bytes, limit is 65535")]
    ExtIdTooLarge { index: usize, len: usize },

    #[error("truncated entry: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("unsupported entry version {0}")]
    UnsupportedVersion(u8),
}

/// A single ledger record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub chain_id: ChainId,
    pub ext_ids: Vec<Vec<u8>>,
    pub content: Vec<u8>,
}

impl Entry {
    pub fn new(chain_id: ChainId, ext_ids: Vec<Vec<u8>>, content: Vec<u8>) -> Self {
        Self {
            chain_id,
            ext_ids,
            content,
        }
    }

    /// Serialize to the ledger's binary layout.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EntryError> {
        let mut ext_section = Vec::new();
        for (index, ext_id) in self.ext_ids.iter().enumerate() {
            let len = u16::try_from(ext_id.len()).map_err(|_| EntryError::ExtIdTooLarge {
                index,
                len: ext_id.len(),
            })?;
            ext_section.extend_from_slice(&len.to_be_bytes());
            ext_section.extend_from_slice(ext_id);
        }

        let payload = ext_section.len() + self.content.len();
        if payload > MAX_ENTRY_PAYLOAD {
            return Err(EntryError::TooLarge(payload));
        }

        let mut buf = Vec::with_capacity(ENTRY_HEADER_LEN + payload);
        buf.push(ENTRY_VERSION);
        buf.extend_from_slice(self.chain_id.as_bytes());
        // payload <= MAX_ENTRY_PAYLOAD, so the section length fits in u16
        buf.extend_from_slice(&(ext_section.len() as u16).to_be_bytes());
        buf.extend_from_slice(&ext_section);
        buf.extend_from_slice(&self.content);
        Ok(buf)
    }

    /// Parse the ledger's binary layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EntryError> {
        let header = take(bytes, 0, ENTRY_HEADER_LEN)?;
        if header[0] != ENTRY_VERSION {
            return Err(EntryError::UnsupportedVersion(header[0]));
        }

        let mut chain_id = [0u8; 32];
        chain_id.copy_from_slice(&header[1..33]);
        let ext_len = u16::from_be_bytes([header[33], header[34]]) as usize;
        let ext_section = take(bytes, ENTRY_HEADER_LEN, ext_len)?;

        let mut ext_ids = Vec::new();
        let mut offset = 0;
        while offset < ext_section.len() {
            let len_bytes = take(ext_section, offset, 2)?;
            let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
            ext_ids.push(take(ext_section, offset + 2, len)?.to_vec());
            offset += 2 + len;
        }

        Ok(Self {
            chain_id: ChainId(chain_id),
            ext_ids,
            content: bytes[ENTRY_HEADER_LEN + ext_len..].to_vec(),
        })
    }

    /// Content address of this entry.
    pub fn hash(&self) -> Result<EntryHash, EntryError> {
        let data = self.to_bytes()?;
        let mut buf = Vec::with_capacity(64 + data.len());
        buf.extend_from_slice(&sha512(&data));
        buf.extend_from_slice(&data);
        Ok(EntryHash(sha256(&buf)))
    }

    /// Fee for submitting this entry, in entry credits (1 per started KiB of payload).
    pub fn cost(&self) -> Result<u8, EntryError> {
        let payload = self.to_bytes()?.len() - ENTRY_HEADER_LEN;
        let kib = payload.div_ceil(1024).max(1);
        // payload <= 10240 bytes, so at most 10 credits
        Ok(kib as u8)
    }
}

/// The first entry of a chain, whose ext IDs are the chain name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChain {
    pub first_entry: Entry,
}

impl NewChain {
    /// Build the creation record for `name`; the chain ID is derived from the same segments.
    pub fn new(name: &ChainName, content: Vec<u8>) -> Self {
        Self {
            first_entry: Entry::new(name.chain_id(), name.segments().to_vec(), content),
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.first_entry.chain_id
    }

    /// Chain creation costs the first entry's cost plus the creation fee.
    pub fn cost(&self) -> Result<u8, EntryError> {
        Ok(self.first_entry.cost()? + CHAIN_CREATION_FEE)
    }
}

fn take(bytes: &[u8], offset: usize, needed: usize) -> Result<&[u8], EntryError> {
    bytes
        .get(offset..offset + needed)
        .ok_or(EntryError::Truncated { offset, needed })
}
