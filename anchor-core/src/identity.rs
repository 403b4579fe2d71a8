//! Deterministic chain identity derivation.
//!
//! A chain is addressed by a hash over its ordered name segments:
//! `SHA-256(SHA-256(seg_0) || SHA-256(seg_1) || ...)`. The first segment is a
//! namespace label, the rest are entity key material. The same [`ChainName`]
//! value feeds both derivation and the chain-creation entry, so the two can
//! never disagree on segment order.

use crate::crypto::sha256;
use crate::types::ChainId;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Namespace label for driver (person) identity chains.
pub const DRIVER_NAMESPACE: &str = "Driver Identity Chain";

/// Namespace label for vehicle identity chains.
pub const VEHICLE_NAMESPACE: &str = "Vehicle Identity Chain";

/// Input errors for identity derivation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("chain name must have at least one segment")]
    EmptyChainName,

    #[error("chain name segment {0} is empty")]
    EmptySegment(usize),

    #[error("VIN must be 17 characters, got {0}")]
    InvalidVinLength(usize),

    #[error("VIN contains non-alphanumeric character {0:?}")]
    InvalidVinCharacter(char),
}

/// Ordered list of chain name segments (a ledger chain's "external IDs").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainName {
    segments: Vec<Vec<u8>>,
}

impl ChainName {
    /// Build a chain name, rejecting empty names and empty segments.
    pub fn new(segments: Vec<Vec<u8>>) -> Result<Self, IdentityError> {
        if segments.is_empty() {
            return Err(IdentityError::EmptyChainName);
        }
        if let Some(index) = segments.iter().position(|s| s.is_empty()) {
            return Err(IdentityError::EmptySegment(index));
        }
        Ok(Self { segments })
    }

    /// A namespace label followed by a single key-material segment.
    pub fn namespaced(label: &str, key_material: &[u8]) -> Result<Self, IdentityError> {
        Self::new(vec![label.as_bytes().to_vec(), key_material.to_vec()])
    }

    /// For key material whose type already guarantees it is non-empty.
    pub(crate) fn from_parts(label: &str, key_material: &[u8]) -> Self {
        debug_assert!(!key_material.is_empty());
        Self {
            segments: vec![label.as_bytes().to_vec(), key_material.to_vec()],
        }
    }

    pub fn segments(&self) -> &[Vec<u8>] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Vec<u8>> {
        self.segments
    }

    /// Derive the chain identifier for this name.
    pub fn chain_id(&self) -> ChainId {
        chain_id_of(&self.segments)
    }
}

/// Derive a chain identifier from raw ordered segments.
pub fn derive_chain_id(segments: &[&[u8]]) -> Result<ChainId, IdentityError> {
    if segments.is_empty() {
        return Err(IdentityError::EmptyChainName);
    }
    if let Some(index) = segments.iter().position(|s| s.is_empty()) {
        return Err(IdentityError::EmptySegment(index));
    }
    Ok(chain_id_of(segments))
}

fn chain_id_of<S: AsRef<[u8]>>(segments: &[S]) -> ChainId {
    let mut hasher = Sha256::new();
    for segment in segments {
        hasher.update(sha256(segment.as_ref()));
    }
    ChainId(hasher.finalize().into())
}
