//! # Anchor Core
//!
//! Anchors tamper-evident fingerprints of vehicle telemetry and video segments
//! to an append-only ledger, and verifies local files against them later.
//!
//! ## Key Features
//! - **Deterministic chain identity**: chain IDs derived from namespace + key material
//! - **Idempotent registration**: safe to register on every start
//! - **Signed anchors**: Ed25519 signature + public key stored with each fingerprint
//! - **Ownership-scoped verification**: only records signed by the claimed owner count
//! - **Pluggable ledger**: any backend implementing [`Ledger`]

pub mod anchor;
pub mod crypto;
pub mod entity;
pub mod entry;
pub mod fingerprint;
pub mod identity;
pub mod ledger;
#[cfg(feature = "async")]
pub mod pipeline;
pub mod receipt;
pub mod registrar;
pub mod submit;
pub mod types;
pub mod verify;

pub use anchor::{AnchorFileError, Anchorer};
pub use crypto::{verify_signature, Signer};
pub use entity::{Entity, Person, Vehicle, Vin};
pub use entry::{Entry, EntryError, NewChain};
pub use fingerprint::{fingerprint, fingerprint_file};
pub use identity::{derive_chain_id, ChainName, IdentityError};
pub use ledger::{Ledger, LedgerError, MemoryLedger};
#[cfg(feature = "async")]
pub use pipeline::{AnchorPipeline, PipelineConfig, PipelineReport};
pub use receipt::AnchorReceipt;
pub use registrar::{RegisterError, Registrar, Registration};
pub use submit::{SubmitError, Submitted};
pub use types::*;
pub use verify::{IntegrityVerifier, VerifyError};

/// Re-export for convenience
pub use ed25519_dalek::{SigningKey, VerifyingKey};
