//! Commit messages for chain and entry submission.
//!
//! A commit pays for an entry before it is revealed. The payer signs the
//! message with its entry-credit key; the ledger checks that signature and
//! later matches the revealed entry against the committed hash.
//!
//! ## Entry Commit (136 bytes)
//! ```text
//! u8     version (= 0)
//! [6]    timestamp, milliseconds since epoch, big endian
//! [32]   entry hash
//! u8     entry credit cost
//! [32]   payer public key
//! [64]   signature over the first 40 bytes
//! ```
//!
//! ## Chain Commit (200 bytes)
//! ```text
//! u8     version (= 0)
//! [6]    timestamp, milliseconds since epoch, big endian
//! [32]   SHA-256d(chain_id)
//! [32]   commit weld: SHA-256d(entry_hash || chain_id)
//! [32]   first entry hash
//! u8     entry credit cost (entry cost + 10)
//! [32]   payer public key
//! [64]   signature over the first 104 bytes
//! ```

use anchor_core::crypto::{sha256d, Signer};
use anchor_core::entry::{Entry, EntryError, NewChain};
use chrono::{DateTime, Utc};

pub const COMMIT_VERSION: u8 = 0;
pub const ENTRY_COMMIT_LEN: usize = 136;
pub const CHAIN_COMMIT_LEN: usize = 200;

const ENTRY_SIGNED_LEN: usize = 40;
const CHAIN_SIGNED_LEN: usize = 104;

/// Low 48 bits of the millisecond timestamp, big endian.
pub fn milli_timestamp(at: DateTime<Utc>) -> [u8; 6] {
    let millis = at.timestamp_millis().to_be_bytes();
    let mut out = [0u8; 6];
    out.copy_from_slice(&millis[2..]);
    out
}

/// Build and sign an entry commit.
pub fn entry_commit(
    entry: &Entry,
    payer: &Signer,
    at: DateTime<Utc>,
) -> Result<Vec<u8>, EntryError> {
    let mut msg = Vec::with_capacity(ENTRY_COMMIT_LEN);
    msg.push(COMMIT_VERSION);
    msg.extend_from_slice(&milli_timestamp(at));
    msg.extend_from_slice(entry.hash()?.as_bytes());
    msg.push(entry.cost()?);
    debug_assert_eq!(msg.len(), ENTRY_SIGNED_LEN);

    sign_into(&mut msg, payer);
    Ok(msg)
}

/// Build and sign a chain commit.
pub fn chain_commit(
    chain: &NewChain,
    payer: &Signer,
    at: DateTime<Utc>,
) -> Result<Vec<u8>, EntryError> {
    let chain_id = chain.chain_id();
    let entry_hash = chain.first_entry.hash()?;

    let mut weld = Vec::with_capacity(64);
    weld.extend_from_slice(entry_hash.as_bytes());
    weld.extend_from_slice(chain_id.as_bytes());

    let mut msg = Vec::with_capacity(CHAIN_COMMIT_LEN);
    msg.push(COMMIT_VERSION);
    msg.extend_from_slice(&milli_timestamp(at));
    msg.extend_from_slice(&sha256d(chain_id.as_bytes()));
    msg.extend_from_slice(&sha256d(&weld));
    msg.extend_from_slice(entry_hash.as_bytes());
    msg.push(chain.cost()?);
    debug_assert_eq!(msg.len(), CHAIN_SIGNED_LEN);

    sign_into(&mut msg, payer);
    Ok(msg)
}

fn sign_into(msg: &mut Vec<u8>, payer: &Signer) {
    let signature = payer.sign(msg.as_slice());
    msg.extend_from_slice(&payer.public_key_bytes());
    msg.extend_from_slice(&signature.to_bytes());
}
