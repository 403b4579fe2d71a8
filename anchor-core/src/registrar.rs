//! Idempotent chain registration for entities.

use crate::crypto::Signer;
use crate::entity::Entity;
use crate::entry::NewChain;
use crate::ledger::{Ledger, LedgerError};
use crate::submit::{submit_chain, SubmitError};
use crate::types::TxId;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Outcome of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The chain was created by this call.
    Created(TxId),
    /// The chain already existed; nothing was submitted.
    AlreadyRegistered,
}

impl Registration {
    /// Transaction ID of the creation, `None` when nothing was submitted.
    pub fn tx_id(&self) -> Option<&TxId> {
        match self {
            Registration::Created(tx_id) => Some(tx_id),
            Registration::AlreadyRegistered => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("existence check failed: {0}")]
    ExistenceCheck(#[source] LedgerError),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Creates identity chains, paying with a funding key.
pub struct Registrar {
    ledger: Arc<dyn Ledger>,
    payer: Signer,
}

impl Registrar {
    pub fn new(ledger: Arc<dyn Ledger>, payer: Signer) -> Self {
        Self { ledger, payer }
    }

    /// Whether the entity's chain exists.
    pub async fn is_registered(&self, entity: &dyn Entity) -> Result<bool, LedgerError> {
        self.ledger.chain_exists(&entity.chain_id()).await
    }

    /// Create the entity's chain unless it already exists.
    ///
    /// Safe to call on every start. A `RevealFailed` error means the commit
    /// went through; check existence again before retrying.
    pub async fn register(&self, entity: &dyn Entity) -> Result<Registration, RegisterError> {
        let chain_id = entity.chain_id();
        if self
            .is_registered(entity)
            .await
            .map_err(RegisterError::ExistenceCheck)?
        {
            info!("{} chain {} already registered", entity.kind(), chain_id);
            return Ok(Registration::AlreadyRegistered);
        }

        let chain = NewChain::new(entity.chain_name(), Vec::new());
        let submitted = submit_chain(self.ledger.as_ref(), &chain, &self.payer).await?;
        info!(
            "Registered {} chain {} in tx {}",
            entity.kind(),
            chain_id,
            submitted.tx_id
        );
        Ok(Registration::Created(submitted.tx_id))
    }
}

impl std::fmt::Debug for Registrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar")
            .field("ledger", &self.ledger.name())
            .field("payer", &self.payer)
            .finish()
    }
}
