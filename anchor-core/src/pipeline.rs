//! Anchoring blobs as acquisition produces them.
//!
//! Acquisition hands over paths of closed blob files through a bounded
//! channel; a single worker per chain fingerprints and anchors them in
//! arrival order. The bound applies back-pressure to the producer when the
//! ledger falls behind.

use crate::anchor::Anchorer;
use crate::crypto::Signer;
use crate::receipt::AnchorReceipt;
use crate::types::ChainId;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline worker has stopped")]
    Closed,

    #[error("pipeline worker panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Blobs that may wait for anchoring before producers block.
    pub capacity: usize,
    /// Write a receipt sidecar next to each anchored blob.
    pub write_receipts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: 16,
            write_receipts: true,
        }
    }
}

/// What the worker did with each blob.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub anchored: Vec<AnchorReceipt>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Handle to a running anchoring worker.
pub struct AnchorPipeline {
    sender: mpsc::Sender<PathBuf>,
    worker: JoinHandle<PipelineReport>,
}

impl AnchorPipeline {
    /// Start a worker anchoring onto `chain_id`, signing with `signer`.
    pub fn spawn(
        anchorer: Arc<Anchorer>,
        chain_id: ChainId,
        signer: Signer,
        config: PipelineConfig,
    ) -> Self {
        let (sender, mut receiver) = mpsc::channel::<PathBuf>(config.capacity.max(1));

        let worker = tokio::spawn(async move {
            let mut report = PipelineReport::default();
            while let Some(path) = receiver.recv().await {
                match anchorer.anchor_file(chain_id, &path, &signer).await {
                    Ok(receipt) => {
                        if config.write_receipts {
                            if let Err(e) = receipt.write_sidecar(&path) {
                                warn!("Anchored {} but could not write receipt: {}", path.display(), e);
                            }
                        }
                        report.anchored.push(receipt);
                    }
                    Err(e) => {
                        warn!("Failed to anchor {}: {}", path.display(), e);
                        report.failed.push((path, e.to_string()));
                    }
                }
            }
            info!(
                "Pipeline for chain {} finished: {} anchored, {} failed",
                chain_id,
                report.anchored.len(),
                report.failed.len()
            );
            report
        });

        Self { sender, worker }
    }

    /// Queue a closed blob file, waiting while the queue is full.
    pub async fn submit(&self, path: PathBuf) -> Result<(), PipelineError> {
        self.sender.send(path).await.map_err(|_| PipelineError::Closed)
    }

    /// A producer handle for acquisition tasks.
    pub fn sender(&self) -> mpsc::Sender<PathBuf> {
        self.sender.clone()
    }

    /// Stop accepting blobs and wait for the queued ones to be processed.
    ///
    /// Producer handles obtained from [`sender`](Self::sender) must be dropped too.
    pub async fn finish(self) -> Result<PipelineReport, PipelineError> {
        drop(self.sender);
        Ok(self.worker.await?)
    }
}
