//! Example: Anchoring a driving session and verifying it afterwards
//!
//! Run with: cargo run --example anchor_session
//! Set RUST_LOG=anchor_core=debug to see ledger traffic.

use anchor_core::receipt::AnchorReceipt;
use anchor_core::{
    AnchorPipeline, Anchorer, Entity, IntegrityVerifier, MemoryLedger, Person, PipelineConfig,
    Registrar, Signer, Vehicle,
};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Telemetry Anchor - Example Session\n");

    let ledger = Arc::new(MemoryLedger::new());
    let payer = Signer::generate();

    // Step 1: identities
    println!("1. Registering vehicle and driver...");
    let driver = Person::new(Signer::generate());
    let mut vehicle = Vehicle::from_vin("1234567890ABCDEFH")?;
    vehicle.set_owner(&driver);

    let registrar = Registrar::new(ledger.clone(), payer.clone());
    let entities: [&dyn Entity; 2] = [&vehicle, &driver];
    for entity in entities {
        let outcome = registrar.register(entity).await?;
        println!("   {} chain {}: {:?}", entity.kind(), entity.chain_id(), outcome);
    }
    // Registering again is a no-op
    let again = registrar.register(&vehicle).await?;
    println!("   re-register vehicle: {:?}\n", again);

    // Step 2: acquisition writes blobs, the pipeline anchors them
    println!("2. Recording and anchoring telemetry...");
    let dir = tempfile::tempdir()?;
    let anchorer = Arc::new(Anchorer::new(ledger.clone(), payer));
    let pipeline = AnchorPipeline::spawn(
        anchorer,
        vehicle.chain_id(),
        driver.signer().clone(),
        PipelineConfig::default(),
    );

    let mut blobs = Vec::new();
    for i in 0..3 {
        let path = dir
            .path()
            .join(format!("{}-{}.can", Utc::now().format("%Y%m%dT%H%M%S"), i));
        std::fs::write(&path, format!("speed={} rpm={}", 40 + i, 2000 + 100 * i))
            .with_context(|| format!("writing {}", path.display()))?;
        pipeline.submit(path.clone()).await?;
        blobs.push(path);
    }
    let report = pipeline.finish().await?;
    println!(
        "   anchored {}, failed {}\n",
        report.anchored.len(),
        report.failed.len()
    );

    // Step 3: verification
    println!("3. Verifying recorded files...");
    let verifier = IntegrityVerifier::new(ledger.clone());
    let owner = driver.public_key();
    for blob in &blobs {
        let ok = verifier.verify_file(&vehicle.chain_id(), blob, &owner).await?;
        println!("   {}: {}", blob.display(), if ok { "authentic" } else { "NOT anchored" });
    }

    // Step 4: tampering is detected
    println!("\n4. Tampering with the first file...");
    std::fs::write(&blobs[0], "speed=12 rpm=900")?;
    let ok = verifier.verify_file(&vehicle.chain_id(), &blobs[0], &owner).await?;
    println!("   {}: {}", blobs[0].display(), if ok { "authentic" } else { "NOT anchored" });

    // Step 5: point lookup through the receipt sidecar
    println!("\n5. Checking single records via receipts...");
    for blob in &blobs {
        let receipt = AnchorReceipt::read_sidecar(blob)?;
        let ok = verifier.check_record(blob, &receipt.entry_hash, &owner).await?;
        println!("   entry {}: {}", receipt.entry_hash, if ok { "matches" } else { "differs" });
    }

    println!("\nDone.");
    Ok(())
}
