//! Simulated end-to-end checkout against the mock SDK.
//!
//! Discovers a simulated reader, connects, charges $19.99, and tears the
//! bridge down. Run with:
//!
//! ```sh
//! cargo run -p tapbridge --example simulated_checkout
//! ```

use anyhow::Context;
use tapbridge::Bridge;
use tapbridge_core::{
    ConnectionConfig, DiscoveryConfig, EventName, PaymentIntentParams, Reader, ReaderId,
};
use tapbridge_sdk::MockTerminal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (sdk, control) = MockTerminal::new();
    let (bridge, session) = Bridge::start(sdk)?;

    let reader_id = ReaderId::new("SIM-1")?;
    control
        .add_simulated_reader(Reader::simulated(reader_id.clone(), "Front desk"))
        .await;

    let mut discoveries = bridge.subscribe(EventName::DiscoveryUpdated).await?;
    bridge.discover(DiscoveryConfig::simulated()).await?;
    let update = discoveries.recv().await.context("discovery stream ended")?;
    println!("{}", serde_json::to_string_pretty(&update.payload())?);
    bridge.cancel_discovery().await?;

    let reader = bridge
        .connect(reader_id, ConnectionConfig::default())
        .await?;
    println!(
        "connected to {} ({})",
        reader.id,
        reader.label.as_deref().unwrap_or("unlabeled")
    );

    let intent = bridge
        .create_payment_intent(PaymentIntentParams::new(1999, None)?)
        .await?;
    let collected = bridge
        .collect_payment(intent)
        .await?
        .context("collection was cancelled")?;
    let processed = bridge.process_payment(collected).await?;
    println!(
        "charged {} {} on intent {}",
        processed.amount, processed.currency, processed.id
    );

    bridge.disconnect().await?;
    bridge.invalidate().await?;
    session.await?;
    Ok(())
}
