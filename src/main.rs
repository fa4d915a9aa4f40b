use anyhow::Context;
use fxsim::services::{MarketSimulator, SimulationClock};
use fxsim::SimulationConfig;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fxsim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = SimulationConfig::from_env();
    info!(
        "Starting {} simulation at {} ({}ms ticks, balance {})",
        config.symbol,
        config.start_price,
        config.tick_interval.as_millis(),
        config.starting_balance
    );

    let simulator = MarketSimulator::from_config(&config);
    let (handle, task) = SimulationClock::spawn(simulator, config.tick_interval, config.event_buffer);

    // Print every snapshot as a JSON line
    let printer = handle.on_tick(|snapshot| match serde_json::to_string(snapshot) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("Failed to serialize snapshot: {}", e),
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Shutting down");

    handle.shutdown().await?;
    let simulator = task.await.context("simulation task panicked")?;
    printer.await.ok();

    let account = simulator.account();
    info!(
        "Session ended after {} ticks at {}: balance {}, margin used {}, {} fills",
        simulator.ticks(),
        simulator.current_price(),
        account.balance,
        account.margin_used,
        simulator.fills().len()
    );

    Ok(())
}
