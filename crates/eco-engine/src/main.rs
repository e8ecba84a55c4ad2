//! Engine binary for the Eco simulation.
//!
//! Wires the markets, the seeded population, and the bounded run loop
//! together, then prints a JSON report of the finished run on stdout.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `eco-config.yaml`
//! 3. Start the goods and labor markets
//! 4. Draw and spawn the population
//! 5. Run ticks until a bound is reached
//! 6. Snapshot every agent, shut the economy down, print the report

mod error;
mod report;
mod spawner;

use std::path::Path;

use eco_core::{EconomyConfig, Economy, LogCallback, log_simulation_end, run_simulation, start_markets};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::report::FinalReport;

/// Configuration file looked up in the working directory.
const CONFIG_FILE: &str = "eco-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, seeding, the run, or the final
/// report fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("eco-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        seed = config.population.seed,
        agents = config.population.agent_count,
        suppliers = config.population.supplier_count,
        max_ticks = config.simulation.max_ticks,
        tick_interval_ms = config.simulation.tick_interval_ms,
        response_timeout_ms = config.market.response_timeout_ms,
        "Configuration loaded"
    );

    let report = run(&config).await?;
    println!("{}", report.to_json()?);

    info!("eco-engine shutdown complete");
    Ok(())
}

/// Run one economy to completion and build its report.
async fn run(config: &EconomyConfig) -> Result<FinalReport, EngineError> {
    // 3. Start markets.
    let context = start_markets(&config.market);

    // 4. Seed the population.
    let plans = spawner::plan_population(&config.population, &config.orchard)?;
    let agents = spawner::spawn_agents(plans, &context);
    let mut economy = Economy::new(context, agents);

    // 5. Run the simulation.
    let mut callback = LogCallback;
    let result = run_simulation(&mut economy, &config.simulation, &mut callback).await;
    let result = match result {
        Ok(result) => result,
        Err(e) => {
            // Still drain the mailboxes before bailing out.
            let _ = economy.shutdown().await;
            return Err(e.into());
        }
    };
    log_simulation_end(&result);

    // 6. Snapshot, shut down, report.
    let market = economy.shutdown().await?;
    let snapshots = economy.snapshots();
    Ok(FinalReport::new(
        config.population.seed,
        result,
        market,
        snapshots,
    ))
}

/// Load `eco-config.yaml` from the working directory, or defaults with
/// environment overrides when the file is absent.
fn load_config() -> Result<EconomyConfig, EngineError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        Ok(EconomyConfig::from_file(config_path)?)
    } else {
        info!("Config file not found, using defaults");
        Ok(EconomyConfig::parse("")?)
    }
}
