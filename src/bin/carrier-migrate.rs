//! # Carrier Migration CLI
//!
//! Operator entry point: starts a migration run for one carrier and follows it
//! until it completes, aborts, or is interrupted with Ctrl+C.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use carrier_migration::config::ConfigManager;
use carrier_migration::database::MySqlMigrationStore;
use carrier_migration::events::RunEvent;
use carrier_migration::logging::init_structured_logging;
use carrier_migration::orchestration::JobController;

#[derive(Parser)]
#[command(name = "carrier-migrate")]
#[command(about = "Migrate a carrier's rows into the history tables in bounded chunks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (default: $CARRIER_MIGRATION_CONFIG or config/carrier-migration.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a run for a carrier and wait for it to finish
    Run {
        /// Carrier code to migrate
        carrier: String,
    },

    /// Load and validate configuration, then print it with secrets masked
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_structured_logging();

    let code = match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "carrier-migrate failed");
            eprintln!("error: {e:#}");
            1
        }
    };
    process::exit(code);
}

async fn execute(cli: Cli) -> anyhow::Result<i32> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_path(path),
        None => ConfigManager::load(),
    }
    .context("failed to load configuration")?;

    match cli.command {
        Commands::CheckConfig => {
            let mut config = manager.config().clone();
            config.database.url = ConfigManager::mask_database_url(&config.database.url);
            println!("environment: {}", manager.environment());
            println!("source: {}", manager.config_path().display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(0)
        }
        Commands::Run { carrier } => run(&manager, &carrier).await,
    }
}

async fn run(manager: &ConfigManager, carrier: &str) -> anyhow::Result<i32> {
    let config = manager.config();
    info!(
        environment = %manager.environment(),
        database_url = %ConfigManager::mask_database_url(&config.database.url),
        "Connecting to database"
    );
    let store = MySqlMigrationStore::connect(config)
        .await
        .context("failed to connect to database")?;

    let controller = JobController::from_config(config, Arc::new(store));
    let mut events = controller.subscribe();

    let outcome = controller.start_run(carrier);
    println!("{} {}", outcome.status_code(), outcome.message());
    if !outcome.is_accepted() {
        return Ok(1);
    }

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(published) => {
                    let event = published.event;
                    info!(event = event.name(), "Run event");
                    match event {
                        RunEvent::RunCompleted { .. } => {
                            println!("run completed for carrier {carrier}");
                            return Ok(0);
                        }
                        RunEvent::RunAborted { reason, step, .. } => {
                            println!("run aborted at {step:?}: {reason:?}");
                            return Ok(1);
                        }
                        _ => {}
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Event subscriber lagged");
                }
                Err(RecvError::Closed) => bail!("event channel closed before the run finished"),
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl+C")?;
                warn!(carrier = %carrier, "Interrupted. Stopping run.");
                controller.shutdown();
                return Ok(130);
            }
        }
    }
}
