//! feedrelay daemon.
//!
//! Runs the origin publisher, dispatcher and destination proxy as one
//! in-process pipeline over a mock upstream feed.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use feedrelay_relayd::{Config, Pipeline};

#[derive(Parser)]
#[command(name = "relayd")]
#[command(version, about = "Cross-ledger price feed relay daemon", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "relayd.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay pipeline
    Run,

    /// Execute a single publish/relay cycle and print the destination state
    Tick,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    info!("feedrelay relayd starting");
    info!("version: {}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli.config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let pipeline = Pipeline::from_config(config)?;
            pipeline.run().await?;
        }
        Commands::Tick => {
            let mut pipeline = Pipeline::from_config(config)?;
            pipeline.tick(1).await?;
            print_status(&pipeline)?;
        }
    }

    Ok(())
}

/// Initialize the tracing subscriber.
fn init_logging(debug: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = if debug {
        EnvFilter::new("feedrelay_relayd=debug,feedrelay_reactor=debug,feedrelay_origin=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

/// Load configuration, falling back to defaults when the file is absent.
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file(path).context("failed to load configuration")
    } else {
        info!(path, "config file not found, using defaults");
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }
}

/// Print the destination's view after a tick.
fn print_status(pipeline: &Pipeline) -> Result<()> {
    let proxy = pipeline
        .proxy
        .lock()
        .map_err(|_| anyhow::anyhow!("destination lock poisoned"))?;

    match proxy.latest_round_data() {
        Some(round) => {
            info!(
                round_id = round.round_id,
                answer = round.answer,
                updated_at = round.updated_at,
                "destination latest round"
            );
        }
        None => info!("destination has no committed rounds"),
    }

    let health = proxy.health_metrics();
    info!(
        healthy = health.healthy,
        total_rounds = health.total_rounds,
        seconds_since_update = ?health.seconds_since_update,
        "destination health"
    );
    Ok(())
}
