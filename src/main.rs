//! prefix-router
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                  PREFIX ROUTER                    │
//!                         │                                                   │
//!   :8080 ────────────────┼─▶ listener ─▶ classify ─┬─▶ forward ─────────────┼──▶ backend A
//!                         │   (routes A)             │   (hyper client)       │
//!                         │                          └─▶ websocket relay ─────┼──▶ backend B
//!   :8081 ────────────────┼─▶ listener ─▶ ...            (tungstenite)        │
//!                         │   (routes B)                                      │
//!                         │                                                   │
//!                         │  lifecycle: start all │ SIGINT/SIGTERM │ drain    │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use prefix_router::config::load_config;
use prefix_router::lifecycle::{run_until, shutdown_signal};
use prefix_router::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "prefix-router")]
#[command(about = "Multi-listener reverse proxy routing by path prefix", long_about = None)]
struct Cli {
    /// Path to the YAML (or .toml) configuration file.
    #[arg(short, long, env = "PREFIX_ROUTER_CONFIG", default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("prefix-router: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli.config)?;

    logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        listeners = config.listeners.len(),
        grace_secs = config.shutdown.grace_period_secs,
        "prefix-router starting"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_socket_addr()?);
    }

    let outcome = run_until(config, shutdown_signal()).await.inspect_err(|e| {
        tracing::error!(error = %e, "Startup failed");
    })?;

    tracing::info!(?outcome, "Shutdown complete");
    Ok(())
}
