//! Node Supervisor
//!
//! Runs the node container: loads config, resolves contract addresses,
//! then supervises the enabled services until a signal or a failure ends
//! the run.
//!
//! # Architecture Overview
//!
//! ```text
//!   config.toml ──► config ──► blockchain::contracts (ENS) ──► NodeConfig
//!                                                                  │
//!                                                                  ▼
//!   SIGHUP/INT/TERM/QUIT ──► lifecycle::signals ──► cancel ◄── service factory
//!                                                     │            │
//!                                                     ▼            ▼
//!                                            lifecycle::supervisor (run)
//!                                              ├─ startup: health, chain-monitor
//!                                              └─ shutdown: reverse order
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use node_supervisor::blockchain::BlockchainClient;
use node_supervisor::config::loader::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use node_supervisor::observability::logging;
use node_supervisor::services::{ChainMonitor, HealthServer, ServiceRef};
use node_supervisor::{Container, RunOutcome};

#[derive(Parser, Debug)]
#[command(name = "node-supervisor", version, about = "Supervises a node container's services")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, env = CONFIG_PATH_ENV, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Container name used in logs and the health endpoint.
    #[arg(short, long, default_value = "node-supervisor")]
    name: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut container = Container::new(cli.name.clone()).config_path(cli.config);
    match logging::init() {
        Ok(handle) => container = container.log_handle(handle),
        Err(e) => eprintln!("failed to initialize logging: {}", e),
    }

    tracing::info!("{} v{} starting", cli.name, env!("CARGO_PKG_VERSION"));

    let name = cli.name;
    let outcome = container
        .run(move |ctx, config| {
            let mut services: Vec<ServiceRef> = Vec::new();

            if config.health.enabled {
                services.push(Arc::new(HealthServer::new(config.health.clone(), name, ctx)));
            }

            if config.chain.enabled {
                let client = BlockchainClient::new(config.chain.clone())?;
                services.push(Arc::new(ChainMonitor::new(client, ctx)));
            }

            Ok(services)
        })
        .await;

    if !outcome.is_finished() {
        tracing::warn!(outcome = ?outcome, "container exited before supervising services");
    }
}
