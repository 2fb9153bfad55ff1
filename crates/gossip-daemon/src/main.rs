//! gossiper: epidemic gossip node.
//!
//! Spreads client messages as rumors, learns routes to every origin it hears
//! from and confirms published transactions by majority acknowledgment.

use anyhow::Result;
use clap::Parser;
use gossip_core::NullCollaborator;
use gossip_daemon::{Args, NodeConfig, launch};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging - respects RUST_LOG env var, defaults to info (or debug with --verbose)
    let default_filter = if args.verbose {
        "debug,gossip_daemon=debug,gossip_core=debug"
    } else {
        "info,gossip_daemon=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = NodeConfig::from_args(&args)?;
    info!("Starting gossiper {}", config.name);
    info!("Gossip address: {}", config.gossip_addr);
    if let Some(ui_addr) = config.ui_addr {
        info!("Client address: {}", ui_addr);
    }

    let node = launch(config, Arc::new(NullCollaborator)).await?;
    info!("Gossiper running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    node.shutdown().await;
    Ok(())
}
