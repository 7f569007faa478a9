//! Start command - boots one replica and runs it until interrupted.

use anyhow::{Context, Result};
use kv_config::FleetConfig;
use kv_types::ConsistencyMode;
use tracing::info;

pub async fn run(path: &str, index: usize, mode: &str) -> Result<()> {
    let fleet = FleetConfig::load(path).with_context(|| format!("loading config at {path}"))?;
    let mode: ConsistencyMode = mode
        .parse()
        .with_context(|| format!("unrecognized consistency mode {mode:?}"))?;

    if index >= fleet.num_servers {
        anyhow::bail!(
            "replica index {index} is out of range for a {}-replica fleet",
            fleet.num_servers
        );
    }

    println!();
    println!("Consistency-model key-value store");
    println!();
    println!("  Config:   {path}");
    println!("  Replica:  {index} of {}", fleet.num_servers);
    println!("  Mode:     {mode}");
    println!("  Client:   {}:{}", fleet.net_addr, fleet.client_port(index));
    println!("  Peer:     {}:{}", fleet.net_addr, fleet.server_port(index));
    println!();

    let handle = kv_server::start_replica(&fleet, index, mode)
        .await
        .context("failed to start replica")?;

    info!("replica ready, waiting for ctrl-c");
    println!("Replica is ready. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    println!();
    println!("Shutting down...");
    handle.shutdown().await;
    println!("Stopped.");

    Ok(())
}
