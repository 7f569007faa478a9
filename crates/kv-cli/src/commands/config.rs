//! Config command - validates and prints a fleet configuration.

use anyhow::{Context, Result};
use kv_config::FleetConfig;

pub fn run(path: &str) -> Result<()> {
    let fleet = FleetConfig::load(path).with_context(|| format!("loading config at {path}"))?;

    println!("Config OK: {path}");
    println!("  netAddr:  {}", fleet.net_addr);
    println!("  netType:  {}", fleet.net_type);
    println!("  payload:  {} bytes", fleet.payload_size);
    println!("  replicas: {}", fleet.num_servers);
    println!();
    println!("  {:>3}  {:>10}  {:>10}  {:>10}", "idx", "client", "peer", "kv-store");
    for i in 0..fleet.num_servers {
        println!(
            "  {i:>3}  {:>10}  {:>10}  {:>10}",
            fleet.client_port(i),
            fleet.server_port(i),
            fleet.kv_store_port(i)
        );
    }

    Ok(())
}
