//! Bench command - runs a short cross-replica scenario against a locally
//! spawned 3-replica fleet, the CLI counterpart to the source system's
//! `kv_*_test.go` scenario files (spec.md §8, S1/S2/S5).

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use kv_client::Client;
use kv_config::FleetConfig;
use kv_types::{ConsistencyMode, Key, Value};

const BASE_PORT: u16 = 23000;
const NUM_SERVERS: usize = 3;

fn bench_fleet() -> FleetConfig {
    let ports = |offset: u16| -> Vec<String> {
        (0..NUM_SERVERS as u16).map(|i| (BASE_PORT + offset + i).to_string()).collect()
    };
    FleetConfig {
        net_addr: "127.0.0.1".to_owned(),
        net_type: "tcp".to_owned(),
        payload_size: 4096,
        num_servers: NUM_SERVERS,
        client_ports: ports(0),
        server_ports: ports(100),
        kv_store_ports: ports(200),
    }
}

fn client_addr(fleet: &FleetConfig, index: usize) -> SocketAddr {
    format!("{}:{}", fleet.net_addr, fleet.client_port(index))
        .parse()
        .expect("bench ports are always valid socket addresses")
}

pub async fn run(mode: &str) -> Result<()> {
    let mode: ConsistencyMode = mode
        .parse()
        .with_context(|| format!("unrecognized consistency mode {mode:?}"))?;
    let fleet = bench_fleet();

    println!("Starting a {NUM_SERVERS}-replica {mode} fleet on 127.0.0.1:{BASE_PORT}..");
    let handles = kv_server::start_fleet(&fleet, mode)
        .await
        .context("failed to start bench fleet")?;

    let key = Key::from("bench");
    let value = Value::from("hello");
    let writer = Client::new(client_addr(&fleet, 0), true, fleet.payload_size);
    writer
        .write(&key, &value)
        .await
        .context("write to replica 0 failed")?;

    tokio::time::sleep(Duration::from_millis(250)).await;

    let mut all_ok = true;
    for index in 0..fleet.num_servers {
        let reader = Client::new(client_addr(&fleet, index), true, fleet.payload_size);
        match reader.read(&key).await {
            Ok((seen, _)) if seen == value => {
                println!("  replica {index}: OK ({seen})");
            }
            Ok((seen, _)) => {
                all_ok = false;
                println!("  replica {index}: MISMATCH (got {seen}, want {value})");
            }
            Err(err) => {
                all_ok = false;
                println!("  replica {index}: ERROR ({err})");
            }
        }
    }

    for handle in handles {
        handle.shutdown().await;
    }

    println!();
    if all_ok {
        println!("bench OK: all replicas converged on the write");
        Ok(())
    } else {
        anyhow::bail!("bench failed: not every replica converged")
    }
}
