//! End-to-end scenarios against a locally spawned fleet, one per
//! consistency mode. Each test boots a small fleet on fixed ports, drives
//! it through [`kv_client::Client`], and asserts the cross-replica
//! behavior the mode promises.

use std::net::SocketAddr;
use std::time::Duration;

use kv_client::Client;
use kv_config::FleetConfig;
use kv_types::{ConsistencyMode, Key, Value};

fn fleet_config(net_addr: &str, base_port: u16, num_servers: usize) -> FleetConfig {
    let ports = |offset: u16| -> Vec<String> {
        (0..num_servers as u16)
            .map(|i| (base_port + offset + i).to_string())
            .collect()
    };
    FleetConfig {
        net_addr: net_addr.to_owned(),
        net_type: "tcp".to_owned(),
        payload_size: 4096,
        num_servers,
        client_ports: ports(0),
        server_ports: ports(100),
        kv_store_ports: ports(200),
    }
}

fn client_addr(fleet: &FleetConfig, index: usize) -> SocketAddr {
    format!("{}:{}", fleet.net_addr, fleet.client_port(index))
        .parse()
        .unwrap()
}

fn client(fleet: &FleetConfig, index: usize, track_version: bool) -> Client {
    Client::new(client_addr(fleet, index), track_version, fleet.payload_size)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn linearizable_write_is_visible_on_every_replica() {
    let fleet = fleet_config("127.0.0.1", 21000, 3);
    let handles = kv_server::start_fleet(&fleet, ConsistencyMode::Linearizable)
        .await
        .unwrap();

    let writer = client(&fleet, 0, false);
    writer
        .write(&Key::from("x"), &Value::from("1"))
        .await
        .unwrap();

    settle().await;

    for index in 0..fleet.num_servers {
        let reader = client(&fleet, index, false);
        let (value, _) = reader.read(&Key::from("x")).await.unwrap();
        assert_eq!(value, Value::from("1"), "replica {index} did not see the write");
    }

    for handle in handles {
        handle.shutdown().await;
    }
}

#[tokio::test]
async fn sequential_writes_are_observed_in_the_same_order_everywhere() {
    let fleet = fleet_config("127.0.0.1", 21100, 3);
    let handles = kv_server::start_fleet(&fleet, ConsistencyMode::Sequential)
        .await
        .unwrap();

    // Concurrent writes to the same key from two different origin replicas
    // (S2): every replica must agree on which one landed last, not just
    // whichever one it happened to broadcast fastest.
    let writer_r0 = client(&fleet, 0, false);
    let writer_r1 = client(&fleet, 1, false);
    tokio::join!(
        async { writer_r0.write(&Key::from("a"), &Value::from("1")).await.unwrap() },
        async { writer_r1.write(&Key::from("a"), &Value::from("2")).await.unwrap() },
    );

    settle().await;

    let mut seen = Vec::new();
    for index in 0..fleet.num_servers {
        let reader = client(&fleet, index, false);
        let (value, _) = reader.read(&Key::from("a")).await.unwrap();
        seen.push(value);
    }
    assert!(
        seen.windows(2).all(|pair| pair[0] == pair[1]),
        "replicas disagree on sequential order: {seen:?}"
    );

    for handle in handles {
        handle.shutdown().await;
    }
}

#[tokio::test]
async fn sequential_repeated_own_write_is_always_read_back_immediately() {
    let fleet = fleet_config("127.0.0.1", 21150, 3);
    let handles = kv_server::start_fleet(&fleet, ConsistencyMode::Sequential)
        .await
        .unwrap();
    let clients: Vec<Client> = (0..fleet.num_servers)
        .map(|index| client(&fleet, index, false))
        .collect();

    // S4, scaled down from 1000 iterations to keep the test fast: every
    // write must be immediately visible to the next reader's own replica.
    for i in 0..30u32 {
        let writer = &clients[i as usize % fleet.num_servers];
        writer
            .write(&Key::from("x"), &Value::from(i.to_string()))
            .await
            .unwrap();
        let reader = &clients[(i as usize + 1) % fleet.num_servers];
        let (value, _) = reader.read(&Key::from("x")).await.unwrap();
        assert_eq!(value, Value::from(i.to_string()), "iteration {i} read a stale value");
    }

    for handle in handles {
        handle.shutdown().await;
    }
}

#[tokio::test]
async fn causal_read_your_writes_sees_the_coordinators_own_write_immediately() {
    let fleet = fleet_config("127.0.0.1", 21200, 2);
    let handles = kv_server::start_fleet(&fleet, ConsistencyMode::Causal)
        .await
        .unwrap();

    let coordinator = client(&fleet, 0, true);
    coordinator
        .write(&Key::from("y"), &Value::from("first"))
        .await
        .unwrap();
    let (value, version) = coordinator.read(&Key::from("y")).await.unwrap();
    assert_eq!(value, Value::from("first"));
    assert!(version.is_some());

    settle().await;

    let peer = client(&fleet, 1, true);
    let (value, _) = peer.read(&Key::from("y")).await.unwrap();
    assert_eq!(value, Value::from("first"));

    for handle in handles {
        handle.shutdown().await;
    }
}

#[tokio::test]
async fn eventual_writes_converge_across_replicas() {
    let fleet = fleet_config("127.0.0.1", 21300, 3);
    let handles = kv_server::start_fleet(&fleet, ConsistencyMode::Eventual)
        .await
        .unwrap();

    let writer = client(&fleet, 2, false);
    writer
        .write(&Key::from("z"), &Value::from("converged"))
        .await
        .unwrap();

    settle().await;

    for index in 0..fleet.num_servers {
        let reader = client(&fleet, index, false);
        let (value, _) = reader.read(&Key::from("z")).await.unwrap();
        assert_eq!(value, Value::from("converged"), "replica {index} never converged");
    }

    for handle in handles {
        handle.shutdown().await;
    }
}

#[tokio::test]
async fn absent_key_reads_as_the_nil_sentinel() {
    let fleet = fleet_config("127.0.0.1", 21350, 1);
    let handles = kv_server::start_fleet(&fleet, ConsistencyMode::Eventual)
        .await
        .unwrap();

    let reader = client(&fleet, 0, false);
    let (value, _) = reader.read(&Key::from("never-written")).await.unwrap();
    assert_eq!(value, Value::nil());

    for handle in handles {
        handle.shutdown().await;
    }
}

#[tokio::test]
async fn unrecognized_op_gets_the_client_error_sentinel() {
    let fleet = fleet_config("127.0.0.1", 21400, 1);
    let handles = kv_server::start_fleet(&fleet, ConsistencyMode::Linearizable)
        .await
        .unwrap();

    let malformed = kv_wire::WireMessage {
        op: Some("frobnicate".to_owned()),
        key: Some("x".to_owned()),
        ..Default::default()
    };
    let bytes = kv_wire::encode(&malformed).unwrap();

    let response_bytes = kv_net::send_request(client_addr(&fleet, 0), &bytes)
        .await
        .unwrap();
    let response = kv_wire::decode(&response_bytes, fleet.payload_size).unwrap();
    assert_eq!(response.error.as_deref(), Some(kv_wire::CLIENT_ERROR));

    let reader = client(&fleet, 0, false);
    let (value, _) = reader.read(&Key::from("x")).await.unwrap();
    assert_eq!(value, Value::nil(), "a rejected op must not mutate the store");

    for handle in handles {
        handle.shutdown().await;
    }
}
