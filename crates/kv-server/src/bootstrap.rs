//! Mode selection, endpoint wiring, and fleet startup (§2's "Bootstrap &
//! config" component).

use std::net::SocketAddr;

use kv_config::FleetConfig;
use kv_net::PeerTable;
use kv_types::{ConsistencyMode, ReplicaId};
use tracing::info;

use crate::error::ServerError;
use crate::modes::{CausalReplica, EventualReplica, LinearizableReplica, SequentialReplica};
use crate::replica::Replica;
use crate::runtime::{self, ReplicaHandle};

fn socket_addr(net_addr: &str, port: &str) -> Result<SocketAddr, ServerError> {
    format!("{net_addr}:{port}")
        .parse()
        .map_err(|_| kv_config::ConfigError::ValidationError(format!("invalid address {net_addr}:{port}")).into())
}

fn peer_table(fleet: &FleetConfig) -> Result<PeerTable, ServerError> {
    let mut peers = PeerTable::new();
    for port in &fleet.server_ports {
        let id: u32 = port
            .parse()
            .map_err(|_| kv_config::ConfigError::ValidationError(format!("serverPorts entry {port:?} is not numeric")))?;
        let addr = socket_addr(&fleet.net_addr, port)?;
        peers.insert(ReplicaId::new(id), addr);
    }
    Ok(peers)
}

/// Starts replica `index` (0-based into `fleet`'s port tables) in the given
/// consistency `mode`, returning a handle that can be used to shut it down.
pub async fn start_replica(
    fleet: &FleetConfig,
    index: usize,
    mode: ConsistencyMode,
) -> Result<ReplicaHandle, ServerError> {
    let peers = peer_table(fleet)?;
    let self_port: u32 = fleet.server_ports[index].parse().map_err(|_| {
        kv_config::ConfigError::ValidationError("serverPorts entry is not numeric".to_owned())
    })?;
    let self_id = ReplicaId::new(self_port);

    let client_addr = socket_addr(&fleet.net_addr, fleet.client_port(index))?;
    let peer_addr = socket_addr(&fleet.net_addr, fleet.server_port(index))?;

    info!(%mode, replica = %self_id, %client_addr, %peer_addr, "starting replica");

    match mode {
        ConsistencyMode::Linearizable => {
            let replica = LinearizableReplica::new(self_id, peers, fleet.num_servers);
            runtime::spawn(replica, client_addr, peer_addr, fleet.payload_size).await
        }
        ConsistencyMode::Sequential => {
            let replica = SequentialReplica::new(self_id, peers, fleet.num_servers);
            runtime::spawn(replica, client_addr, peer_addr, fleet.payload_size).await
        }
        ConsistencyMode::Causal => {
            let replica = CausalReplica::new(self_id, peers);
            runtime::spawn(replica, client_addr, peer_addr, fleet.payload_size).await
        }
        ConsistencyMode::Eventual => {
            let replica = EventualReplica::new(self_id, peers);
            runtime::spawn(replica, client_addr, peer_addr, fleet.payload_size).await
        }
    }
}

/// Starts every replica named in `fleet` under the same consistency mode —
/// the whole-fleet counterpart to `StartServers` in the source system.
pub async fn start_fleet(
    fleet: &FleetConfig,
    mode: ConsistencyMode,
) -> Result<Vec<ReplicaHandle>, ServerError> {
    let mut handles = Vec::with_capacity(fleet.num_servers);
    for index in 0..fleet.num_servers {
        handles.push(start_replica(fleet, index, mode).await?);
    }
    Ok(handles)
}
