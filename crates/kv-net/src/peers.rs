//! The fleet's replica-id-to-address table.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use kv_types::ReplicaId;

/// Maps every replica in the fleet (including the local one) to its peer
/// endpoint address. Broadcasts iterate this table to find destinations.
#[derive(Debug, Clone, Default)]
pub struct PeerTable {
    addrs: BTreeMap<ReplicaId, SocketAddr>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ReplicaId, addr: SocketAddr) {
        self.addrs.insert(id, addr);
    }

    pub fn get(&self, id: ReplicaId) -> Option<SocketAddr> {
        self.addrs.get(&id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = ReplicaId> + '_ {
        self.addrs.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_inserted_addresses() {
        let mut table = PeerTable::new();
        table.insert(ReplicaId::new(5000), "127.0.0.1:5000".parse().unwrap());
        table.insert(ReplicaId::new(5001), "127.0.0.1:5001".parse().unwrap());

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get(ReplicaId::new(5000)),
            Some("127.0.0.1:5000".parse().unwrap())
        );
        assert_eq!(table.ids().count(), 2);
    }
}
