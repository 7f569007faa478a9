//! # kv-config: fleet configuration
//!
//! Loads and validates the flat JSON configuration file that describes a
//! replica fleet: bind address, per-replica port tables, and the payload
//! size cap for the wire protocol. See [`FleetConfig`].

mod error;

use std::path::Path;

pub use error::ConfigError;
use kv_types::ConsistencyMode;
use serde::{Deserialize, Serialize};

/// The fleet-wide configuration loaded at bootstrap.
///
/// Mirrors the source system's flat JSON schema exactly: one bind address,
/// one port table per endpoint kind, each of length `numServers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(rename = "netAddr")]
    pub net_addr: String,

    #[serde(rename = "netType")]
    pub net_type: String,

    #[serde(rename = "payloadSize")]
    pub payload_size: usize,

    #[serde(rename = "numServers")]
    pub num_servers: usize,

    #[serde(rename = "clientPorts")]
    pub client_ports: Vec<String>,

    #[serde(rename = "serverPorts")]
    pub server_ports: Vec<String>,

    #[serde(rename = "kvStorePorts")]
    pub kv_store_ports: Vec<String>,
}

impl FleetConfig {
    /// Loads a fleet configuration from a JSON file on disk, validating it
    /// before returning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: FleetConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a fleet configuration from an in-memory JSON string, validating
    /// it before returning. Used by tests and by callers that already have
    /// the file contents in hand.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: FleetConfig = serde_json::from_str(raw).map_err(|source| {
            ConfigError::ParseError {
                path: "<in-memory>".into(),
                source,
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.net_type != "tcp" {
            return Err(ConfigError::ValidationError(format!(
                "unsupported netType {:?}: only \"tcp\" is supported",
                self.net_type
            )));
        }
        if self.num_servers == 0 {
            return Err(ConfigError::ValidationError(
                "numServers must be at least 1".to_owned(),
            ));
        }
        for (name, ports) in [
            ("clientPorts", &self.client_ports),
            ("serverPorts", &self.server_ports),
            ("kvStorePorts", &self.kv_store_ports),
        ] {
            if ports.len() != self.num_servers {
                return Err(ConfigError::ValidationError(format!(
                    "{name} has {} entries, expected numServers ({})",
                    ports.len(),
                    self.num_servers
                )));
            }
        }
        Ok(())
    }

    /// The client-endpoint port for replica index `i` (0-based).
    pub fn client_port(&self, i: usize) -> &str {
        &self.client_ports[i]
    }

    /// The peer-endpoint port for replica index `i` (0-based).
    pub fn server_port(&self, i: usize) -> &str {
        &self.server_ports[i]
    }

    /// The local-store-endpoint port for replica index `i` (0-based).
    pub fn kv_store_port(&self, i: usize) -> &str {
        &self.kv_store_ports[i]
    }
}

/// A replica's fully resolved startup parameters: its index into the fleet
/// config's port tables, and the consistency mode the whole fleet agreed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaConfig {
    pub index: usize,
    pub mode: ConsistencyMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "netAddr": "127.0.0.1",
            "netType": "tcp",
            "payloadSize": 4096,
            "numServers": 3,
            "clientPorts": ["6000", "6001", "6002"],
            "serverPorts": ["7000", "7001", "7002"],
            "kvStorePorts": ["8000", "8001", "8002"]
        }"#
    }

    #[test]
    fn parses_valid_config() {
        let config = FleetConfig::parse(sample_json()).unwrap();
        assert_eq!(config.num_servers, 3);
        assert_eq!(config.client_port(1), "6001");
        assert_eq!(config.kv_store_port(2), "8002");
    }

    #[test]
    fn rejects_mismatched_port_count() {
        let bad = sample_json().replace(r#""6000", "6001", "6002""#, r#""6000", "6001""#);
        let err = FleetConfig::parse(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn rejects_non_tcp_net_type() {
        let bad = sample_json().replace(r#""netType": "tcp""#, r#""netType": "udp""#);
        let err = FleetConfig::parse(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, sample_json()).unwrap();
        let config = FleetConfig::load(&path).unwrap();
        assert_eq!(config.num_servers, 3);
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let err = FleetConfig::load("/nonexistent/path/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
