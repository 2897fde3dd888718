//! Node configuration — monitor endpoints, mesh port, timing.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MeshError;

/// Configuration for a starling mesh node.
///
/// Every node in a mesh shares the same monitor endpoints and mesh port;
/// only `display_name` is expected to differ between nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Host or IP address of the central monitor.
    pub monitor_host: String,

    /// TCP port on the monitor that accepts liveness beacons.
    pub heartbeat_port: u16,

    /// WebSocket port on the monitor that publishes the live-peer feed.
    pub feed_port: u16,

    /// Well-known port every node listens on for peer messages.
    pub mesh_port: u16,

    /// Name attached to every outgoing message.
    pub display_name: String,

    /// Interval between liveness beacons to the monitor.
    #[serde(with = "duration_serde")]
    pub heartbeat_interval: Duration,

    /// Bound on each outbound connect/send attempt.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Delay before re-opening a dropped feed subscription.
    #[serde(with = "duration_serde")]
    pub resubscribe_delay: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            monitor_host: "127.0.0.1".to_string(),
            heartbeat_port: 9000,
            feed_port: 9001,
            mesh_port: 9002,
            display_name: "me".to_string(),
            heartbeat_interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(5),
            resubscribe_delay: Duration::from_secs(1),
        }
    }
}

impl NetworkConfig {
    /// The monitor's heartbeat endpoint as a `host:port` pair.
    pub fn heartbeat_addr(&self) -> String {
        format!("{}:{}", self.monitor_host, self.heartbeat_port)
    }

    /// The monitor's peer-feed endpoint as a WebSocket URL.
    pub fn feed_url(&self) -> String {
        format!("ws://{}:{}", self.monitor_host, self.feed_port)
    }

    /// The local listen address for inbound peer connections.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.mesh_port))
    }

    /// Save the config to a JSON file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), MeshError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load config from a JSON file, or return defaults if the file is
    /// missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(data) => match serde_json::from_str::<NetworkConfig>(&data) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Corrupt config file, using defaults: {e}");
                    }
                },
                Err(e) => {
                    tracing::warn!("Unreadable config file, using defaults: {e}");
                }
            }
        }
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(dur: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(dur.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
