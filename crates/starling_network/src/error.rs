//! Mesh error types.

use std::time::Duration;

/// Errors that can occur in the starling_network crate.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// A transport-level error (TCP or WebSocket connect/send/receive).
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON serialization / deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An operation timed out.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// Start was called on a node that had already been stopped.
    #[error("Node already stopped")]
    AlreadyStopped,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
