//! Starling Network — peer node for a monitor-coordinated chat mesh.
//!
//! This crate implements the peer side of a small decentralized messaging
//! mesh. Every peer runs the same four loops; a monitor service tracks who
//! is alive and feeds each peer the current roster.
//!
//! # Architecture
//!
//! - **Liveness**: a periodic TCP beacon carrying [`LIVENESS_MARKER`]
//!   tells the monitor this node is alive.
//! - **Roster**: a persistent WebSocket subscription to the monitor's feed
//!   replaces the live-peer roster on every update.
//! - **Inbound**: a WebSocket listener accepts peer connections and
//!   decodes text frames into [`ChatMessage`]s.
//! - **Fan-out**: each input line is delivered to every live peer over a
//!   short-lived WebSocket connection.
//!
//! The roster is the only state shared between the loops. The feed
//! subscription swaps it atomically; the fan-out sender reads whatever
//! snapshot is current at send time.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use starling_network::{NetworkConfig, StarlingNode};
//!
//! # async fn example() {
//! let mut node = StarlingNode::new(NetworkConfig::default());
//! let mut inbox = node.take_inbox().unwrap();
//!
//! node.start().await.unwrap();
//! node.input().send("hello mesh".to_string()).await.unwrap();
//! if let Some(msg) = inbox.recv().await {
//!     println!("{msg}");
//! }
//! node.stop().await;
//! # }
//! ```

pub mod config;
pub mod error;
pub mod heartbeat;
pub mod listener;
pub mod message;
pub mod node;
pub mod roster;
pub mod sender;
pub mod subscriber;

// ── Re-exports for convenience ──────────────────────────────────────────

pub use config::NetworkConfig;
pub use error::MeshError;
pub use heartbeat::LIVENESS_MARKER;
pub use message::ChatMessage;
pub use node::StarlingNode;
pub use roster::{PeerAddr, Roster, RosterReader, RosterWriter};
