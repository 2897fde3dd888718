//! StarlingNode — top-level coordinator for the mesh node.
//!
//! [`StarlingNode`] is the primary public API of starling_network. It owns
//! the four background loops:
//! - Liveness beacons (periodic TCP marker to the monitor)
//! - Peer feed subscription (WebSocket roster updates from the monitor)
//! - Inbound listener (accept peer connections into the inbox)
//! - Fan-out sender (deliver each input line to every live peer)

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tracing::info;

use crate::config::NetworkConfig;
use crate::error::MeshError;
use crate::message::ChatMessage;
use crate::roster::{RosterReader, RosterWriter, roster_channel};
use crate::{heartbeat, listener, sender, subscriber};

/// Capacity of the input and inbox channels.
const CHANNEL_CAPACITY: usize = 256;

/// A peer node in the mesh.
///
/// Create one per application instance. Call [`start()`](StarlingNode::start)
/// to spawn the background loops, feed outbound lines through
/// [`input()`](StarlingNode::input), and drain incoming messages from
/// [`take_inbox()`](StarlingNode::take_inbox).
pub struct StarlingNode {
    /// Network configuration.
    config: NetworkConfig,
    /// Shared read handle onto the live-peer roster.
    roster: RosterReader,
    /// Writer half of the roster, handed to the feed subscription on start.
    roster_writer: Option<RosterWriter>,
    /// Sender half of the outbound input channel.
    input_tx: mpsc::Sender<String>,
    /// Receiver half of the input channel, handed to the fan-out loop on start.
    input_rx: Option<mpsc::Receiver<String>>,
    /// Sender half of the inbox, handed to the inbound listener on start.
    inbox_tx: mpsc::Sender<ChatMessage>,
    /// Receiver half of the inbox, claimed by the caller via `take_inbox`.
    inbox_rx: Option<mpsc::Receiver<ChatMessage>>,
    /// The address the listener actually bound, once started.
    local_addr: Option<SocketAddr>,
    /// Shutdown signal broadcaster.
    shutdown_tx: Option<broadcast::Sender<()>>,
    /// Whether the node is currently running.
    running: bool,
}

impl StarlingNode {
    /// Create a new node with the given config.
    pub fn new(config: NetworkConfig) -> Self {
        let (roster_writer, roster) = roster_channel();
        let (input_tx, input_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (inbox_tx, inbox_rx) = mpsc::channel(CHANNEL_CAPACITY);

        Self {
            config,
            roster,
            roster_writer: Some(roster_writer),
            input_tx,
            input_rx: Some(input_rx),
            inbox_tx,
            inbox_rx: Some(inbox_rx),
            local_addr: None,
            shutdown_tx: None,
            running: false,
        }
    }

    /// Create a node with default config.
    pub fn with_defaults() -> Self {
        Self::new(NetworkConfig::default())
    }

    /// Return the node's configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Whether the node is currently running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The address the inbound listener actually bound, once started.
    /// With `mesh_port` 0 this is where the ephemeral port shows up.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Sender half of the input channel. Every line pushed here is
    /// fanned out to all live peers.
    pub fn input(&self) -> mpsc::Sender<String> {
        self.input_tx.clone()
    }

    /// Take the inbox receiver for incoming messages. Returns `None`
    /// after the first call.
    pub fn take_inbox(&mut self) -> Option<mpsc::Receiver<ChatMessage>> {
        self.inbox_rx.take()
    }

    /// A shared read handle onto the live-peer roster.
    pub fn roster(&self) -> RosterReader {
        self.roster.clone()
    }

    /// Start the node — binds the inbound listener and spawns the
    /// beacon, feed, listener, and fan-out loops.
    pub async fn start(&mut self) -> Result<(), MeshError> {
        if self.running {
            return Ok(());
        }

        // The loop inputs are consumed on the first start, so a stopped
        // node stays stopped; build a fresh node to rejoin the mesh.
        // Checked before the bind, which could otherwise fail first while
        // the previous accept loop still holds the mesh port.
        if self.roster_writer.is_none() {
            return Err(MeshError::AlreadyStopped);
        }

        let listener = TcpListener::bind(self.config.listen_addr()).await?;
        let local_addr = listener.local_addr()?;

        let (roster_writer, input_rx) =
            match (self.roster_writer.take(), self.input_rx.take()) {
                (Some(writer), Some(rx)) => (writer, rx),
                _ => return Err(MeshError::AlreadyStopped),
            };

        let (shutdown_tx, _) = broadcast::channel(8);
        self.shutdown_tx = Some(shutdown_tx.clone());

        // Liveness beacons to the monitor.
        tokio::spawn(heartbeat::emit_beacons(
            self.config.heartbeat_addr(),
            self.config.heartbeat_interval,
            self.config.connect_timeout,
            shutdown_tx.subscribe(),
        ));

        // Live-peer feed subscription.
        tokio::spawn(subscriber::follow_feed(
            self.config.feed_url(),
            roster_writer,
            self.config.resubscribe_delay,
            shutdown_tx.subscribe(),
        ));

        // Inbound message listener.
        tokio::spawn(listener::serve(
            listener,
            self.inbox_tx.clone(),
            shutdown_tx.subscribe(),
        ));

        // Fan-out sender.
        tokio::spawn(sender::fan_out_lines(
            input_rx,
            self.roster.clone(),
            self.config.display_name.clone(),
            self.config.mesh_port,
            self.config.connect_timeout,
            shutdown_tx.subscribe(),
        ));

        self.local_addr = Some(local_addr);
        self.running = true;
        info!(
            "StarlingNode '{}' started (listening on {local_addr}, monitor at {})",
            self.config.display_name, self.config.monitor_host
        );
        Ok(())
    }

    /// Stop the node — signals all background loops to end.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        self.running = false;
        info!("StarlingNode '{}' stopped", self.config.display_name);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
