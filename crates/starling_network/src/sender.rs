//! Message fan-out — deliver each typed line to every live peer.

use std::time::Duration;

use futures::SinkExt;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::MeshError;
use crate::message::ChatMessage;
use crate::roster::RosterReader;

/// Consume input lines and fan each one out to the current roster.
///
/// Every line becomes one [`ChatMessage`] delivered to every peer in the
/// snapshot taken at send time. The loop ends when the input channel
/// closes or on shutdown.
pub async fn fan_out_lines(
    mut input_rx: mpsc::Receiver<String>,
    roster: RosterReader,
    display_name: String,
    mesh_port: u16,
    attempt_timeout: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            line = input_rx.recv() => {
                match line {
                    Some(line) => {
                        let msg = ChatMessage::new(display_name.clone(), line);
                        fan_out(&msg, &roster, mesh_port, attempt_timeout).await;
                    }
                    None => {
                        debug!("Input closed, fan-out loop ending");
                        break;
                    }
                }
            }
            _ = shutdown.recv() => {
                debug!("Fan-out loop shutting down");
                break;
            }
        }
    }
}

/// One fan-out round: deliver `msg` to every peer in the current
/// snapshot, one short-lived connection per peer. Attempts are
/// independent; a failure is logged and the round moves on. Returns the
/// number of successful deliveries.
pub async fn fan_out(
    msg: &ChatMessage,
    roster: &RosterReader,
    mesh_port: u16,
    attempt_timeout: Duration,
) -> usize {
    let snapshot = roster.snapshot();
    if snapshot.is_empty() {
        debug!("No live peers, nothing to send");
        return 0;
    }

    debug!(
        "Fanning out to {} peers (roster from {})",
        snapshot.len(),
        snapshot.updated_at
    );

    let mut sent = 0;
    for peer in &snapshot.peers {
        let url = peer.ws_url(mesh_port);
        match deliver(&url, msg, attempt_timeout).await {
            Ok(()) => sent += 1,
            Err(e) => warn!("Delivery to {url} failed: {e}"),
        }
    }

    info!("Delivered to {sent}/{} live peers", snapshot.len());
    sent
}

/// One delivery attempt, bounded by `limit`.
async fn deliver(url: &str, msg: &ChatMessage, limit: Duration) -> Result<(), MeshError> {
    match timeout(limit, connect_and_send(url, msg)).await {
        Ok(result) => result,
        Err(_) => Err(MeshError::Timeout(limit)),
    }
}

/// Connect, send the payload as a single text frame, close.
async fn connect_and_send(url: &str, msg: &ChatMessage) -> Result<(), MeshError> {
    let json = msg.to_json()?;

    let (mut ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| MeshError::Transport(format!("Connect to {url} failed: {e}")))?;

    ws_stream
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| MeshError::Transport(format!("Send to {url} failed: {e}")))?;

    let _ = ws_stream.close(None).await;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
