//! Peer-feed subscription — the monitor tells us who is alive.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::roster::{RosterWriter, parse_peer_list};

/// Follow the monitor's peer feed until shutdown.
///
/// Holds one persistent WebSocket subscription to `url`. Every received
/// text frame is the complete live-peer list and replaces the roster
/// wholesale. A dropped or poisoned connection is reopened after
/// `retry_delay`; the roster keeps its last value in between.
pub async fn follow_feed(
    url: String,
    roster: RosterWriter,
    retry_delay: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    tokio::select! {
        _ = subscribe_loop(&url, &roster, retry_delay) => {}
        _ = shutdown.recv() => {
            debug!("Feed subscriber shutting down");
        }
    }
}

/// Connect-read-reconnect forever.
async fn subscribe_loop(url: &str, roster: &RosterWriter, retry_delay: Duration) {
    loop {
        match connect_async(url).await {
            Ok((mut ws_stream, _)) => {
                info!("Subscribed to peer feed at {url}");

                while let Some(frame) = ws_stream.next().await {
                    match frame {
                        Ok(Message::Text(text)) => match parse_peer_list(&text) {
                            Ok(peers) => {
                                info!("Live peers: {}", peers.len());
                                roster.replace(peers);
                            }
                            Err(e) => {
                                warn!("Undecodable feed payload, dropping subscription: {e}");
                                break;
                            }
                        },
                        Ok(Message::Close(_)) => {
                            debug!("Feed sent close");
                            break;
                        }
                        Ok(_) => {} // Ignore binary/ping/pong
                        Err(e) => {
                            warn!("Feed read error: {e}");
                            break;
                        }
                    }
                }

                warn!("Peer feed disconnected, resubscribing in {retry_delay:?}");
            }
            Err(e) => {
                warn!("Peer feed connect to {url} failed, retrying in {retry_delay:?}: {e}");
            }
        }

        tokio::time::sleep(retry_delay).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
