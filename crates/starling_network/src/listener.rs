//! Inbound listener — the always-on WebSocket server for peer messages.

use std::net::SocketAddr;

use futures::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::message::ChatMessage;

/// Accept peer connections on `listener` until shutdown.
///
/// Every accepted connection runs its own spawned read loop; decoded
/// messages are forwarded into `inbox_tx`. One misbehaving connection
/// never affects the others or the accept loop itself.
pub async fn serve(
    listener: TcpListener,
    inbox_tx: mpsc::Sender<ChatMessage>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        let inbox_tx = inbox_tx.clone();
                        tokio::spawn(handle_connection(stream, peer_addr, inbox_tx));
                    }
                    Err(e) => {
                        error!("TCP accept failed: {e}");
                    }
                }
            }
            _ = shutdown.recv() => {
                info!("Inbound listener shutting down");
                break;
            }
        }
    }
}

/// Read loop for one accepted peer connection.
///
/// A clean peer close ends the loop silently. A read error or an
/// undecodable payload ends (only) this connection.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    inbox_tx: mpsc::Sender<ChatMessage>,
) {
    let mut ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {peer_addr} failed: {e}");
            return;
        }
    };

    debug!("Peer connection from {peer_addr}");

    while let Some(frame) = ws_stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match ChatMessage::from_json(&text) {
                Ok(msg) => {
                    // Inbox receiver gone means the node is winding down.
                    if inbox_tx.send(msg).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("Undecodable message from {peer_addr}, dropping connection: {e}");
                    return;
                }
            },
            Ok(Message::Close(_)) => {
                debug!("Peer {peer_addr} sent close");
                return;
            }
            Ok(_) => {} // Ignore binary/ping/pong
            Err(e) => {
                warn!("Read error from {peer_addr}: {e}");
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use futures::SinkExt;
    use std::time::Duration;
    use tokio_tungstenite::connect_async;

    async fn start_test_listener() -> (
        SocketAddr,
        mpsc::Receiver<ChatMessage>,
        broadcast::Sender<()>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (inbox_tx, inbox_rx) = mpsc::channel(32);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(serve(listener, inbox_tx, shutdown_rx));
        (addr, inbox_rx, shutdown_tx)
    }

    #[tokio::test]
    async fn test_inbound_message_reaches_inbox() {
        let (addr, mut inbox_rx, _shutdown_tx) = start_test_listener().await;

        let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        ws.send(Message::Text(
            r#"{"sender":"node7","message":"ping"}"#.into(),
        ))
        .await
        .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), inbox_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.sender, "node7");
        assert_eq!(received.message, "ping");
        assert_eq!(received.to_string(), "node7: ping");
    }

    #[tokio::test]
    async fn test_bad_payload_drops_only_that_connection() {
        let (addr, mut inbox_rx, _shutdown_tx) = start_test_listener().await;

        // A connection that sends garbage gets dropped.
        let (mut bad, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        bad.send(Message::Text("not a chat message".into()))
            .await
            .unwrap();

        // A healthy connection made afterwards still works.
        let (mut good, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        good.send(Message::Text(
            r#"{"sender":"a","message":"still here"}"#.into(),
        ))
        .await
        .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), inbox_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.message, "still here");

        // The listener closed the bad connection from its side.
        let end = tokio::time::timeout(Duration::from_secs(2), bad.next())
            .await
            .unwrap();
        assert!(matches!(end, Some(Ok(Message::Close(_))) | Some(Err(_)) | None));
    }

    #[tokio::test]
    async fn test_concurrent_connections_interleave() {
        let (addr, mut inbox_rx, _shutdown_tx) = start_test_listener().await;

        let (mut a, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        let (mut b, _) = connect_async(format!("ws://{addr}")).await.unwrap();

        a.send(Message::Text(r#"{"sender":"a","message":"one"}"#.into()))
            .await
            .unwrap();
        b.send(Message::Text(r#"{"sender":"b","message":"two"}"#.into()))
            .await
            .unwrap();
        a.close(None).await.unwrap();
        b.close(None).await.unwrap();

        let mut senders = Vec::new();
        for _ in 0..2 {
            let msg = tokio::time::timeout(Duration::from_secs(2), inbox_rx.recv())
                .await
                .unwrap()
                .unwrap();
            senders.push(msg.sender);
        }
        senders.sort();
        assert_eq!(senders, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_non_text_frames_are_ignored() {
        let (addr, mut inbox_rx, _shutdown_tx) = start_test_listener().await;

        let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        ws.send(Message::Binary(vec![1, 2, 3].into())).await.unwrap();
        ws.send(Message::Text(r#"{"sender":"a","message":"after binary"}"#.into()))
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), inbox_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.message, "after binary");
    }

    #[tokio::test]
    async fn test_shutdown_stops_accepting() {
        let (addr, _inbox_rx, shutdown_tx) = start_test_listener().await;

        shutdown_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // The listening socket is gone once the accept loop exits.
        let result = connect_async(format!("ws://{addr}")).await;
        assert!(result.is_err());
    }
}
