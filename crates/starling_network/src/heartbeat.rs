//! Liveness beacons — periodic "I'm alive" signals to the monitor.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::MeshError;

/// The fixed payload written on every beacon connection.
pub const LIVENESS_MARKER: &[u8] = b"Heartbeat!";

/// Send liveness beacons to `addr` every `interval` until shutdown.
///
/// Each beacon is a short-lived TCP connection carrying
/// [`LIVENESS_MARKER`]. The first beacon goes out immediately. A failed
/// attempt is logged and skipped; the next tick proceeds normally, with
/// no retry or backoff in between.
pub async fn emit_beacons(
    addr: String,
    interval: Duration,
    attempt_timeout: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        match send_beacon(&addr, attempt_timeout).await {
            Ok(()) => debug!("Beacon sent to {addr}"),
            Err(e) => warn!("Beacon to {addr} failed: {e}"),
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.recv() => {
                debug!("Beacon loop shutting down");
                break;
            }
        }
    }
}

/// One beacon attempt, bounded by `limit`.
async fn send_beacon(addr: &str, limit: Duration) -> Result<(), MeshError> {
    match timeout(limit, write_marker(addr)).await {
        Ok(result) => result,
        Err(_) => Err(MeshError::Timeout(limit)),
    }
}

/// Connect, write the marker, close. No response is read.
async fn write_marker(addr: &str) -> Result<(), MeshError> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(LIVENESS_MARKER).await?;
    stream.shutdown().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
