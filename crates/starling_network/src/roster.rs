//! The live-peer roster — who the monitor currently believes is alive.
//!
//! The roster is the one piece of state shared between loops: the feed
//! subscriber replaces it wholesale on every update, and the fan-out
//! sender reads it at send time. It is published through a single-writer
//! watch channel holding an `Arc` of an immutable snapshot, so readers
//! can never observe a half-applied update.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

/// The address of one peer on the mesh.
///
/// The feed may list a peer as a bare host (`"192.168.1.7"`) or as
/// `host:port`. A bare host is reached on the mesh-wide messaging port.
///
/// Equality follows the entry as written: a bare host and an explicit
/// `host:port` spelling stay distinct entries even when the configured
/// mesh port makes them the same endpoint. Compare
/// [`effective_port`](PeerAddr::effective_port) values for endpoint
/// identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddr {
    host: String,
    port: Option<u16>,
}

impl PeerAddr {
    /// Parse one feed entry. A trailing `:port` with a numeric port is
    /// split off; bracketed IPv6 (`"[::1]:9002"`) splits the same way.
    /// Anything else is kept whole as a bare host.
    pub fn parse(entry: &str) -> Self {
        if let Some((host, port)) = entry.rsplit_once(':') {
            if let Ok(port) = port.parse::<u16>() {
                let bracketed = host.starts_with('[') && host.ends_with(']');
                if bracketed || (!host.is_empty() && !host.contains(':')) {
                    return Self {
                        host: host.to_string(),
                        port: Some(port),
                    };
                }
            }
        }
        Self {
            host: entry.to_string(),
            port: None,
        }
    }

    /// The peer's host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The peer's messaging port, if the feed listed one explicitly.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// The port a message to this peer actually targets: the entry's own
    /// port if the feed listed one, otherwise `default_port`.
    pub fn effective_port(&self, default_port: u16) -> u16 {
        self.port.unwrap_or(default_port)
    }

    /// The WebSocket URL of this peer's messaging endpoint.
    pub fn ws_url(&self, default_port: u16) -> String {
        format!("ws://{}:{}", self.host, self.effective_port(default_port))
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{port}", self.host),
            None => f.write_str(&self.host),
        }
    }
}

/// Parse one feed payload — a JSON array of peer address strings.
pub fn parse_peer_list(payload: &str) -> Result<Vec<PeerAddr>, serde_json::Error> {
    let entries: Vec<String> = serde_json::from_str(payload)?;
    Ok(entries.iter().map(|e| PeerAddr::parse(e)).collect())
}

/// One immutable snapshot of the live-peer set.
#[derive(Debug, Clone)]
pub struct Roster {
    /// Peers the monitor reported alive, in feed order, duplicates kept.
    pub peers: Vec<PeerAddr>,
    /// When this snapshot was received from the feed.
    pub updated_at: DateTime<Utc>,
}

impl Roster {
    fn empty() -> Self {
        Self {
            peers: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Number of peers in the snapshot.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether the snapshot lists no peers at all.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// Write half of the roster. Exactly one exists per node; it moves into
/// the feed subscriber task on start.
pub struct RosterWriter {
    tx: watch::Sender<Arc<Roster>>,
}

impl RosterWriter {
    /// Replace the entire roster with a freshly received peer list.
    pub fn replace(&self, peers: Vec<PeerAddr>) {
        let roster = Arc::new(Roster {
            peers,
            updated_at: Utc::now(),
        });
        self.tx.send_replace(roster);
    }
}

/// Read half of the roster — cloneable, held by anything that fans out.
#[derive(Clone)]
pub struct RosterReader {
    rx: watch::Receiver<Arc<Roster>>,
}

impl RosterReader {
    /// The current snapshot. The returned value stays intact for as long
    /// as the caller holds it, regardless of later replacements.
    pub fn snapshot(&self) -> Arc<Roster> {
        self.rx.borrow().clone()
    }

    /// Number of peers in the current snapshot.
    pub fn peer_count(&self) -> usize {
        self.rx.borrow().peers.len()
    }
}

/// Create a connected writer/reader pair with an empty initial roster.
pub fn roster_channel() -> (RosterWriter, RosterReader) {
    let (tx, rx) = watch::channel(Arc::new(Roster::empty()));
    (RosterWriter { tx }, RosterReader { rx })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_host() {
        let addr = PeerAddr::parse("192.168.1.7");
        assert_eq!(addr.host(), "192.168.1.7");
        assert_eq!(addr.port(), None);
        assert_eq!(addr.ws_url(9002), "ws://192.168.1.7:9002");
    }

    #[test]
    fn test_parse_host_with_port() {
        let addr = PeerAddr::parse("192.168.1.9:9005");
        assert_eq!(addr.host(), "192.168.1.9");
        assert_eq!(addr.port(), Some(9005));
        assert_eq!(addr.ws_url(9002), "ws://192.168.1.9:9005");
    }

    #[test]
    fn test_parse_hostname_and_ipv6() {
        let named = PeerAddr::parse("node7.local:9002");
        assert_eq!(named.host(), "node7.local");
        assert_eq!(named.port(), Some(9002));

        // Unbracketed IPv6 stays whole; the bracketed form splits.
        let bare = PeerAddr::parse("fe80::1");
        assert_eq!(bare.host(), "fe80::1");
        assert_eq!(bare.port(), None);

        let bracketed = PeerAddr::parse("[::1]:9005");
        assert_eq!(bracketed.host(), "[::1]");
        assert_eq!(bracketed.port(), Some(9005));
        assert_eq!(bracketed.ws_url(9002), "ws://[::1]:9005");
    }

    #[test]
    fn test_parse_non_numeric_port_is_host() {
        let addr = PeerAddr::parse("node7:nine");
        assert_eq!(addr.host(), "node7:nine");
        assert_eq!(addr.port(), None);
    }

    #[test]
    fn test_display_round_trips_the_entry() {
        assert_eq!(PeerAddr::parse("10.0.0.1").to_string(), "10.0.0.1");
        assert_eq!(PeerAddr::parse("10.0.0.1:9005").to_string(), "10.0.0.1:9005");
    }

    #[test]
    fn test_bare_and_explicit_spellings_share_endpoint() {
        let bare = PeerAddr::parse("10.0.0.1");
        let explicit = PeerAddr::parse("10.0.0.1:9002");

        // Distinct entries as written, one endpoint under the mesh port.
        assert_ne!(bare, explicit);
        assert_eq!(bare.effective_port(9002), 9002);
        assert_eq!(explicit.effective_port(9002), 9002);
        assert_eq!(bare.ws_url(9002), explicit.ws_url(9002));

        // Under a different mesh port the explicit entry keeps its own.
        assert_eq!(bare.effective_port(9005), 9005);
        assert_eq!(explicit.effective_port(9005), 9002);
    }

    #[test]
    fn test_parse_peer_list() {
        let peers = parse_peer_list(r#"["192.168.1.7", "192.168.1.9:9005"]"#).unwrap();
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[0], PeerAddr::parse("192.168.1.7"));
        assert_eq!(peers[1].port(), Some(9005));
    }

    #[test]
    fn test_parse_peer_list_rejects_non_array() {
        assert!(parse_peer_list(r#"{"nodes": []}"#).is_err());
        assert!(parse_peer_list("garbage").is_err());
    }

    #[test]
    fn test_parse_peer_list_keeps_duplicates() {
        let peers = parse_peer_list(r#"["10.0.0.1", "10.0.0.1"]"#).unwrap();
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[0], peers[1]);
    }

    #[test]
    fn test_roster_starts_empty() {
        let (_writer, reader) = roster_channel();
        assert!(reader.snapshot().is_empty());
        assert_eq!(reader.peer_count(), 0);
    }

    #[test]
    fn test_replace_swaps_whole_snapshot() {
        let (writer, reader) = roster_channel();

        writer.replace(vec![PeerAddr::parse("10.0.0.1")]);
        let first = reader.snapshot();
        assert_eq!(first.len(), 1);

        writer.replace(vec![PeerAddr::parse("10.0.0.2"), PeerAddr::parse("10.0.0.3")]);
        let second = reader.snapshot();
        assert_eq!(second.len(), 2);

        // The snapshot taken before the second update is untouched.
        assert_eq!(first.len(), 1);
        assert_eq!(first.peers[0], PeerAddr::parse("10.0.0.1"));
    }

    #[test]
    fn test_replace_same_list_is_idempotent() {
        let (writer, reader) = roster_channel();
        let peers = vec![PeerAddr::parse("10.0.0.1"), PeerAddr::parse("10.0.0.2")];

        writer.replace(peers.clone());
        let before = reader.snapshot().peers.clone();
        writer.replace(peers);
        let after = reader.snapshot().peers.clone();
        assert_eq!(before, after);
    }

    #[test]
    fn test_replace_with_empty_list_clears() {
        let (writer, reader) = roster_channel();

        writer.replace(vec![PeerAddr::parse("10.0.0.1")]);
        assert_eq!(reader.peer_count(), 1);

        writer.replace(Vec::new());
        assert!(reader.snapshot().is_empty());
    }

    #[test]
    fn test_readers_share_one_roster() {
        let (writer, reader) = roster_channel();
        let second_reader = reader.clone();

        writer.replace(vec![PeerAddr::parse("10.0.0.9")]);
        assert_eq!(reader.peer_count(), 1);
        assert_eq!(second_reader.peer_count(), 1);
    }
}
