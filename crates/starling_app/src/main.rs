//! Starling — terminal chat client for the mesh.
//!
//! Reads lines from stdin and fans them out to every live peer, while
//! printing messages received from peers. Runs until Ctrl-C.

mod logging;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use starling_network::{NetworkConfig, StarlingNode};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Per-user data directory (`~/.starling`).
fn base_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".starling"))
}

/// Load the config file, writing a default one on first run.
fn load_config(path: &Path) -> Result<NetworkConfig> {
    if !path.exists() {
        let config = NetworkConfig::default();
        config.save_to_file(path)?;
        info!("Created default config at {}", path.display());
        return Ok(config);
    }
    Ok(NetworkConfig::load_or_default(path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let base = base_dir()?;
    let _log_guard = logging::init_logging(&base.join("logs"))?;
    info!("Starting Starling v{VERSION}");

    let config = load_config(&base.join("config.json"))?;
    info!(
        "Joining mesh as '{}' (monitor at {}, listening on port {})",
        config.display_name, config.monitor_host, config.mesh_port
    );

    let mut node = StarlingNode::new(config);
    let mut inbox = node.take_inbox().context("Inbox already taken")?;
    node.start().await?;

    // Print every message received from peers.
    tokio::spawn(async move {
        while let Some(msg) = inbox.recv().await {
            println!("{msg}");
        }
    });

    // Pump stdin lines into the fan-out sender.
    let input_tx = node.input();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if input_tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    info!("Stdin closed, no more outbound messages");
                    break;
                }
                Err(e) => {
                    error!("Stdin read failed: {e}");
                    break;
                }
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");
    node.stop().await;

    Ok(())
}
