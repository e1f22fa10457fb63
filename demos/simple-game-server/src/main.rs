//! Minimal game server driven by the sidecar.
//!
//! ## Running
//!
//! ```bash
//! AGONES_SDK_GRPC_PORT=9357 cargo run -p simple-game-server
//! ```
//!
//! ## What This Demonstrates
//!
//! - Building a client from the process environment
//! - Periodic heartbeats and a game server watcher
//! - Awaiting lifecycle calls and shutting down cleanly on Ctrl-C

use std::time::Duration;

use agonkit::prelude::*;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("simple_game_server=info".parse()?)
                .add_directive("agonkit_transport=info".parse()?),
        )
        .init();

    let sidecar = Sidecar::builder()
        .with_health_check(Duration::from_secs(1), Duration::from_secs(2))
        .with_game_server_watcher_executor(SerialExecutor::current())
        .build()?;

    sidecar.add_game_server_watcher(|gs| {
        let state = gs.status.as_ref().map_or("unknown", |s| s.state.as_str());
        info!(state, "Game server updated");
    })?;
    sidecar.start_health_checking()?;

    sidecar.ready_future().await?;
    sidecar.set_label("demo", "simple-game-server");
    info!("Game server is ready; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;

    if let Err(e) = sidecar.shutdown_future().await {
        warn!("Sidecar rejected shutdown: {e}");
    }
    sidecar.close().await;
    info!("Closed sidecar connection");
    Ok(())
}
