//! # agonkit - game server sidecar SDK for Rust
//!
//! A client for the local sidecar that manages a dedicated game server's
//! lifecycle. The sidecar listens on `localhost:9357` unless the
//! `AGONES_SDK_GRPC_*` environment variables say otherwise.
//!
//! ## Features
//!
//! - **Every operation three ways**: push into a sink, fire and forget, or
//!   await a future
//! - **Restart-safe heartbeats** over a single persistent stream
//! - **Watcher fan-out**: one subscription, any number of callbacks
//! - **Players, counters and lists** from the alpha and beta surfaces
//! - **Graceful close** with a bounded drain of in-flight calls
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use agonkit::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let sidecar = Sidecar::builder()
//!         .with_health_check(Duration::from_secs(1), Duration::from_secs(2))
//!         .build()?;
//!
//!     sidecar.start_health_checking()?;
//!     sidecar.ready_future().await?;
//!     sidecar.set_label("map", "de_dust2");
//!
//!     sidecar.close().await;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

// Re-export all public items from core
pub use agonkit_core::*;

// Re-export client types
pub use agonkit_client::{GameServerCallback, Sidecar, SidecarBuilder};

// Re-export transport types
pub use agonkit_transport::{ConnectionTarget, SidecarEnv, TargetSpec};

pub mod prelude;

/// Transport module re-exports
pub mod transport {
    //! Connection resolution and the transport handle.
    pub use agonkit_transport::*;
}

/// Client module re-exports
pub mod client {
    //! Client facade, heartbeats and watchers.
    pub use agonkit_client::*;
}
