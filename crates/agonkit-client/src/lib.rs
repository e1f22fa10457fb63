//! Client implementation for the agonkit sidecar SDK.
//!
//! A game server talks to its local sidecar to report lifecycle changes,
//! track players, and read or update shared counters and lists. This crate
//! provides:
//!
//! - [`SidecarBuilder`]: immutable, environment-aware configuration
//! - [`Sidecar`]: every sidecar operation in push, discard and future form
//! - [`HealthChecker`]: restart-safe periodic heartbeats
//! - [`Watchers`]: one game server subscription shared by many callbacks
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use agonkit_client::Sidecar;
//!
//! #[tokio::main]
//! async fn main() -> agonkit_core::Result<()> {
//!     let sidecar = Sidecar::builder()
//!         .with_health_check(Duration::from_secs(1), Duration::from_secs(2))
//!         .with_game_server_watcher_executor(tokio::runtime::Handle::current())
//!         .build()?;
//!
//!     sidecar.add_game_server_watcher(|gs| {
//!         println!("game server is now {:?}", gs.status.as_ref().map(|s| &s.state));
//!     })?;
//!     sidecar.start_health_checking()?;
//!     sidecar.ready_future().await?;
//!
//!     let sessions = sidecar.increase_counter_future("sessions", 1).await?;
//!     println!("{} of {} sessions in use", sessions.count, sessions.capacity);
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

pub mod builder;
pub mod client;
pub mod health;
pub mod watcher;

// Re-export commonly used types
pub use builder::SidecarBuilder;
pub use client::Sidecar;
pub use health::{HealthChecker, HeartbeatChannel};
pub use watcher::{GameServerCallback, GameServerSource, Watchers};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::builder::SidecarBuilder;
    pub use crate::client::Sidecar;
    pub use crate::watcher::GameServerCallback;
}
