//! Transport layer for the agonkit sidecar SDK.
//!
//! This crate turns configuration into a live connection:
//!
//! - [`config`] resolves where the sidecar is, from explicit settings and
//!   the `AGONES_SDK_GRPC_*` environment variables
//! - [`handle`] owns the tonic channel, the three surface clients derived
//!   from it, and graceful shutdown
//!
//! # Example
//!
//! ```no_run
//! use agonkit_transport::{SidecarEnv, TargetSpec, TransportHandle};
//!
//! # async fn example() -> agonkit_core::Result<()> {
//! let target = TargetSpec::Unset.resolve(&SidecarEnv::from_process())?;
//! let handle = TransportHandle::new(target.connect_lazy()?, tokio::runtime::Handle::current());
//! // ... issue calls through the handle ...
//! handle.close().await;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod handle;

pub use config::{ChannelSource, ConnectionTarget, SidecarEnv, TargetSpec};
pub use handle::{AlphaClient, BetaClient, CoreClient, TransportHandle};
