//! Prelude module for convenient imports.
//!
//! ```rust
//! use agonkit::prelude::*;
//! ```
//!
//! Brings in the client and its builder, the error type, sinks, snapshot
//! records and the wire `GameServer` message.

pub use agonkit_client::{GameServerCallback, Sidecar, SidecarBuilder};
pub use agonkit_core::proto::sdk::GameServer;
pub use agonkit_core::sink::{DiscardSink, ResponseFuture, ResponseSink};
pub use agonkit_core::{
    CounterSnapshot, Error, Executor, Feature, ListSnapshot, Result, SerialExecutor,
};
pub use agonkit_transport::SidecarEnv;
