//! Core types for the agonkit sidecar SDK.
//!
//! This crate holds everything the other agonkit crates share:
//!
//! - [`proto`]: the generated wire schema of the three sidecar surfaces
//!   (`agones.dev.sdk`, `agones.dev.sdk.alpha`, `agones.dev.sdk.beta`)
//! - [`error`]: the unified [`Error`] type and [`Result`] alias
//! - [`types`]: plain snapshot records for lists and counters
//! - [`sink`]: response sinks that adapt streamed RPC results into
//!   callbacks, mapped sinks and futures
//! - [`executor`]: the execution-context abstraction used for heartbeats
//!   and watcher callbacks
//!
//! # Example
//!
//! ```rust
//! use agonkit_core::sink::{self, ResponseSink};
//!
//! # tokio_test::block_on(async {
//! let (mut sink, future) = sink::pending::<i64>();
//! sink.on_next(42);
//! sink.on_completed();
//! assert_eq!(future.await.unwrap(), 42);
//! # });
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod executor;
pub mod proto;
pub mod sink;
pub mod types;

pub use error::{CallbackError, Error, Feature, Result};
pub use executor::{Executor, SerialExecutor, Task};
pub use sink::{DiscardSink, FutureSink, MappedSink, ResponseFuture, ResponseSink};
pub use types::{CounterSnapshot, ListSnapshot};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{CallbackError, Error, Feature, Result};
    pub use crate::executor::{Executor, SerialExecutor};
    pub use crate::sink::{DiscardSink, ResponseFuture, ResponseSink};
    pub use crate::types::{CounterSnapshot, ListSnapshot};
}
