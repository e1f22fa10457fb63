//! Testing utilities for the agonkit sidecar SDK.
//!
//! This crate provides an in-process stand-in for the sidecar and a few
//! async helpers:
//!
//! - [`MockSidecar`]: a tonic server bound to an ephemeral localhost port
//!   that serves all three surfaces, records every request and keeps just
//!   enough state (game server, players, counters, lists) to answer them
//! - [`async_helpers`]: timeouts and polling waits for async tests
//!
//! # Example
//!
//! ```rust,no_run
//! use agonkit_testing::MockSidecar;
//!
//! # async fn example() -> std::io::Result<()> {
//! let mock = MockSidecar::start().await?;
//! mock.state().set_counter("sessions", 0, 10);
//! let channel = mock.channel();
//! // ... point a client at `channel` or `mock.target()` ...
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod async_helpers;
pub mod mock;

// Re-export commonly used types
pub use async_helpers::{DEFAULT_TIMEOUT, wait_for, with_default_timeout, with_timeout};
pub use mock::{MockSidecar, MockState, RecordedCall};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::async_helpers::{wait_for, with_default_timeout, with_timeout};
    pub use crate::mock::{MockSidecar, MockState, RecordedCall};
}
