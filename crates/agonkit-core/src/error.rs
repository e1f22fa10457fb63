//! Error types for the sidecar SDK.
//!
//! Every failure surfaces as one [`Error`]. Configuration and precondition
//! errors are returned synchronously, before any network interaction.
//! Transport errors only ever arrive asynchronously, through a sink's error
//! path or a [`ResponseFuture`](crate::sink::ResponseFuture).

use std::any::Any;
use std::fmt;

use miette::Diagnostic;
use thiserror::Error;
use tonic::{Code, Status};

/// Convenience alias used across the agonkit crates.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An optional SDK capability that must be configured before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Periodic heartbeats.
    HealthCheck,
    /// Game server watcher callbacks.
    GameServerWatcher,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HealthCheck => f.write_str("health checking"),
            Self::GameServerWatcher => f.write_str("game server watcher"),
        }
    }
}

/// The error type for all sidecar SDK operations.
///
/// The transport status is boxed to keep `Result<T, Error>` small.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// A required setting could not be resolved while building the client.
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(agonkit::configuration),
        help("Check the AGONES_SDK_GRPC_* environment variables and the builder settings")
    )]
    Configuration {
        /// Human-readable error message.
        message: String,
    },

    /// An optional feature was used without being configured.
    #[error("{feature} is not available: {message}")]
    #[diagnostic(code(agonkit::precondition))]
    Precondition {
        /// The feature that was requested.
        feature: Feature,
        /// Human-readable error message.
        message: String,
    },

    /// A target string could not be turned into an endpoint URI.
    #[error("Invalid endpoint '{target}': {message}")]
    #[diagnostic(code(agonkit::invalid_endpoint))]
    InvalidEndpoint {
        /// The offending target.
        target: String,
        /// Why it was rejected.
        message: String,
    },

    /// The sidecar (or the channel to it) reported a failure.
    #[error("Sidecar call failed: {}: {}", .0.code(), .0.message())]
    #[diagnostic(code(agonkit::transport))]
    Transport(Box<Status>),

    /// A user callback panicked.
    #[error(transparent)]
    #[diagnostic(code(agonkit::callback))]
    Callback(#[from] CallbackError),
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a precondition error for a feature.
    pub fn precondition(feature: Feature, message: impl Into<String>) -> Self {
        Self::Precondition {
            feature,
            message: message.into(),
        }
    }

    /// Create an invalid endpoint error.
    pub fn invalid_endpoint(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            target: target.into(),
            message: message.into(),
        }
    }

    /// The gRPC status code, for transport errors.
    #[must_use]
    pub fn code(&self) -> Option<Code> {
        match self {
            Self::Transport(status) => Some(status.code()),
            _ => None,
        }
    }

    /// The transport status, if this is a transport error.
    #[must_use]
    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::Transport(status) => Some(status),
            _ => None,
        }
    }

    /// Whether this error was raised before any network interaction.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::Precondition { .. } | Self::InvalidEndpoint { .. }
        )
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Self::Transport(Box::new(status))
    }
}

/// A callback panicked while handling an event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("callback panicked: {message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    /// Build from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { message }
    }

    /// The panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
