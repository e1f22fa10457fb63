//! Connection target resolution.
//!
//! The sidecar is found through three environment variables. Reading them
//! happens in exactly one place, [`SidecarEnv::from_process`]; everything
//! else takes a [`SidecarEnv`] value so resolution stays deterministic and
//! testable.
//!
//! Resolution precedence, highest first:
//!
//! 1. an explicit channel (handled by the client builder)
//! 2. an explicit target string, or the address variable on request
//! 3. an explicit host and port
//! 4. a host, with the port from the environment or the default
//! 5. a port, with the host from the environment or `localhost`
//! 6. the address variable verbatim if set, otherwise environment host and
//!    port, otherwise `localhost:9357`

use std::fmt;

use agonkit_core::{Error, Result};
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, warn};

/// Host used when nothing else is configured.
pub const DEFAULT_HOST: &str = "localhost";

/// Port used when nothing else is configured (or the variable is garbage).
pub const DEFAULT_PORT: u16 = 9357;

/// Environment variable holding the sidecar host.
pub const ENV_HOST: &str = "AGONES_SDK_GRPC_HOST";

/// Environment variable holding the sidecar port.
pub const ENV_PORT: &str = "AGONES_SDK_GRPC_PORT";

/// Environment variable holding a full sidecar address. Takes precedence
/// over host and port.
pub const ENV_ADDRESS: &str = "AGONES_SDK_GRPC_ADDRESS";

/// A snapshot of the sidecar environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidecarEnv {
    host: Option<String>,
    port: Option<String>,
    address: Option<String>,
}

impl SidecarEnv {
    /// An empty environment (all defaults).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read the variables from the process environment.
    #[must_use]
    pub fn from_process() -> Self {
        let read = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        let env = Self {
            host: read(ENV_HOST),
            port: read(ENV_PORT),
            address: read(ENV_ADDRESS),
        };
        debug!(?env, "Read sidecar environment");
        env
    }

    /// Set the host variable.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the raw port variable.
    #[must_use]
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// Set the address variable.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// The host, or [`DEFAULT_HOST`].
    #[must_use]
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    /// The port, or [`DEFAULT_PORT`] when unset or unparsable.
    #[must_use]
    pub fn port(&self) -> u16 {
        match self.port.as_deref() {
            None => DEFAULT_PORT,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = raw, "{ENV_PORT} is not a valid port, using {DEFAULT_PORT}");
                DEFAULT_PORT
            }),
        }
    }

    /// The address variable, if set.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

/// A fully resolved sidecar location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    /// A host and port pair.
    Address {
        /// Host name or IP.
        host: String,
        /// TCP port.
        port: u16,
    },
    /// A target string, used as given (a scheme is added if missing).
    Target(String),
}

impl ConnectionTarget {
    /// The URI tonic connects to.
    #[must_use]
    pub fn endpoint_uri(&self) -> String {
        match self {
            Self::Address { host, port } => format!("http://{host}:{port}"),
            Self::Target(target) if target.contains("://") => target.clone(),
            Self::Target(target) => format!("http://{target}"),
        }
    }

    /// Create a lazily connecting channel to this target.
    ///
    /// No I/O happens here; the connection is established on first use.
    /// Must be called within a tokio runtime context.
    pub fn connect_lazy(&self) -> Result<Channel> {
        let uri = self.endpoint_uri();
        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| Error::invalid_endpoint(uri, e.to_string()))?;
        Ok(endpoint.connect_lazy())
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address { host, port } => write!(f, "{host}:{port}"),
            Self::Target(target) => f.write_str(target),
        }
    }
}

/// How the target should be determined; the unresolved form of
/// [`ConnectionTarget`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TargetSpec {
    /// Nothing configured: use the environment or defaults.
    #[default]
    Unset,
    /// An explicit target string.
    Target(String),
    /// The address variable, which must be set.
    TargetFromEnv,
    /// An explicit host and port.
    Address {
        /// Host name or IP.
        host: String,
        /// TCP port.
        port: u16,
    },
    /// An explicit host; port from the environment.
    Host(String),
    /// An explicit port; host from the environment.
    Port(u16),
}

impl TargetSpec {
    /// Resolve against an environment snapshot.
    pub fn resolve(&self, env: &SidecarEnv) -> Result<ConnectionTarget> {
        let target = match self {
            Self::Unset => match env.address() {
                Some(address) => ConnectionTarget::Target(address.to_string()),
                None => ConnectionTarget::Address {
                    host: env.host().to_string(),
                    port: env.port(),
                },
            },
            Self::Target(target) => ConnectionTarget::Target(target.clone()),
            Self::TargetFromEnv => match env.address() {
                Some(address) => ConnectionTarget::Target(address.to_string()),
                None => {
                    return Err(Error::configuration(format!(
                        "{ENV_ADDRESS} is not set but the target was requested from the environment"
                    )));
                }
            },
            Self::Address { host, port } => ConnectionTarget::Address {
                host: host.clone(),
                port: *port,
            },
            Self::Host(host) => ConnectionTarget::Address {
                host: host.clone(),
                port: env.port(),
            },
            Self::Port(port) => ConnectionTarget::Address {
                host: env.host().to_string(),
                port: *port,
            },
        };
        debug!(spec = ?self, %target, "Resolved sidecar target");
        Ok(target)
    }
}

/// Where the client gets its channel from.
#[derive(Debug, Clone)]
pub enum ChannelSource {
    /// A channel supplied by the caller; takes precedence over everything.
    Channel(Channel),
    /// A target to resolve and connect lazily.
    Spec(TargetSpec),
}

impl Default for ChannelSource {
    fn default() -> Self {
        Self::Spec(TargetSpec::Unset)
    }
}

impl ChannelSource {
    /// Produce the channel, resolving the target if needed.
    ///
    /// Must be called within a tokio runtime context.
    pub fn into_channel(self, env: &SidecarEnv) -> Result<(Channel, Option<ConnectionTarget>)> {
        match self {
            Self::Channel(channel) => Ok((channel, None)),
            Self::Spec(spec) => {
                let target = spec.resolve(env)?;
                let channel = target.connect_lazy()?;
                Ok((channel, Some(target)))
            }
        }
    }
}
