//! Sidecar builder for fluent construction.
//!
//! [`SidecarBuilder`] is an immutable value: every `with_*` method borrows
//! the builder and returns a modified copy, so a partial configuration can
//! be shared and extended in several directions.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use agonkit_core::{Error, Executor, Result};
use agonkit_transport::{ChannelSource, ConnectionTarget, SidecarEnv, TargetSpec, TransportHandle};
use tokio::runtime::Handle;
use tonic::transport::Channel;
use tracing::info;

use crate::client::Sidecar;
use crate::health::HealthChecker;
use crate::watcher::Watchers;

/// Builder for constructing a [`Sidecar`] client.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use agonkit_client::SidecarBuilder;
///
/// # async fn example() -> agonkit_core::Result<()> {
/// let sidecar = SidecarBuilder::new()
///     .with_health_check(Duration::from_secs(1), Duration::from_secs(2))
///     .with_game_server_watcher_executor(tokio::runtime::Handle::current())
///     .build()?;
///
/// sidecar.start_health_checking()?;
/// sidecar.ready_future().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SidecarBuilder {
    env: SidecarEnv,
    channel: Option<Channel>,
    target: Option<TargetSpec>,
    host: Option<String>,
    port: Option<u16>,
    watcher_executor: Option<Arc<dyn Executor>>,
    health_check: Option<(Duration, Duration)>,
    health_check_executor: Option<Arc<dyn Executor>>,
    runtime: Option<Handle>,
}

impl Default for SidecarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SidecarBuilder {
    /// Create a builder that reads the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::with_environment(SidecarEnv::from_process())
    }

    /// Create a builder over an explicit environment snapshot.
    #[must_use]
    pub fn with_environment(env: SidecarEnv) -> Self {
        Self {
            env,
            channel: None,
            target: None,
            host: None,
            port: None,
            watcher_executor: None,
            health_check: None,
            health_check_executor: None,
            runtime: None,
        }
    }

    fn with(&self, change: impl FnOnce(&mut Self)) -> Self {
        let mut next = self.clone();
        change(&mut next);
        next
    }

    /// Replace the environment snapshot.
    pub fn with_env(&self, env: SidecarEnv) -> Self {
        self.with(|b| b.env = env)
    }

    /// Use an existing channel. Takes precedence over every target setting.
    pub fn with_channel(&self, channel: Channel) -> Self {
        self.with(|b| b.channel = Some(channel))
    }

    /// Connect to `target` (for example `"127.0.0.1:9357"` or a full URI).
    ///
    /// Takes precedence over host and port settings.
    pub fn with_target(&self, target: impl Into<String>) -> Self {
        let target = target.into();
        self.with(|b| b.target = Some(TargetSpec::Target(target)))
    }

    /// Connect to the target in `AGONES_SDK_GRPC_ADDRESS`.
    ///
    /// Shares a slot with [`with_target`](Self::with_target); the later call
    /// wins. [`build`](Self::build) fails if the variable is unset.
    pub fn with_target_from_env(&self) -> Self {
        self.with(|b| b.target = Some(TargetSpec::TargetFromEnv))
    }

    /// Connect to `host:port`.
    pub fn with_address(&self, host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        self.with(|b| {
            b.host = Some(host);
            b.port = Some(port);
        })
    }

    /// Connect to `host`, with the port from the environment or the default
    /// unless [`with_port`](Self::with_port) is also set.
    pub fn with_host(&self, host: impl Into<String>) -> Self {
        let host = host.into();
        self.with(|b| b.host = Some(host))
    }

    /// Connect to `port`, with the host from the environment or `localhost`
    /// unless [`with_host`](Self::with_host) is also set.
    pub fn with_port(&self, port: u16) -> Self {
        self.with(|b| b.port = Some(port))
    }

    /// Clear the channel and every target setting, going back to
    /// environment and default resolution.
    pub fn with_default_target(&self) -> Self {
        self.with(|b| {
            b.channel = None;
            b.target = None;
            b.host = None;
            b.port = None;
        })
    }

    /// Enable game server watchers, dispatching updates on `executor`.
    pub fn with_game_server_watcher_executor(&self, executor: impl Executor) -> Self {
        let executor: Arc<dyn Executor> = Arc::new(executor);
        self.with(|b| b.watcher_executor = Some(executor))
    }

    /// Enable heartbeats: the first after `delay`, then one every `period`.
    pub fn with_health_check(&self, delay: Duration, period: Duration) -> Self {
        self.with(|b| b.health_check = Some((delay, period)))
    }

    /// Run heartbeat ticks on `executor` instead of a dedicated serial lane.
    pub fn with_health_check_executor(&self, executor: impl Executor) -> Self {
        let executor: Arc<dyn Executor> = Arc::new(executor);
        self.with(|b| b.health_check_executor = Some(executor))
    }

    /// Drive calls on `runtime` instead of the current one.
    pub fn with_runtime(&self, runtime: Handle) -> Self {
        self.with(|b| b.runtime = Some(runtime))
    }

    /// Whether the built client will accept watcher callbacks.
    #[must_use]
    pub fn can_watch_game_server(&self) -> bool {
        self.watcher_executor.is_some()
    }

    /// Whether the built client will be able to send heartbeats.
    #[must_use]
    pub fn can_health_check(&self) -> bool {
        self.health_check.is_some()
    }

    /// The winning channel source: channel, then target, then host and
    /// port, then the environment.
    fn source(&self) -> ChannelSource {
        if let Some(channel) = &self.channel {
            return ChannelSource::Channel(channel.clone());
        }
        let spec = match (&self.target, &self.host, self.port) {
            (Some(target), _, _) => target.clone(),
            (None, Some(host), Some(port)) => TargetSpec::Address {
                host: host.clone(),
                port,
            },
            (None, Some(host), None) => TargetSpec::Host(host.clone()),
            (None, None, Some(port)) => TargetSpec::Port(port),
            (None, None, None) => TargetSpec::Unset,
        };
        ChannelSource::Spec(spec)
    }

    /// Resolve the connection target without connecting.
    ///
    /// Returns `Ok(None)` when an explicit channel was supplied.
    pub fn target(&self) -> Result<Option<ConnectionTarget>> {
        match self.source() {
            ChannelSource::Channel(_) => Ok(None),
            ChannelSource::Spec(spec) => spec.resolve(&self.env).map(Some),
        }
    }

    /// Build the client.
    ///
    /// No network I/O happens here; the channel connects on first use.
    /// Fails when the target cannot be resolved or there is no runtime.
    pub fn build(&self) -> Result<Sidecar> {
        let runtime = match &self.runtime {
            Some(runtime) => runtime.clone(),
            None => Handle::try_current().map_err(|_| {
                Error::configuration(
                    "no tokio runtime available; build inside a runtime or use with_runtime()",
                )
            })?,
        };

        let (channel, target) = {
            let _guard = runtime.enter();
            self.source().into_channel(&self.env)?
        };
        info!(
            sidecar = ?target.as_ref().map(ToString::to_string),
            health_check = ?self.health_check,
            watchers = self.can_watch_game_server(),
            "Built sidecar client"
        );

        let transport = TransportHandle::new(channel, runtime.clone()).with_target(target);
        let health = HealthChecker::new(
            self.health_check,
            self.health_check_executor.clone(),
            &runtime,
        );
        let watchers = Watchers::new(self.watcher_executor.clone());
        Ok(Sidecar::from_parts(transport, health, watchers))
    }
}

impl fmt::Debug for SidecarBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SidecarBuilder")
            .field("env", &self.env)
            .field("channel", &self.channel.is_some())
            .field("target", &self.target)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("health_check", &self.health_check)
            .field("watcher_executor", &self.watcher_executor.is_some())
            .field("health_check_executor", &self.health_check_executor.is_some())
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}
