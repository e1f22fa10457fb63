//! The transport handle: one channel, three surface clients, and the
//! bookkeeping needed to close them cleanly.
//!
//! Every call is spawned onto the configured runtime and reports through a
//! [`ResponseSink`]. Spawned calls are tracked so that [`TransportHandle::close`]
//! can wait for them to drain before tearing the channel down.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use agonkit_core::proto::{alpha, beta, sdk};
use agonkit_core::sink::ResponseSink;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tonic::transport::Channel;
use tonic::{Response, Status, Streaming};
use tracing::{debug, info, trace, warn};

use crate::config::ConnectionTarget;

/// How long [`TransportHandle::close`] waits for in-flight calls.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Buffer size of the upstream half of client streams.
pub const CLIENT_STREAM_BUFFER: usize = 32;

/// Client for the stable lifecycle surface.
pub type CoreClient = sdk::sdk_client::SdkClient<Channel>;

/// Client for the player tracking surface.
pub type AlphaClient = alpha::sdk_client::SdkClient<Channel>;

/// Client for the counters and lists surface.
pub type BetaClient = beta::sdk_client::SdkClient<Channel>;

/// Owns the sidecar channel and everything derived from it.
pub struct TransportHandle {
    channel: Channel,
    target: Option<ConnectionTarget>,
    core: CoreClient,
    alpha: AlphaClient,
    beta: BetaClient,
    runtime: Handle,
    tracker: TaskTracker,
    /// Graceful shutdown: reject new calls, end persistent streams.
    shutdown: CancellationToken,
    /// Forced shutdown: cancel whatever is still running.
    abort: CancellationToken,
}

impl TransportHandle {
    /// Wrap `channel`. Calls are driven on `runtime`.
    #[must_use]
    pub fn new(channel: Channel, runtime: Handle) -> Self {
        Self {
            core: CoreClient::new(channel.clone()),
            alpha: AlphaClient::new(channel.clone()),
            beta: BetaClient::new(channel.clone()),
            channel,
            target: None,
            runtime,
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            abort: CancellationToken::new(),
        }
    }

    /// Record the target the channel was created for (used in logs).
    #[must_use]
    pub fn with_target(mut self, target: Option<ConnectionTarget>) -> Self {
        self.target = target;
        self
    }

    /// A client for the stable lifecycle surface.
    #[must_use]
    pub fn core(&self) -> CoreClient {
        self.core.clone()
    }

    /// A client for the player tracking surface.
    #[must_use]
    pub fn alpha(&self) -> AlphaClient {
        self.alpha.clone()
    }

    /// A client for the counters and lists surface.
    #[must_use]
    pub fn beta(&self) -> BetaClient {
        self.beta.clone()
    }

    /// The underlying channel.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }

    /// The resolved target, unless a channel was supplied directly.
    #[must_use]
    pub const fn target(&self) -> Option<&ConnectionTarget> {
        self.target.as_ref()
    }

    /// The runtime calls are driven on.
    #[must_use]
    pub const fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Whether shutdown has begun.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Number of calls currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Spawn a unary call and report its result to `sink`.
    pub fn unary<T, F, S>(&self, operation: &'static str, call: F, mut sink: S)
    where
        T: Send + 'static,
        F: Future<Output = Result<Response<T>, Status>> + Send + 'static,
        S: ResponseSink<T>,
    {
        if self.is_closed() {
            self.reject(operation, sink);
            return;
        }

        let abort = self.abort.clone();
        self.tracker.spawn_on(
            async move {
                trace!(operation, "Sidecar call started");
                tokio::select! {
                    () = abort.cancelled() => {
                        warn!(operation, "Sidecar call cancelled by forced shutdown");
                        sink.on_error(Status::cancelled("transport was closed"));
                    }
                    result = call => match result {
                        Ok(response) => {
                            sink.on_next(response.into_inner());
                            sink.on_completed();
                        }
                        Err(status) => {
                            debug!(operation, code = ?status.code(), "Sidecar call failed");
                            sink.on_error(status);
                        }
                    },
                }
            },
            &self.runtime,
        );
    }

    /// Spawn a server-streaming call. Every item is pushed to `sink`,
    /// followed by completion or an error. The stream ends when the
    /// transport shuts down.
    pub fn server_stream<T, F, S>(&self, operation: &'static str, call: F, mut sink: S)
    where
        T: Send + 'static,
        F: Future<Output = Result<Response<Streaming<T>>, Status>> + Send + 'static,
        S: ResponseSink<T>,
    {
        if self.is_closed() {
            self.reject(operation, sink);
            return;
        }

        let shutdown = self.shutdown.clone();
        self.tracker.spawn_on(
            async move {
                let mut stream = tokio::select! {
                    () = shutdown.cancelled() => {
                        sink.on_error(Status::cancelled("transport was closed"));
                        return;
                    }
                    opened = call => match opened {
                        Ok(response) => response.into_inner(),
                        Err(status) => {
                            warn!(operation, code = ?status.code(), "Failed to open sidecar stream");
                            sink.on_error(status);
                            return;
                        }
                    },
                };
                debug!(operation, "Sidecar stream opened");

                loop {
                    tokio::select! {
                        () = shutdown.cancelled() => {
                            debug!(operation, "Sidecar stream ended by shutdown");
                            sink.on_error(Status::cancelled("transport was closed"));
                            break;
                        }
                        item = stream.message() => match item {
                            Ok(Some(value)) => sink.on_next(value),
                            Ok(None) => {
                                debug!(operation, "Sidecar stream completed");
                                sink.on_completed();
                                break;
                            }
                            Err(status) => {
                                warn!(operation, code = ?status.code(), "Sidecar stream failed");
                                sink.on_error(status);
                                break;
                            }
                        },
                    }
                }
            },
            &self.runtime,
        );
    }

    /// Open a client-streaming call and return its upstream sender.
    ///
    /// `open` receives the request stream and starts the call. The reply
    /// goes to `sink` once the upstream ends (all senders dropped) or the
    /// transport shuts down.
    pub fn client_stream<Req, T, O, F, S>(
        &self,
        operation: &'static str,
        open: O,
        mut sink: S,
    ) -> mpsc::Sender<Req>
    where
        Req: Send + 'static,
        T: Send + 'static,
        O: FnOnce(ReceiverStream<Req>) -> F,
        F: Future<Output = Result<Response<T>, Status>> + Send + 'static,
        S: ResponseSink<T>,
    {
        let (tx, rx) = mpsc::channel(CLIENT_STREAM_BUFFER);
        let call = open(ReceiverStream::new(rx));

        if self.is_closed() {
            // Dropping `call` drops the receiver, so sends fail immediately.
            drop(call);
            self.reject(operation, sink);
            return tx;
        }

        let shutdown = self.shutdown.clone();
        self.tracker.spawn_on(
            async move {
                debug!(operation, "Sidecar client stream opened");
                tokio::select! {
                    () = shutdown.cancelled() => {
                        debug!(operation, "Sidecar client stream ended by shutdown");
                        sink.on_error(Status::cancelled("transport was closed"));
                    }
                    result = call => match result {
                        Ok(response) => {
                            sink.on_next(response.into_inner());
                            sink.on_completed();
                        }
                        Err(status) => {
                            warn!(operation, code = ?status.code(), "Sidecar client stream failed");
                            sink.on_error(status);
                        }
                    },
                }
            },
            &self.runtime,
        );
        tx
    }

    /// Begin graceful shutdown without waiting.
    ///
    /// New calls fail with `UNAVAILABLE`; persistent streams end. Calls
    /// already in flight keep running.
    pub fn begin_close(&self) {
        if !self.shutdown.is_cancelled() {
            info!(sidecar = ?self.target, in_flight = self.tracker.len(), "Closing sidecar transport");
        }
        self.shutdown.cancel();
        self.tracker.close();
    }

    /// Shut down and wait for in-flight calls.
    ///
    /// Waits up to [`CLOSE_TIMEOUT`]; calls still running after that are
    /// cancelled. Consumes the handle, so it can only happen once.
    pub async fn close(self) {
        self.begin_close();

        if tokio::time::timeout(CLOSE_TIMEOUT, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                pending = self.tracker.len(),
                "Sidecar calls did not finish within {CLOSE_TIMEOUT:?}, forcing shutdown"
            );
            self.abort.cancel();
            self.tracker.wait().await;
        }

        info!("Sidecar transport closed");
    }

    fn reject<T, S>(&self, operation: &'static str, mut sink: S)
    where
        T: Send + 'static,
        S: ResponseSink<T>,
    {
        debug!(operation, "Rejecting call on closed transport");
        drop(self.runtime.spawn(async move {
            sink.on_error(Status::unavailable("transport is shut down"));
        }));
    }
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportHandle")
            .field("target", &self.target)
            .field("in_flight", &self.tracker.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agonkit_core::sink::{self, SinkEvent};
    use agonkit_testing::MockSidecar;
    use tonic::Code;

    async fn handle_for(mock: &MockSidecar) -> TransportHandle {
        TransportHandle::new(mock.channel(), Handle::current())
    }

    #[tokio::test]
    async fn test_unary_reports_value_and_completion() {
        let mock = MockSidecar::start().await.unwrap();
        let handle = handle_for(&mock).await;

        let mut core = handle.core();
        let future = sink::to_future(|sink| {
            handle.unary("ready", async move { core.ready(sdk::Empty {}).await }, sink);
        });
        future.await.unwrap();

        assert_eq!(mock.state().calls_named("ready"), 1);
        handle.close().await;
    }

    #[tokio::test]
    async fn test_unary_forwards_status() {
        let mock = MockSidecar::start().await.unwrap();
        let handle = handle_for(&mock).await;

        let mut beta = handle.beta();
        let future = sink::to_future(|sink| {
            handle.unary(
                "get_counter",
                async move {
                    beta.get_counter(beta::GetCounterRequest {
                        name: "missing".to_string(),
                    })
                    .await
                },
                sink,
            );
        });
        let err = future.await.unwrap_err();
        assert_eq!(err.code(), Some(Code::NotFound));
        handle.close().await;
    }

    #[tokio::test]
    async fn test_calls_after_begin_close_are_unavailable() {
        let mock = MockSidecar::start().await.unwrap();
        let handle = handle_for(&mock).await;
        handle.begin_close();
        assert!(handle.is_closed());

        let mut core = handle.core();
        let future = sink::to_future(|sink| {
            handle.unary("ready", async move { core.ready(sdk::Empty {}).await }, sink);
        });
        assert_eq!(future.await.unwrap_err().code(), Some(Code::Unavailable));
        assert_eq!(mock.state().calls_named("ready"), 0);
    }

    #[tokio::test]
    async fn test_server_stream_pushes_updates_and_ends_on_close() {
        let mock = MockSidecar::start().await.unwrap();
        let handle = handle_for(&mock).await;

        let (events, mut rx) = sink::channel();
        let mut core = handle.core();
        handle.server_stream(
            "watch_game_server",
            async move { core.watch_game_server(sdk::Empty {}).await },
            events,
        );

        mock.wait_for_watchers(1).await;
        mock.state().set_game_server_state("Ready");

        match rx.recv().await {
            Some(SinkEvent::Next(gs)) => {
                assert_eq!(gs.status.map(|s| s.state).as_deref(), Some("Ready"));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        handle.close().await;
        match rx.recv().await {
            Some(SinkEvent::Error(status)) => assert_eq!(status.code(), Code::Cancelled),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_stream_delivers_reply_when_upstream_ends() {
        let mock = MockSidecar::start().await.unwrap();
        let handle = handle_for(&mock).await;

        let mut core = handle.core();
        let (events, mut rx) = sink::channel();
        let upstream = handle.client_stream(
            "health",
            move |requests| async move { core.health(requests).await },
            events,
        );
        for _ in 0..3 {
            upstream.send(sdk::Empty {}).await.unwrap();
        }
        drop(upstream);

        assert!(matches!(rx.recv().await, Some(SinkEvent::Next(_))));
        assert!(matches!(rx.recv().await, Some(SinkEvent::Completed)));
        assert_eq!(mock.state().heartbeats(), 3);
        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_forces_hung_calls_after_timeout() {
        let channel = ConnectionTarget::Address {
            host: "127.0.0.1".to_string(),
            port: 1,
        }
        .connect_lazy()
        .unwrap();
        let handle = TransportHandle::new(channel, Handle::current());

        let future = sink::to_future(|sink| {
            handle.unary(
                "hang",
                futures::future::pending::<Result<Response<()>, Status>>(),
                sink,
            );
        });
        assert_eq!(handle.in_flight(), 1);

        let started = tokio::time::Instant::now();
        handle.close().await;
        assert!(started.elapsed() >= CLOSE_TIMEOUT);
        assert_eq!(future.await.unwrap_err().code(), Some(Code::Cancelled));
    }
}
