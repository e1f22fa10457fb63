//! Response sinks: the bridge between streamed RPC results and callers.
//!
//! Every remote call in agonkit reports through a [`ResponseSink`]: zero or
//! more `on_next` values followed by exactly one terminal signal
//! (`on_completed` or `on_error`). This module provides the sinks the
//! client composes:
//!
//! - [`FutureSink`] / [`ResponseFuture`]: resolve a future from the stream
//! - [`MappedSink`]: transform each value before forwarding it
//! - [`DiscardSink`]: fire-and-forget
//! - [`ChannelSink`]: forward every signal into an mpsc channel

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::channel::oneshot;
use tokio::sync::mpsc;
use tonic::Status;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Receiver of a streamed RPC response.
pub trait ResponseSink<T>: Send + 'static {
    /// A value arrived.
    fn on_next(&mut self, value: T);

    /// The call failed. No further signals follow.
    fn on_error(&mut self, status: Status);

    /// The call finished successfully. No further signals follow.
    fn on_completed(&mut self);
}

impl<T, S> ResponseSink<T> for Box<S>
where
    S: ResponseSink<T> + ?Sized,
{
    fn on_next(&mut self, value: T) {
        (**self).on_next(value);
    }

    fn on_error(&mut self, status: Status) {
        (**self).on_error(status);
    }

    fn on_completed(&mut self) {
        (**self).on_completed();
    }
}

/// A sink that ignores everything.
///
/// Failures are still logged at `debug` level under the operation name.
#[derive(Debug, Clone, Copy)]
pub struct DiscardSink {
    operation: &'static str,
}

impl DiscardSink {
    /// A discard sink for the named operation.
    #[must_use]
    pub const fn named(operation: &'static str) -> Self {
        Self { operation }
    }

    /// The operation this sink was created for.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }
}

impl Default for DiscardSink {
    fn default() -> Self {
        Self::named("unnamed")
    }
}

impl<T> ResponseSink<T> for DiscardSink {
    fn on_next(&mut self, _value: T) {}

    fn on_error(&mut self, status: Status) {
        debug!(
            operation = self.operation,
            code = ?status.code(),
            message = status.message(),
            "Discarded sidecar call failed"
        );
    }

    fn on_completed(&mut self) {
        trace!(operation = self.operation, "Discarded sidecar call completed");
    }
}

/// A sink that transforms values before forwarding them to an inner sink.
///
/// Terminal signals pass through unchanged. Nothing is buffered.
pub struct MappedSink<S, F, U> {
    inner: S,
    transform: F,
    _marker: PhantomData<fn() -> U>,
}

impl<S, F, U> MappedSink<S, F, U> {
    /// Wrap `inner`, applying `transform` to every value.
    pub const fn new(inner: S, transform: F) -> Self {
        Self {
            inner,
            transform,
            _marker: PhantomData,
        }
    }

    /// Unwrap the inner sink.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<T, U, S, F> ResponseSink<T> for MappedSink<S, F, U>
where
    S: ResponseSink<U>,
    F: FnMut(T) -> U + Send + 'static,
    U: 'static,
{
    fn on_next(&mut self, value: T) {
        let mapped = (self.transform)(value);
        self.inner.on_next(mapped);
    }

    fn on_error(&mut self, status: Status) {
        self.inner.on_error(status);
    }

    fn on_completed(&mut self) {
        self.inner.on_completed();
    }
}

/// Wrap `inner` so that each value passes through `transform` first.
pub fn map<T, U, S, F>(inner: S, transform: F) -> MappedSink<S, F, U>
where
    S: ResponseSink<U>,
    F: FnMut(T) -> U + Send + 'static,
    U: 'static,
{
    MappedSink::new(inner, transform)
}

/// The producing half of a [`ResponseFuture`].
///
/// Keeps the most recent value. Completion resolves the future with it (or
/// `T::default()` if nothing was pushed); an error resolves the future with
/// [`Error::Transport`]. The future resolves at most once. Dropping the sink
/// before a terminal signal resolves it with a `CANCELLED` status.
#[derive(Debug)]
pub struct FutureSink<T> {
    value: Option<T>,
    tx: Option<oneshot::Sender<Result<T>>>,
}

impl<T> FutureSink<T> {
    /// Whether a terminal signal has been delivered.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.tx.is_none()
    }
}

impl<T> ResponseSink<T> for FutureSink<T>
where
    T: Default + Send + 'static,
{
    fn on_next(&mut self, value: T) {
        if self.tx.is_some() {
            self.value = Some(value);
        }
    }

    fn on_error(&mut self, status: Status) {
        if let Some(tx) = self.tx.take() {
            self.value = None;
            // The caller may have dropped the future; nothing to report then.
            let _ = tx.send(Err(Error::from(status)));
        }
    }

    fn on_completed(&mut self) {
        if let Some(tx) = self.tx.take() {
            let value = self.value.take().unwrap_or_default();
            let _ = tx.send(Ok(value));
        }
    }
}

/// A future resolved by a [`FutureSink`].
#[must_use = "futures do nothing unless awaited"]
#[derive(Debug)]
pub struct ResponseFuture<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for ResponseFuture<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.rx.poll_unpin(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(Error::from(Status::cancelled(
                    "response sink dropped before the call finished",
                )))
            })
        })
    }
}

/// Create a connected [`FutureSink`] / [`ResponseFuture`] pair.
pub fn pending<T>() -> (FutureSink<T>, ResponseFuture<T>) {
    let (tx, rx) = oneshot::channel();
    (
        FutureSink {
            value: None,
            tx: Some(tx),
        },
        ResponseFuture { rx },
    )
}

/// Run `start` with a fresh [`FutureSink`] and return its future.
pub fn to_future<T, F>(start: F) -> ResponseFuture<T>
where
    F: FnOnce(FutureSink<T>),
{
    let (sink, future) = pending();
    start(sink);
    future
}

/// One signal observed by a [`ChannelSink`].
#[derive(Debug)]
pub enum SinkEvent<T> {
    /// A value.
    Next(T),
    /// The call failed.
    Error(Status),
    /// The call finished.
    Completed,
}

/// A sink that forwards every signal into an unbounded channel.
///
/// Handy for consuming a server stream (such as game server updates) as an
/// async receiver.
#[derive(Debug)]
pub struct ChannelSink<T> {
    tx: mpsc::UnboundedSender<SinkEvent<T>>,
}

impl<T: Send + 'static> ChannelSink<T> {
    fn forward(&self, event: SinkEvent<T>) {
        if self.tx.send(event).is_err() {
            trace!("Channel sink receiver dropped");
        }
    }
}

impl<T: Send + 'static> ResponseSink<T> for ChannelSink<T> {
    fn on_next(&mut self, value: T) {
        self.forward(SinkEvent::Next(value));
    }

    fn on_error(&mut self, status: Status) {
        self.forward(SinkEvent::Error(status));
    }

    fn on_completed(&mut self) {
        self.forward(SinkEvent::Completed);
    }
}

/// Create a [`ChannelSink`] and the receiver it feeds.
#[must_use]
pub fn channel<T: Send + 'static>() -> (ChannelSink<T>, mpsc::UnboundedReceiver<SinkEvent<T>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[tokio::test]
    async fn test_future_resolves_with_pushed_value() {
        let (mut sink, future) = pending::<i64>();
        sink.on_next(7);
        sink.on_completed();
        assert_eq!(future.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_future_keeps_last_value() {
        let (mut sink, future) = pending::<String>();
        sink.on_next("first".to_string());
        sink.on_next("second".to_string());
        sink.on_completed();
        assert_eq!(future.await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_future_defaults_without_values() {
        let (mut sink, future) = pending::<Vec<String>>();
        sink.on_completed();
        assert!(future.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_future_error_wins_over_later_completion() {
        let (mut sink, future) = pending::<bool>();
        sink.on_next(true);
        sink.on_error(Status::out_of_range("full"));
        assert!(sink.is_resolved());
        sink.on_completed();
        sink.on_next(false);

        let err = future.await.unwrap_err();
        assert_eq!(err.code(), Some(Code::OutOfRange));
    }

    #[tokio::test]
    async fn test_dropped_sink_cancels_future() {
        let (sink, future) = pending::<()>();
        drop(sink);
        let err = future.await.unwrap_err();
        assert_eq!(err.code(), Some(Code::Cancelled));
    }

    #[tokio::test]
    async fn test_mapped_sink_transforms_values() {
        let future = to_future(|sink| {
            let mut mapped = map(sink, |n: i64| n.to_string());
            mapped.on_next(12);
            mapped.on_completed();
        });
        assert_eq!(future.await.unwrap(), "12");
    }

    #[tokio::test]
    async fn test_mapped_sink_forwards_errors() {
        let future = to_future(|sink| {
            let mut mapped = map(sink, |n: i64| n > 0);
            mapped.on_error(Status::not_found("missing"));
        });
        assert_eq!(future.await.unwrap_err().code(), Some(Code::NotFound));
    }

    #[tokio::test]
    async fn test_boxed_sink_delegates() {
        let (sink, future) = pending::<u8>();
        let mut boxed: Box<dyn ResponseSink<u8>> = Box::new(sink);
        boxed.on_next(3);
        boxed.on_completed();
        assert_eq!(future.await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_signals() {
        let (mut sink, mut rx) = channel::<u8>();
        sink.on_next(1);
        sink.on_next(2);
        sink.on_completed();

        assert!(matches!(rx.recv().await, Some(SinkEvent::Next(1))));
        assert!(matches!(rx.recv().await, Some(SinkEvent::Next(2))));
        assert!(matches!(rx.recv().await, Some(SinkEvent::Completed)));
    }

    #[test]
    fn test_discard_sink_accepts_everything() {
        let mut sink = DiscardSink::named("ready");
        ResponseSink::<u8>::on_next(&mut sink, 1);
        ResponseSink::<u8>::on_error(&mut sink, Status::unavailable("down"));
        ResponseSink::<u8>::on_completed(&mut sink);
        assert_eq!(sink.operation(), "ready");
    }
}
