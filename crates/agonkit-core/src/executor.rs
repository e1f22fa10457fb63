//! Execution contexts for background work.
//!
//! Heartbeat ticks and watcher callbacks run on an [`Executor`] rather than
//! on the caller's thread. A tokio [`Handle`] is an executor; so is the
//! [`SerialExecutor`], a single lane that runs one task at a time in
//! submission order and survives panicking tasks.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{error, trace, warn};

use crate::error::CallbackError;

/// A unit of background work.
pub type Task = BoxFuture<'static, ()>;

/// Something that can run [`Task`]s.
pub trait Executor: Send + Sync + 'static {
    /// Submit a task. Must not block.
    fn execute(&self, task: Task);
}

impl Executor for Handle {
    fn execute(&self, task: Task) {
        drop(self.spawn(task));
    }
}

impl<E> Executor for Arc<E>
where
    E: Executor + ?Sized,
{
    fn execute(&self, task: Task) {
        (**self).execute(task);
    }
}

/// Runs tasks one at a time, in submission order.
///
/// A panicking task is caught, reported as a [`CallbackError`] and does not
/// stop the lane. The lane shuts down once every handle has been dropped
/// and the queue is drained.
#[derive(Debug, Clone)]
pub struct SerialExecutor {
    tx: mpsc::UnboundedSender<Task>,
}

impl SerialExecutor {
    /// Start a serial lane on `runtime`.
    #[must_use]
    pub fn new(runtime: &Handle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Task>();

        runtime.spawn(async move {
            while let Some(task) = rx.recv().await {
                if let Err(payload) = AssertUnwindSafe(task).catch_unwind().await {
                    let err = CallbackError::from_panic(payload.as_ref());
                    error!(error = %err, "Task panicked on serial executor");
                }
            }
            trace!("Serial executor drained");
        });

        Self { tx }
    }

    /// Start a serial lane on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn current() -> Self {
        Self::new(&Handle::current())
    }
}

impl Executor for SerialExecutor {
    fn execute(&self, task: Task) {
        if self.tx.send(task).is_err() {
            warn!("Serial executor has shut down, dropping task");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn push(log: &Arc<Mutex<Vec<u32>>>, n: u32) -> Task {
        let log = Arc::clone(log);
        Box::pin(async move {
            log.lock().unwrap().push(n);
        })
    }

    #[tokio::test]
    async fn test_serial_executor_preserves_order() {
        let executor = SerialExecutor::current();
        let log = Arc::new(Mutex::new(Vec::new()));

        // The first task yields; the second must still wait for it.
        let slow = Arc::clone(&log);
        executor.execute(Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            slow.lock().unwrap().push(1);
        }));
        executor.execute(push(&log, 2));
        executor.execute(push(&log, 3));

        let (tx, rx) = futures::channel::oneshot::channel();
        executor.execute(Box::pin(async move {
            let _ = tx.send(());
        }));
        rx.await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_serial_executor_survives_panics() {
        let executor = SerialExecutor::current();
        let log = Arc::new(Mutex::new(Vec::new()));

        executor.execute(Box::pin(async { panic!("callback failed") }));
        executor.execute(push(&log, 9));

        let (tx, rx) = futures::channel::oneshot::channel();
        executor.execute(Box::pin(async move {
            let _ = tx.send(());
        }));
        rx.await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec![9]);
    }

    #[tokio::test]
    async fn test_handle_is_an_executor() {
        let executor: Arc<dyn Executor> = Arc::new(Handle::current());
        let (tx, rx) = futures::channel::oneshot::channel();
        executor.execute(Box::pin(async move {
            let _ = tx.send(5);
        }));
        assert_eq!(rx.await.unwrap(), 5);
    }
}
