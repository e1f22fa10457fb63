//! Periodic heartbeats.
//!
//! The [`HealthChecker`] sends one empty message upstream per period over a
//! single persistent client stream. It is restart-safe: starting while
//! already running replaces the previous schedule, so there is never more
//! than one active ticker.
//!
//! Timing runs on the runtime; each tick is handed to the health-check
//! executor as one small task that checks the schedule is still live before
//! sending.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use agonkit_core::proto::sdk::Empty;
use agonkit_core::sink::DiscardSink;
use agonkit_core::{Error, Executor, Feature, Result, SerialExecutor};
use agonkit_transport::TransportHandle;
use futures::future::{AbortHandle, Abortable};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

/// Something a heartbeat stream can be opened on.
pub trait HeartbeatChannel {
    /// Open a fresh heartbeat stream and return its upstream sender.
    fn open_heartbeat(&self) -> mpsc::Sender<Empty>;
}

impl HeartbeatChannel for TransportHandle {
    fn open_heartbeat(&self) -> mpsc::Sender<Empty> {
        let mut core = self.core();
        self.client_stream(
            "health",
            move |beats| async move { core.health(beats).await },
            DiscardSink::named("health"),
        )
    }
}

#[derive(Debug, Default)]
struct Schedule {
    ticker: Option<AbortHandle>,
    /// Kept across `stop` so the stream only ends on restart or close.
    upstream: Option<mpsc::Sender<Empty>>,
}

/// Heartbeat scheduler with `Stopped` and `Running` states.
pub struct HealthChecker {
    interval: Option<(Duration, Duration)>,
    executor: Option<Arc<dyn Executor>>,
    runtime: Handle,
    schedule: Mutex<Schedule>,
}

impl HealthChecker {
    /// Create a checker.
    ///
    /// `interval` is `(initial delay, period)`. When it is set and no
    /// executor is given, a dedicated [`SerialExecutor`] is created.
    #[must_use]
    pub fn new(
        interval: Option<(Duration, Duration)>,
        executor: Option<Arc<dyn Executor>>,
        runtime: &Handle,
    ) -> Self {
        let executor = executor.or_else(|| {
            interval.map(|_| Arc::new(SerialExecutor::new(runtime)) as Arc<dyn Executor>)
        });
        Self {
            interval,
            executor,
            runtime: runtime.clone(),
            schedule: Mutex::new(Schedule::default()),
        }
    }

    /// Whether [`start`](Self::start) can succeed.
    #[must_use]
    pub fn can_health_check(&self) -> bool {
        self.interval.is_some() && self.executor.is_some()
    }

    /// Whether a ticker is currently scheduled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock()
            .ticker
            .as_ref()
            .is_some_and(|ticker| !ticker.is_aborted())
    }

    /// Start sending heartbeats, replacing any running schedule.
    ///
    /// Opens a new stream on `channel`. Fails without touching the channel
    /// when no delay and period were configured.
    pub fn start(&self, channel: &impl HeartbeatChannel) -> Result<()> {
        let Some((delay, period)) = self.interval else {
            return Err(Error::precondition(
                Feature::HealthCheck,
                "no health check delay and period configured",
            ));
        };
        let Some(executor) = self.executor.clone() else {
            return Err(Error::precondition(
                Feature::HealthCheck,
                "no health check executor configured",
            ));
        };
        if period.is_zero() {
            return Err(Error::precondition(
                Feature::HealthCheck,
                "health check period must be greater than zero",
            ));
        }

        let mut schedule = self.lock();
        if let Some(previous) = schedule.ticker.take() {
            debug!("Replacing running health check schedule");
            previous.abort();
        }

        let upstream = channel.open_heartbeat();
        let (live, registration) = AbortHandle::new_pair();
        let ticker = Abortable::new(
            run_ticker(delay, period, upstream.clone(), executor, live.clone()),
            registration,
        );
        drop(self.runtime.spawn(ticker));

        schedule.ticker = Some(live);
        schedule.upstream = Some(upstream);
        info!(?delay, ?period, "Health checking started");
        Ok(())
    }

    /// Stop sending heartbeats.
    ///
    /// The stream itself stays open until the next start or client close.
    pub fn stop(&self) {
        if let Some(ticker) = self.lock().ticker.take() {
            ticker.abort();
            info!("Health checking stopped");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for HealthChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthChecker")
            .field("interval", &self.interval)
            .field("has_executor", &self.executor.is_some())
            .field("running", &self.is_running())
            .finish()
    }
}

async fn run_ticker(
    delay: Duration,
    period: Duration,
    upstream: mpsc::Sender<Empty>,
    executor: Arc<dyn Executor>,
    live: AbortHandle,
) {
    let mut ticks = tokio::time::interval_at(Instant::now() + delay, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        ticks.tick().await;
        if upstream.is_closed() {
            debug!("Heartbeat stream closed, stopping ticker");
            live.abort();
            return;
        }

        let upstream = upstream.clone();
        let live = live.clone();
        executor.execute(Box::pin(async move {
            if live.is_aborted() {
                return;
            }
            match upstream.try_send(Empty {}) {
                Ok(()) => trace!("Heartbeat sent"),
                Err(TrySendError::Full(_)) => warn!("Heartbeat stream is backed up, skipping beat"),
                Err(TrySendError::Closed(_)) => debug!("Heartbeat stream closed"),
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    #[derive(Default)]
    struct RecordingChannel {
        opened: Mutex<Vec<mpsc::Receiver<Empty>>>,
    }

    impl RecordingChannel {
        fn opened(&self) -> usize {
            self.opened.lock().unwrap().len()
        }

        /// Drain stream `index` and return how many beats it carried, plus
        /// whether it is still open.
        fn drain(&self, index: usize) -> (usize, bool) {
            let mut opened = self.opened.lock().unwrap();
            let rx = &mut opened[index];
            let mut beats = 0;
            loop {
                match rx.try_recv() {
                    Ok(_) => beats += 1,
                    Err(TryRecvError::Empty) => return (beats, true),
                    Err(TryRecvError::Disconnected) => return (beats, false),
                }
            }
        }
    }

    impl HeartbeatChannel for RecordingChannel {
        fn open_heartbeat(&self) -> mpsc::Sender<Empty> {
            let (tx, rx) = mpsc::channel(32);
            self.opened.lock().unwrap().push(rx);
            tx
        }
    }

    fn checker() -> HealthChecker {
        HealthChecker::new(
            Some((Duration::from_secs(1), Duration::from_secs(1))),
            None,
            &Handle::current(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_beats_after_delay_then_every_period() {
        let channel = RecordingChannel::default();
        let health = checker();
        health.start(&channel).unwrap();
        assert!(health.is_running());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(channel.drain(0), (0, true));

        tokio::time::sleep(Duration::from_millis(2700)).await;
        assert_eq!(channel.drain(0), (3, true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_leaves_one_ticker() {
        let channel = RecordingChannel::default();
        let health = checker();

        health.start(&channel).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        health.start(&channel).unwrap();
        tokio::time::sleep(Duration::from_millis(2700)).await;

        assert_eq!(channel.opened(), 2);
        // The first stream is dropped by the restart.
        assert_eq!(channel.drain(0), (1, false));
        assert_eq!(channel.drain(1), (2, true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_suppresses_beats_but_keeps_stream() {
        let channel = RecordingChannel::default();
        let health = checker();
        health.start(&channel).unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        health.stop();
        assert!(!health.is_running());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(channel.drain(0), (2, true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_stream_stops_ticker() {
        let channel = RecordingChannel::default();
        let health = checker();
        health.start(&channel).unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(health.is_running());

        // The sidecar side of the stream goes away.
        drop(channel.opened.lock().unwrap().remove(0));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!health.is_running());

        health.start(&channel).unwrap();
        assert!(health.is_running());
    }

    #[tokio::test]
    async fn test_start_without_interval_is_a_precondition_error() {
        let channel = RecordingChannel::default();
        let health = HealthChecker::new(None, None, &Handle::current());
        assert!(!health.can_health_check());

        let err = health.start(&channel).unwrap_err();
        assert!(matches!(
            err,
            Error::Precondition {
                feature: Feature::HealthCheck,
                ..
            }
        ));
        assert_eq!(channel.opened(), 0);
        assert!(!health.is_running());
    }

    #[tokio::test]
    async fn test_zero_period_is_rejected() {
        let channel = RecordingChannel::default();
        let health = HealthChecker::new(
            Some((Duration::ZERO, Duration::ZERO)),
            Some(Arc::new(Handle::current())),
            &Handle::current(),
        );
        assert!(health.start(&channel).is_err());
        assert_eq!(channel.opened(), 0);
    }
}
