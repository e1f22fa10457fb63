//! Game server watcher fan-out.
//!
//! The first registered callback opens the one and only `WatchGameServer`
//! subscription; later registrations just join the list. Each update is
//! dispatched as a single task on the watcher executor, which calls every
//! callback in registration order. A callback that panics ends dispatch for
//! that update only.
//!
//! There is no way to unregister a callback. The subscription ends when the
//! client is closed.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use agonkit_core::proto::sdk::{Empty, GameServer};
use agonkit_core::sink::ResponseSink;
use agonkit_core::{Error, Executor, Feature, Result};
use agonkit_transport::TransportHandle;
use tonic::Status;
use tracing::{debug, trace, warn};

/// A game server update callback.
pub type GameServerCallback = Arc<dyn Fn(&GameServer) + Send + Sync>;

type Callbacks = Arc<RwLock<Vec<GameServerCallback>>>;

/// Something a game server subscription can be opened on.
pub trait GameServerSource {
    /// Open a subscription that reports to `sink`.
    fn subscribe(&self, sink: Box<dyn ResponseSink<GameServer>>);
}

impl GameServerSource for TransportHandle {
    fn subscribe(&self, sink: Box<dyn ResponseSink<GameServer>>) {
        let mut core = self.core();
        self.server_stream(
            "watch_game_server",
            async move { core.watch_game_server(Empty {}).await },
            sink,
        );
    }
}

/// The registered watcher callbacks and their subscription.
pub struct Watchers {
    executor: Option<Arc<dyn Executor>>,
    /// `None` until the first registration opens the subscription.
    callbacks: Mutex<Option<Callbacks>>,
}

impl Watchers {
    /// Create an empty registry. Without an executor every registration
    /// fails.
    #[must_use]
    pub fn new(executor: Option<Arc<dyn Executor>>) -> Self {
        Self {
            executor,
            callbacks: Mutex::new(None),
        }
    }

    /// Whether callbacks can be registered.
    #[must_use]
    pub fn can_watch(&self) -> bool {
        self.executor.is_some()
    }

    /// Whether the upstream subscription has been opened.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.slot().is_some()
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slot()
            .as_ref()
            .map_or(0, |callbacks| read(callbacks).len())
    }

    /// Whether no callback has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register `callback`, opening the subscription on `source` if this is
    /// the first one.
    pub fn add<F>(&self, source: &impl GameServerSource, callback: F) -> Result<()>
    where
        F: Fn(&GameServer) + Send + Sync + 'static,
    {
        let Some(executor) = &self.executor else {
            return Err(Error::precondition(
                Feature::GameServerWatcher,
                "no game server watcher executor configured",
            ));
        };
        let callback: GameServerCallback = Arc::new(callback);

        let mut slot = self.slot();
        if let Some(callbacks) = slot.as_ref() {
            write(callbacks).push(callback);
            trace!("Added game server watcher");
            return Ok(());
        }

        let callbacks: Callbacks = Arc::new(RwLock::new(vec![callback]));
        source.subscribe(Box::new(DispatchSink {
            callbacks: Arc::clone(&callbacks),
            executor: Arc::clone(executor),
        }));
        *slot = Some(callbacks);
        debug!("Opened game server subscription");
        Ok(())
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Callbacks>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Watchers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchers")
            .field("has_executor", &self.executor.is_some())
            .field("callbacks", &self.len())
            .finish()
    }
}

fn read(callbacks: &Callbacks) -> std::sync::RwLockReadGuard<'_, Vec<GameServerCallback>> {
    callbacks.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(callbacks: &Callbacks) -> std::sync::RwLockWriteGuard<'_, Vec<GameServerCallback>> {
    callbacks.write().unwrap_or_else(PoisonError::into_inner)
}

struct DispatchSink {
    callbacks: Callbacks,
    executor: Arc<dyn Executor>,
}

impl ResponseSink<GameServer> for DispatchSink {
    fn on_next(&mut self, game_server: GameServer) {
        let callbacks = Arc::clone(&self.callbacks);
        self.executor.execute(Box::pin(async move {
            let snapshot: Vec<GameServerCallback> = read(&callbacks).clone();
            for callback in &snapshot {
                callback(&game_server);
            }
        }));
    }

    fn on_error(&mut self, status: Status) {
        warn!(
            code = ?status.code(),
            message = status.message(),
            "Game server subscription ended with error"
        );
    }

    fn on_completed(&mut self) {
        debug!("Game server subscription completed");
    }
}
