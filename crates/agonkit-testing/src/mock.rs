//! An in-process mock of the sidecar.
//!
//! [`MockSidecar`] serves the core, alpha and beta surfaces on an ephemeral
//! localhost port. Every request is recorded as a [`RecordedCall`] and the
//! shared [`MockState`] answers with the same status codes the real sidecar
//! uses (`NOT_FOUND`, `ALREADY_EXISTS`, `OUT_OF_RANGE`, `INVALID_ARGUMENT`).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use agonkit_core::proto::sdk::game_server::{ObjectMeta, Status as GameServerStatus, status};
use agonkit_core::proto::sdk::{Duration, Empty, GameServer, KeyValue};
use agonkit_core::proto::{alpha, beta, sdk};
use tokio::net::TcpListener;
use tokio::sync::{Notify, broadcast, oneshot};
use tokio_stream::wrappers::{BroadcastStream, TcpListenerStream};
use tokio_stream::{Stream, StreamExt};
use tonic::transport::{Channel, Endpoint, Server};
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, warn};

use crate::async_helpers::with_default_timeout;

/// Prefix the sidecar puts in front of labels and annotations set through
/// the SDK.
pub const METADATA_PREFIX: &str = "agones.dev/sdk-";

/// A request received by the mock sidecar.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    /// `Ready`.
    Ready,
    /// `Allocate`.
    Allocate,
    /// `Shutdown`.
    Shutdown,
    /// `Reserve` with the wire duration.
    Reserve {
        /// Reservation length in seconds.
        seconds: i64,
    },
    /// `SetLabel`.
    SetLabel {
        /// Label key, without prefix.
        key: String,
        /// Label value.
        value: String,
    },
    /// `SetAnnotation`.
    SetAnnotation {
        /// Annotation key, without prefix.
        key: String,
        /// Annotation value.
        value: String,
    },
    /// `GetGameServer`.
    GetGameServer,
    /// `WatchGameServer`.
    WatchGameServer,
    /// `PlayerConnect`.
    PlayerConnect(String),
    /// `PlayerDisconnect`.
    PlayerDisconnect(String),
    /// `IsPlayerConnected`.
    IsPlayerConnected(String),
    /// `GetConnectedPlayers`.
    GetConnectedPlayers,
    /// `SetPlayerCapacity`.
    SetPlayerCapacity(i64),
    /// `GetPlayerCapacity`.
    GetPlayerCapacity,
    /// `GetPlayerCount`.
    GetPlayerCount,
    /// `GetCounter`.
    GetCounter(String),
    /// `UpdateCounter` with the raw update request.
    UpdateCounter(beta::CounterUpdateRequest),
    /// `GetList`.
    GetList(String),
    /// `UpdateList`.
    UpdateList {
        /// The list sent by the client.
        list: beta::List,
        /// Field mask paths.
        paths: Vec<String>,
    },
    /// `AddListValue`.
    AddListValue {
        /// List name.
        name: String,
        /// Value to add.
        value: String,
    },
    /// `RemoveListValue`.
    RemoveListValue {
        /// List name.
        name: String,
        /// Value to remove.
        value: String,
    },
}

impl RecordedCall {
    /// Snake-case name of the RPC.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Allocate => "allocate",
            Self::Shutdown => "shutdown",
            Self::Reserve { .. } => "reserve",
            Self::SetLabel { .. } => "set_label",
            Self::SetAnnotation { .. } => "set_annotation",
            Self::GetGameServer => "get_game_server",
            Self::WatchGameServer => "watch_game_server",
            Self::PlayerConnect(_) => "player_connect",
            Self::PlayerDisconnect(_) => "player_disconnect",
            Self::IsPlayerConnected(_) => "is_player_connected",
            Self::GetConnectedPlayers => "get_connected_players",
            Self::SetPlayerCapacity(_) => "set_player_capacity",
            Self::GetPlayerCapacity => "get_player_capacity",
            Self::GetPlayerCount => "get_player_count",
            Self::GetCounter(_) => "get_counter",
            Self::UpdateCounter(_) => "update_counter",
            Self::GetList(_) => "get_list",
            Self::UpdateList { .. } => "update_list",
            Self::AddListValue { .. } => "add_list_value",
            Self::RemoveListValue { .. } => "remove_list_value",
        }
    }
}

#[derive(Debug, Default)]
struct Players {
    capacity: i64,
    connected: Vec<String>,
}

/// State shared by the mock's three services.
#[derive(Debug)]
pub struct MockState {
    calls: Mutex<Vec<RecordedCall>>,
    game_server: Mutex<GameServer>,
    players: Mutex<Players>,
    counters: Mutex<HashMap<String, beta::Counter>>,
    lists: Mutex<HashMap<String, beta::List>>,
    heartbeats: AtomicUsize,
    watchers: AtomicUsize,
    updates: broadcast::Sender<GameServer>,
    changed: Notify,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockState {
    fn new() -> Self {
        let (updates, _) = broadcast::channel(64);
        Self {
            calls: Mutex::new(Vec::new()),
            game_server: Mutex::new(GameServer {
                object_meta: Some(ObjectMeta {
                    name: "mock-gameserver".to_string(),
                    namespace: "default".to_string(),
                    ..ObjectMeta::default()
                }),
                spec: None,
                status: Some(GameServerStatus {
                    state: "Scheduled".to_string(),
                    address: "127.0.0.1".to_string(),
                    ..GameServerStatus::default()
                }),
            }),
            players: Mutex::new(Players::default()),
            counters: Mutex::new(HashMap::new()),
            lists: Mutex::new(HashMap::new()),
            heartbeats: AtomicUsize::new(0),
            watchers: AtomicUsize::new(0),
            updates,
            changed: Notify::new(),
        }
    }

    fn record(&self, call: RecordedCall) {
        debug!(call = call.name(), "Mock sidecar received call");
        lock(&self.calls).push(call);
        self.changed.notify_waiters();
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// How many requests with this RPC name were received.
    #[must_use]
    pub fn calls_named(&self, name: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.name() == name)
            .count()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_call(&self) -> Option<RecordedCall> {
        lock(&self.calls).last().cloned()
    }

    /// Heartbeats received across all health streams.
    #[must_use]
    pub fn heartbeats(&self) -> usize {
        self.heartbeats.load(Ordering::SeqCst)
    }

    /// Watch subscriptions opened so far.
    #[must_use]
    pub fn watchers(&self) -> usize {
        self.watchers.load(Ordering::SeqCst)
    }

    /// The current game server.
    #[must_use]
    pub fn game_server(&self) -> GameServer {
        lock(&self.game_server).clone()
    }

    /// Change the game server through `update` and push it to watchers.
    pub fn update_game_server(&self, update: impl FnOnce(&mut GameServer)) {
        let snapshot = {
            let mut gs = lock(&self.game_server);
            update(&mut gs);
            gs.clone()
        };
        // No receivers just means nobody is watching yet.
        let _ = self.updates.send(snapshot);
    }

    /// Set `status.state` and push the update.
    pub fn set_game_server_state(&self, state: &str) {
        self.update_game_server(|gs| {
            gs.status.get_or_insert_with(Default::default).state = state.to_string();
        });
    }

    /// Create or replace a counter.
    pub fn set_counter(&self, name: &str, count: i64, capacity: i64) {
        lock(&self.counters).insert(
            name.to_string(),
            beta::Counter {
                name: name.to_string(),
                count,
                capacity,
            },
        );
    }

    /// The current value of a counter.
    #[must_use]
    pub fn counter(&self, name: &str) -> Option<beta::Counter> {
        lock(&self.counters).get(name).cloned()
    }

    /// Create or replace a list.
    pub fn set_list(&self, name: &str, capacity: i64, values: &[&str]) {
        lock(&self.lists).insert(
            name.to_string(),
            beta::List {
                name: name.to_string(),
                capacity,
                values: values.iter().map(ToString::to_string).collect(),
            },
        );
    }

    /// The current contents of a list.
    #[must_use]
    pub fn list(&self, name: &str) -> Option<beta::List> {
        lock(&self.lists).get(name).cloned()
    }

    /// Wait until `condition` holds.
    ///
    /// # Panics
    ///
    /// Panics if the condition does not hold within the default timeout.
    pub async fn wait_until(&self, mut condition: impl FnMut(&Self) -> bool) {
        with_default_timeout(async {
            loop {
                let notified = self.changed.notified();
                if condition(self) {
                    return;
                }
                notified.await;
            }
        })
        .await;
    }

    fn set_metadata(&self, key: &str, value: &str, annotation: bool) {
        let key = format!("{METADATA_PREFIX}{key}");
        let value = value.to_string();
        self.update_game_server(|gs| {
            let meta = gs.object_meta.get_or_insert_with(Default::default);
            if annotation {
                meta.annotations.insert(key, value);
            } else {
                meta.labels.insert(key, value);
            }
        });
    }

    fn sync_players(&self) {
        let (count, capacity, ids) = {
            let players = lock(&self.players);
            (
                players.connected.len() as i64,
                players.capacity,
                players.connected.clone(),
            )
        };
        self.update_game_server(|gs| {
            let status = gs.status.get_or_insert_with(Default::default);
            status.players = Some(status::PlayerStatus {
                count,
                capacity,
                ids,
            });
        });
    }
}

/// A running mock sidecar.
///
/// The server stops when this value is dropped.
#[derive(Debug)]
pub struct MockSidecar {
    addr: SocketAddr,
    state: Arc<MockState>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockSidecar {
    /// Bind to an ephemeral localhost port and start serving.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(MockState::new());
        let (shutdown, stopped) = oneshot::channel::<()>();

        let router = Server::builder()
            .add_service(sdk::sdk_server::SdkServer::new(CoreService {
                state: Arc::clone(&state),
            }))
            .add_service(alpha::sdk_server::SdkServer::new(AlphaService {
                state: Arc::clone(&state),
            }))
            .add_service(beta::sdk_server::SdkServer::new(BetaService {
                state: Arc::clone(&state),
            }));

        tokio::spawn(async move {
            let incoming = TcpListenerStream::new(listener);
            let signal = async {
                let _ = stopped.await;
            };
            if let Err(e) = router.serve_with_incoming_shutdown(incoming, signal).await {
                warn!("Mock sidecar stopped with error: {e}");
            }
        });

        debug!(%addr, "Mock sidecar listening");
        Ok(Self {
            addr,
            state,
            shutdown: Some(shutdown),
        })
    }

    /// The bound socket address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The `host:port` target string.
    #[must_use]
    pub fn target(&self) -> String {
        self.addr.to_string()
    }

    /// A lazily connecting channel to the mock.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn channel(&self) -> Channel {
        Endpoint::from_shared(format!("http://{}", self.addr))
            .expect("socket address is a valid URI")
            .connect_lazy()
    }

    /// The shared state behind the services.
    #[must_use]
    pub fn state(&self) -> &MockState {
        &self.state
    }

    /// Wait until at least `count` watch subscriptions are open.
    pub async fn wait_for_watchers(&self, count: usize) {
        self.state.wait_until(|s| s.watchers() >= count).await;
    }

    /// Wait until at least `count` heartbeats were received.
    pub async fn wait_for_heartbeats(&self, count: usize) {
        self.state.wait_until(|s| s.heartbeats() >= count).await;
    }

    /// Wait until at least `count` calls named `name` were received.
    pub async fn wait_for_calls(&self, name: &str, count: usize) {
        self.state.wait_until(|s| s.calls_named(name) >= count).await;
    }
}

impl Drop for MockSidecar {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

type GameServerStream = Pin<Box<dyn Stream<Item = Result<GameServer, Status>> + Send>>;

struct CoreService {
    state: Arc<MockState>,
}

impl CoreService {
    fn transition(&self, call: RecordedCall, state: &str) -> Response<Empty> {
        self.state.record(call);
        self.state.set_game_server_state(state);
        Response::new(Empty {})
    }
}

#[tonic::async_trait]
impl sdk::sdk_server::Sdk for CoreService {
    async fn ready(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        Ok(self.transition(RecordedCall::Ready, "Ready"))
    }

    async fn allocate(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        Ok(self.transition(RecordedCall::Allocate, "Allocated"))
    }

    async fn shutdown(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        Ok(self.transition(RecordedCall::Shutdown, "Shutdown"))
    }

    async fn health(
        &self,
        request: Request<Streaming<Empty>>,
    ) -> Result<Response<Empty>, Status> {
        let mut stream = request.into_inner();
        while let Some(beat) = stream.next().await {
            match beat {
                Ok(_) => {
                    self.state.heartbeats.fetch_add(1, Ordering::SeqCst);
                    self.state.changed.notify_waiters();
                }
                Err(status) => {
                    debug!(code = ?status.code(), "Health stream ended with error");
                    return Err(status);
                }
            }
        }
        Ok(Response::new(Empty {}))
    }

    async fn get_game_server(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<GameServer>, Status> {
        self.state.record(RecordedCall::GetGameServer);
        Ok(Response::new(self.state.game_server()))
    }

    type WatchGameServerStream = GameServerStream;

    async fn watch_game_server(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<Self::WatchGameServerStream>, Status> {
        let updates = BroadcastStream::new(self.state.updates.subscribe())
            .filter_map(|update| update.ok().map(Ok::<_, Status>));
        self.state.watchers.fetch_add(1, Ordering::SeqCst);
        self.state.record(RecordedCall::WatchGameServer);
        Ok(Response::new(Box::pin(updates)))
    }

    async fn set_label(&self, request: Request<KeyValue>) -> Result<Response<Empty>, Status> {
        let KeyValue { key, value } = request.into_inner();
        self.state.set_metadata(&key, &value, false);
        self.state.record(RecordedCall::SetLabel { key, value });
        Ok(Response::new(Empty {}))
    }

    async fn set_annotation(
        &self,
        request: Request<KeyValue>,
    ) -> Result<Response<Empty>, Status> {
        let KeyValue { key, value } = request.into_inner();
        self.state.set_metadata(&key, &value, true);
        self.state.record(RecordedCall::SetAnnotation { key, value });
        Ok(Response::new(Empty {}))
    }

    async fn reserve(&self, request: Request<Duration>) -> Result<Response<Empty>, Status> {
        let seconds = request.into_inner().seconds;
        Ok(self.transition(RecordedCall::Reserve { seconds }, "Reserved"))
    }
}

struct AlphaService {
    state: Arc<MockState>,
}

#[tonic::async_trait]
impl alpha::sdk_server::Sdk for AlphaService {
    async fn player_connect(
        &self,
        request: Request<alpha::PlayerId>,
    ) -> Result<Response<alpha::Bool>, Status> {
        let id = request.into_inner().player_id;
        self.state.record(RecordedCall::PlayerConnect(id.clone()));
        let added = {
            let mut players = lock(&self.state.players);
            if players.connected.contains(&id) {
                false
            } else if players.connected.len() as i64 >= players.capacity {
                return Err(Status::out_of_range("players are already at capacity"));
            } else {
                players.connected.push(id);
                true
            }
        };
        if added {
            self.state.sync_players();
        }
        Ok(Response::new(alpha::Bool { bool: added }))
    }

    async fn player_disconnect(
        &self,
        request: Request<alpha::PlayerId>,
    ) -> Result<Response<alpha::Bool>, Status> {
        let id = request.into_inner().player_id;
        self.state.record(RecordedCall::PlayerDisconnect(id.clone()));
        let removed = {
            let mut players = lock(&self.state.players);
            let before = players.connected.len();
            players.connected.retain(|p| p != &id);
            players.connected.len() != before
        };
        if removed {
            self.state.sync_players();
        }
        Ok(Response::new(alpha::Bool { bool: removed }))
    }

    async fn set_player_capacity(
        &self,
        request: Request<alpha::Count>,
    ) -> Result<Response<alpha::Empty>, Status> {
        let capacity = request.into_inner().count;
        self.state.record(RecordedCall::SetPlayerCapacity(capacity));
        if capacity < 0 {
            return Err(Status::invalid_argument("capacity must not be negative"));
        }
        lock(&self.state.players).capacity = capacity;
        self.state.sync_players();
        Ok(Response::new(alpha::Empty {}))
    }

    async fn get_player_capacity(
        &self,
        _request: Request<alpha::Empty>,
    ) -> Result<Response<alpha::Count>, Status> {
        self.state.record(RecordedCall::GetPlayerCapacity);
        let count = lock(&self.state.players).capacity;
        Ok(Response::new(alpha::Count { count }))
    }

    async fn get_player_count(
        &self,
        _request: Request<alpha::Empty>,
    ) -> Result<Response<alpha::Count>, Status> {
        self.state.record(RecordedCall::GetPlayerCount);
        let count = lock(&self.state.players).connected.len() as i64;
        Ok(Response::new(alpha::Count { count }))
    }

    async fn is_player_connected(
        &self,
        request: Request<alpha::PlayerId>,
    ) -> Result<Response<alpha::Bool>, Status> {
        let id = request.into_inner().player_id;
        let connected = lock(&self.state.players).connected.contains(&id);
        self.state.record(RecordedCall::IsPlayerConnected(id));
        Ok(Response::new(alpha::Bool { bool: connected }))
    }

    async fn get_connected_players(
        &self,
        _request: Request<alpha::Empty>,
    ) -> Result<Response<alpha::PlayerIdList>, Status> {
        self.state.record(RecordedCall::GetConnectedPlayers);
        let list = lock(&self.state.players).connected.clone();
        Ok(Response::new(alpha::PlayerIdList { list }))
    }
}

struct BetaService {
    state: Arc<MockState>,
}

fn counter_not_found(name: &str) -> Status {
    Status::not_found(format!("counter not found: {name}"))
}

fn list_not_found(name: &str) -> Status {
    Status::not_found(format!("list not found: {name}"))
}

#[tonic::async_trait]
impl beta::sdk_server::Sdk for BetaService {
    async fn get_counter(
        &self,
        request: Request<beta::GetCounterRequest>,
    ) -> Result<Response<beta::Counter>, Status> {
        let name = request.into_inner().name;
        self.state.record(RecordedCall::GetCounter(name.clone()));
        self.state
            .counter(&name)
            .map(Response::new)
            .ok_or_else(|| counter_not_found(&name))
    }

    async fn update_counter(
        &self,
        request: Request<beta::UpdateCounterRequest>,
    ) -> Result<Response<beta::Counter>, Status> {
        let update = request
            .into_inner()
            .counter_update_request
            .ok_or_else(|| Status::invalid_argument("counterUpdateRequest is required"))?;
        self.state.record(RecordedCall::UpdateCounter(update.clone()));

        let mut counters = lock(&self.state.counters);
        let current = counters
            .get_mut(&update.name)
            .ok_or_else(|| counter_not_found(&update.name))?;

        let mut next = current.clone();
        if let Some(capacity) = update.capacity {
            if capacity < 0 {
                return Err(Status::out_of_range(format!(
                    "capacity must be at least 0, got {capacity}"
                )));
            }
            next.capacity = capacity;
        }
        if let Some(count) = update.count {
            next.count = count;
        }
        next.count = next.count.saturating_add(update.count_diff);
        if next.count < 0 || next.count > next.capacity {
            return Err(Status::out_of_range(format!(
                "count {} is out of range [0, {}]",
                next.count, next.capacity
            )));
        }

        *current = next.clone();
        Ok(Response::new(next))
    }

    async fn get_list(
        &self,
        request: Request<beta::GetListRequest>,
    ) -> Result<Response<beta::List>, Status> {
        let name = request.into_inner().name;
        self.state.record(RecordedCall::GetList(name.clone()));
        self.state
            .list(&name)
            .map(Response::new)
            .ok_or_else(|| list_not_found(&name))
    }

    async fn update_list(
        &self,
        request: Request<beta::UpdateListRequest>,
    ) -> Result<Response<beta::List>, Status> {
        let request = request.into_inner();
        let list = request
            .list
            .ok_or_else(|| Status::invalid_argument("list is required"))?;
        let paths = request.update_mask.map(|m| m.paths).unwrap_or_default();
        self.state.record(RecordedCall::UpdateList {
            list: list.clone(),
            paths: paths.clone(),
        });

        if paths.is_empty() {
            return Err(Status::invalid_argument("update_mask is required"));
        }
        if let Some(bad) = paths.iter().find(|p| *p != "capacity" && *p != "values") {
            return Err(Status::invalid_argument(format!(
                "field mask path '{bad}' is not a field of List"
            )));
        }

        let mut lists = lock(&self.state.lists);
        let current = lists
            .get_mut(&list.name)
            .ok_or_else(|| list_not_found(&list.name))?;

        let mut next = current.clone();
        if paths.iter().any(|p| p == "capacity") {
            if list.capacity < 0 {
                return Err(Status::out_of_range("capacity must be at least 0"));
            }
            next.capacity = list.capacity;
        }
        if paths.iter().any(|p| p == "values") {
            next.values.clear();
            for value in list.values {
                if !next.values.contains(&value) {
                    next.values.push(value);
                }
            }
        }
        let capacity = usize::try_from(next.capacity).unwrap_or(0);
        next.values.truncate(capacity);

        *current = next.clone();
        Ok(Response::new(next))
    }

    async fn add_list_value(
        &self,
        request: Request<beta::AddListValueRequest>,
    ) -> Result<Response<beta::List>, Status> {
        let beta::AddListValueRequest { name, value } = request.into_inner();
        self.state.record(RecordedCall::AddListValue {
            name: name.clone(),
            value: value.clone(),
        });

        let mut lists = lock(&self.state.lists);
        let list = lists.get_mut(&name).ok_or_else(|| list_not_found(&name))?;
        if list.values.contains(&value) {
            return Err(Status::already_exists(format!(
                "value '{value}' already in list {name}"
            )));
        }
        if list.values.len() as i64 >= list.capacity {
            return Err(Status::out_of_range(format!("list {name} is at capacity")));
        }
        list.values.push(value);
        Ok(Response::new(list.clone()))
    }

    async fn remove_list_value(
        &self,
        request: Request<beta::RemoveListValueRequest>,
    ) -> Result<Response<beta::List>, Status> {
        let beta::RemoveListValueRequest { name, value } = request.into_inner();
        self.state.record(RecordedCall::RemoveListValue {
            name: name.clone(),
            value: value.clone(),
        });

        let mut lists = lock(&self.state.lists);
        let list = lists.get_mut(&name).ok_or_else(|| list_not_found(&name))?;
        let position = list
            .values
            .iter()
            .position(|v| v == &value)
            .ok_or_else(|| Status::not_found(format!("value '{value}' not in list {name}")))?;
        list.values.remove(position);
        Ok(Response::new(list.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tonic::Code;

    #[tokio::test]
    async fn test_ready_is_recorded_and_broadcast() {
        let mock = MockSidecar::start().await.unwrap();
        let mut client = sdk::sdk_client::SdkClient::new(mock.channel());

        let mut watch = client
            .watch_game_server(Empty {})
            .await
            .unwrap()
            .into_inner();
        mock.wait_for_watchers(1).await;

        client.ready(Empty {}).await.unwrap();
        let update = watch.message().await.unwrap().unwrap();
        assert_eq!(update.status.unwrap().state, "Ready");
        assert_eq!(
            mock.state().calls(),
            vec![RecordedCall::WatchGameServer, RecordedCall::Ready]
        );
    }

    #[tokio::test]
    async fn test_counter_bounds() {
        let mock = MockSidecar::start().await.unwrap();
        mock.state().set_counter("rooms", 9, 10);
        let mut client = beta::sdk_client::SdkClient::new(mock.channel());

        let update = |diff| beta::UpdateCounterRequest {
            counter_update_request: Some(beta::CounterUpdateRequest {
                name: "rooms".to_string(),
                count: None,
                capacity: None,
                count_diff: diff,
            }),
        };

        let counter = client.update_counter(update(1)).await.unwrap().into_inner();
        assert_eq!(counter.count, 10);

        let err = client.update_counter(update(1)).await.unwrap_err();
        assert_eq!(err.code(), Code::OutOfRange);
        assert_eq!(mock.state().counter("rooms").unwrap().count, 10);
    }

    #[tokio::test]
    async fn test_list_rules() {
        let mock = MockSidecar::start().await.unwrap();
        mock.state().set_list("party", 2, &["a"]);
        let mut client = beta::sdk_client::SdkClient::new(mock.channel());

        let add = |value: &str| beta::AddListValueRequest {
            name: "party".to_string(),
            value: value.to_string(),
        };
        let err = client.add_list_value(add("a")).await.unwrap_err();
        assert_eq!(err.code(), Code::AlreadyExists);

        client.add_list_value(add("b")).await.unwrap();
        let err = client.add_list_value(add("c")).await.unwrap_err();
        assert_eq!(err.code(), Code::OutOfRange);

        let err = client
            .get_list(beta::GetListRequest {
                name: "nope".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn test_heartbeats_are_counted() {
        let mock = MockSidecar::start().await.unwrap();
        let mut client = sdk::sdk_client::SdkClient::new(mock.channel());

        let beats = tokio_stream::iter(vec![Empty {}, Empty {}]);
        client.health(beats).await.unwrap();
        assert_eq!(mock.state().heartbeats(), 2);
    }
}
