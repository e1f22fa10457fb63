//! The sidecar client.
//!
//! [`Sidecar`] composes the transport handle, the heartbeat scheduler and
//! the watcher fan-out behind one API. Every remote operation comes in
//! three forms:
//!
//! - `op_with(args, sink)`: push the result into a [`ResponseSink`]
//! - `op(args)`: fire and forget (failures are logged at `debug`)
//! - `op_future(args)`: a [`ResponseFuture`] for the result
//!
//! None of them block; awaiting a future is up to the caller.

use std::time::Duration;

use agonkit_core::proto::sdk::{self, GameServer};
use agonkit_core::proto::{alpha, beta};
use agonkit_core::sink::{self, DiscardSink, MappedSink, ResponseFuture, ResponseSink};
use agonkit_core::{CounterSnapshot, ListSnapshot, Result};
use agonkit_transport::TransportHandle;
use prost_types::FieldMask;
use tokio::sync::mpsc;
use tracing::debug;

use crate::builder::SidecarBuilder;
use crate::health::HealthChecker;
use crate::watcher::Watchers;

/// Client for the local game server sidecar.
///
/// Build one with [`SidecarBuilder`]. Dropping the client without calling
/// [`close`](Self::close) leaves in-flight calls running until the runtime
/// drops them.
#[derive(Debug)]
pub struct Sidecar {
    transport: TransportHandle,
    health: HealthChecker,
    watchers: Watchers,
}

/// Adapt a unit sink to an RPC that replies with an empty message.
fn unit<E: 'static, S: ResponseSink<()>>(sink: S) -> MappedSink<S, fn(E), ()> {
    let discard: fn(E) = |_| ();
    MappedSink::new(sink, discard)
}

impl Sidecar {
    /// Start configuring a client from the process environment.
    #[must_use]
    pub fn builder() -> SidecarBuilder {
        SidecarBuilder::new()
    }

    pub(crate) fn from_parts(
        transport: TransportHandle,
        health: HealthChecker,
        watchers: Watchers,
    ) -> Self {
        Self {
            transport,
            health,
            watchers,
        }
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &TransportHandle {
        &self.transport
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Mark the game server as ready to receive players.
    pub fn ready_with(&self, sink: impl ResponseSink<()>) {
        let mut client = self.transport.core();
        self.transport.unary(
            "ready",
            async move { client.ready(sdk::Empty {}).await },
            unit(sink),
        );
    }

    /// Mark the game server as ready, ignoring the result.
    pub fn ready(&self) {
        self.ready_with(DiscardSink::named("ready"));
    }

    /// Mark the game server as ready.
    pub fn ready_future(&self) -> ResponseFuture<()> {
        sink::to_future(|sink| self.ready_with(sink))
    }

    /// Reserve the game server for `duration` (whole seconds on the wire).
    pub fn reserve_with(&self, duration: Duration, sink: impl ResponseSink<()>) {
        let seconds = i64::try_from(duration.as_secs()).unwrap_or(i64::MAX);
        let mut client = self.transport.core();
        self.transport.unary(
            "reserve",
            async move { client.reserve(sdk::Duration { seconds }).await },
            unit(sink),
        );
    }

    /// Reserve the game server, ignoring the result.
    pub fn reserve(&self, duration: Duration) {
        self.reserve_with(duration, DiscardSink::named("reserve"));
    }

    /// Reserve the game server.
    pub fn reserve_future(&self, duration: Duration) -> ResponseFuture<()> {
        sink::to_future(|sink| self.reserve_with(duration, sink))
    }

    /// Tell the sidecar the game server is shutting down.
    pub fn shutdown_with(&self, sink: impl ResponseSink<()>) {
        let mut client = self.transport.core();
        self.transport.unary(
            "shutdown",
            async move { client.shutdown(sdk::Empty {}).await },
            unit(sink),
        );
    }

    /// Request shutdown, ignoring the result.
    pub fn shutdown(&self) {
        self.shutdown_with(DiscardSink::named("shutdown"));
    }

    /// Request shutdown.
    pub fn shutdown_future(&self) -> ResponseFuture<()> {
        sink::to_future(|sink| self.shutdown_with(sink))
    }

    /// Allocate the game server to itself.
    pub fn allocate_with(&self, sink: impl ResponseSink<()>) {
        let mut client = self.transport.core();
        self.transport.unary(
            "allocate",
            async move { client.allocate(sdk::Empty {}).await },
            unit(sink),
        );
    }

    /// Self-allocate, ignoring the result.
    pub fn allocate(&self) {
        self.allocate_with(DiscardSink::named("allocate"));
    }

    /// Self-allocate.
    pub fn allocate_future(&self) -> ResponseFuture<()> {
        sink::to_future(|sink| self.allocate_with(sink))
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    /// Set a label on the game server. The sidecar prefixes the key.
    pub fn set_label_with(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        sink: impl ResponseSink<()>,
    ) {
        let request = sdk::KeyValue {
            key: key.into(),
            value: value.into(),
        };
        let mut client = self.transport.core();
        self.transport.unary(
            "set_label",
            async move { client.set_label(request).await },
            unit(sink),
        );
    }

    /// Set a label, ignoring the result.
    pub fn set_label(&self, key: impl Into<String>, value: impl Into<String>) {
        self.set_label_with(key, value, DiscardSink::named("set_label"));
    }

    /// Set a label.
    pub fn set_label_future(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> ResponseFuture<()> {
        sink::to_future(|sink| self.set_label_with(key, value, sink))
    }

    /// Set an annotation on the game server. The sidecar prefixes the key.
    pub fn set_annotation_with(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        sink: impl ResponseSink<()>,
    ) {
        let request = sdk::KeyValue {
            key: key.into(),
            value: value.into(),
        };
        let mut client = self.transport.core();
        self.transport.unary(
            "set_annotation",
            async move { client.set_annotation(request).await },
            unit(sink),
        );
    }

    /// Set an annotation, ignoring the result.
    pub fn set_annotation(&self, key: impl Into<String>, value: impl Into<String>) {
        self.set_annotation_with(key, value, DiscardSink::named("set_annotation"));
    }

    /// Set an annotation.
    pub fn set_annotation_future(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> ResponseFuture<()> {
        sink::to_future(|sink| self.set_annotation_with(key, value, sink))
    }

    // ------------------------------------------------------------------
    // Game server state
    // ------------------------------------------------------------------

    /// Fetch the current game server.
    pub fn get_game_server_with(&self, sink: impl ResponseSink<GameServer>) {
        let mut client = self.transport.core();
        self.transport.unary(
            "get_game_server",
            async move { client.get_game_server(sdk::Empty {}).await },
            sink,
        );
    }

    /// Fetch the current game server, ignoring the result.
    pub fn get_game_server(&self) {
        self.get_game_server_with(DiscardSink::named("get_game_server"));
    }

    /// Fetch the current game server.
    pub fn get_game_server_future(&self) -> ResponseFuture<GameServer> {
        sink::to_future(|sink| self.get_game_server_with(sink))
    }

    /// Open a raw game server subscription.
    ///
    /// Every call opens a new stream. For shared callbacks on a single
    /// stream use [`add_game_server_watcher`](Self::add_game_server_watcher).
    pub fn watch_game_server(&self, sink: impl ResponseSink<GameServer>) {
        let mut client = self.transport.core();
        self.transport.server_stream(
            "watch_game_server",
            async move { client.watch_game_server(sdk::Empty {}).await },
            sink,
        );
    }

    /// Register a callback for game server updates.
    ///
    /// The first registration opens the shared subscription. Callbacks run
    /// on the watcher executor in registration order and cannot be removed.
    /// Fails when no watcher executor was configured.
    pub fn add_game_server_watcher<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&GameServer) + Send + Sync + 'static,
    {
        self.watchers.add(&self.transport, callback)
    }

    /// Whether watcher callbacks can be registered.
    #[must_use]
    pub fn can_watch_game_server(&self) -> bool {
        self.watchers.can_watch()
    }

    // ------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------

    /// Open a raw heartbeat stream and return its upstream sender.
    ///
    /// For callers that schedule heartbeats themselves. `sink` receives the
    /// reply once the sender is dropped.
    pub fn health_check_stream(&self, sink: impl ResponseSink<()>) -> mpsc::Sender<sdk::Empty> {
        let mut client = self.transport.core();
        self.transport.client_stream(
            "health",
            move |beats| async move { client.health(beats).await },
            unit(sink),
        )
    }

    /// Start periodic heartbeats, replacing any running schedule.
    ///
    /// Fails when no delay and period were configured.
    pub fn start_health_checking(&self) -> Result<()> {
        self.health.start(&self.transport)
    }

    /// Stop periodic heartbeats.
    pub fn stop_health_checking(&self) {
        self.health.stop();
    }

    /// Whether heartbeats can be started.
    #[must_use]
    pub fn can_health_check(&self) -> bool {
        self.health.can_health_check()
    }

    /// Whether heartbeats are currently scheduled.
    #[must_use]
    pub fn is_health_checking(&self) -> bool {
        self.health.is_running()
    }

    // ------------------------------------------------------------------
    // Players (alpha)
    // ------------------------------------------------------------------

    /// Record a player connection. Yields `false` if already connected.
    pub fn player_connect_with(&self, player_id: impl Into<String>, sink: impl ResponseSink<bool>) {
        let request = alpha::PlayerId {
            player_id: player_id.into(),
        };
        let mut client = self.transport.alpha();
        self.transport.unary(
            "player_connect",
            async move { client.player_connect(request).await },
            sink::map(sink, |reply: alpha::Bool| reply.bool),
        );
    }

    /// Record a player connection, ignoring the result.
    pub fn player_connect(&self, player_id: impl Into<String>) {
        self.player_connect_with(player_id, DiscardSink::named("player_connect"));
    }

    /// Record a player connection.
    pub fn player_connect_future(&self, player_id: impl Into<String>) -> ResponseFuture<bool> {
        sink::to_future(|sink| self.player_connect_with(player_id, sink))
    }

    /// Record a player disconnection. Yields `false` if not connected.
    pub fn player_disconnect_with(
        &self,
        player_id: impl Into<String>,
        sink: impl ResponseSink<bool>,
    ) {
        let request = alpha::PlayerId {
            player_id: player_id.into(),
        };
        let mut client = self.transport.alpha();
        self.transport.unary(
            "player_disconnect",
            async move { client.player_disconnect(request).await },
            sink::map(sink, |reply: alpha::Bool| reply.bool),
        );
    }

    /// Record a player disconnection, ignoring the result.
    pub fn player_disconnect(&self, player_id: impl Into<String>) {
        self.player_disconnect_with(player_id, DiscardSink::named("player_disconnect"));
    }

    /// Record a player disconnection.
    pub fn player_disconnect_future(&self, player_id: impl Into<String>) -> ResponseFuture<bool> {
        sink::to_future(|sink| self.player_disconnect_with(player_id, sink))
    }

    /// Check whether a player is connected.
    pub fn is_player_connected_with(
        &self,
        player_id: impl Into<String>,
        sink: impl ResponseSink<bool>,
    ) {
        let request = alpha::PlayerId {
            player_id: player_id.into(),
        };
        let mut client = self.transport.alpha();
        self.transport.unary(
            "is_player_connected",
            async move { client.is_player_connected(request).await },
            sink::map(sink, |reply: alpha::Bool| reply.bool),
        );
    }

    /// Check whether a player is connected, ignoring the result.
    pub fn is_player_connected(&self, player_id: impl Into<String>) {
        self.is_player_connected_with(player_id, DiscardSink::named("is_player_connected"));
    }

    /// Check whether a player is connected.
    pub fn is_player_connected_future(&self, player_id: impl Into<String>) -> ResponseFuture<bool> {
        sink::to_future(|sink| self.is_player_connected_with(player_id, sink))
    }

    /// List connected player ids.
    pub fn get_connected_players_with(&self, sink: impl ResponseSink<Vec<String>>) {
        let mut client = self.transport.alpha();
        self.transport.unary(
            "get_connected_players",
            async move { client.get_connected_players(alpha::Empty {}).await },
            sink::map(sink, |reply: alpha::PlayerIdList| reply.list),
        );
    }

    /// List connected player ids, ignoring the result.
    pub fn get_connected_players(&self) {
        self.get_connected_players_with(DiscardSink::named("get_connected_players"));
    }

    /// List connected player ids.
    pub fn get_connected_players_future(&self) -> ResponseFuture<Vec<String>> {
        sink::to_future(|sink| self.get_connected_players_with(sink))
    }

    /// Set the player capacity.
    pub fn set_player_capacity_with(&self, capacity: i64, sink: impl ResponseSink<()>) {
        let mut client = self.transport.alpha();
        self.transport.unary(
            "set_player_capacity",
            async move { client.set_player_capacity(alpha::Count { count: capacity }).await },
            unit(sink),
        );
    }

    /// Set the player capacity, ignoring the result.
    pub fn set_player_capacity(&self, capacity: i64) {
        self.set_player_capacity_with(capacity, DiscardSink::named("set_player_capacity"));
    }

    /// Set the player capacity.
    pub fn set_player_capacity_future(&self, capacity: i64) -> ResponseFuture<()> {
        sink::to_future(|sink| self.set_player_capacity_with(capacity, sink))
    }

    /// Fetch the player capacity.
    pub fn get_player_capacity_with(&self, sink: impl ResponseSink<i64>) {
        let mut client = self.transport.alpha();
        self.transport.unary(
            "get_player_capacity",
            async move { client.get_player_capacity(alpha::Empty {}).await },
            sink::map(sink, |reply: alpha::Count| reply.count),
        );
    }

    /// Fetch the player capacity, ignoring the result.
    pub fn get_player_capacity(&self) {
        self.get_player_capacity_with(DiscardSink::named("get_player_capacity"));
    }

    /// Fetch the player capacity.
    pub fn get_player_capacity_future(&self) -> ResponseFuture<i64> {
        sink::to_future(|sink| self.get_player_capacity_with(sink))
    }

    /// Fetch the connected player count.
    pub fn get_player_count_with(&self, sink: impl ResponseSink<i64>) {
        let mut client = self.transport.alpha();
        self.transport.unary(
            "get_player_count",
            async move { client.get_player_count(alpha::Empty {}).await },
            sink::map(sink, |reply: alpha::Count| reply.count),
        );
    }

    /// Fetch the connected player count, ignoring the result.
    pub fn get_player_count(&self) {
        self.get_player_count_with(DiscardSink::named("get_player_count"));
    }

    /// Fetch the connected player count.
    pub fn get_player_count_future(&self) -> ResponseFuture<i64> {
        sink::to_future(|sink| self.get_player_count_with(sink))
    }

    // ------------------------------------------------------------------
    // Lists (beta)
    // ------------------------------------------------------------------

    /// Fetch a list. Fails with `NOT_FOUND` if it does not exist.
    pub fn get_list_with(&self, name: impl Into<String>, sink: impl ResponseSink<ListSnapshot>) {
        let request = beta::GetListRequest { name: name.into() };
        let mut client = self.transport.beta();
        self.transport.unary(
            "get_list",
            async move { client.get_list(request).await },
            sink::map(sink, ListSnapshot::from_wire),
        );
    }

    /// Fetch a list, ignoring the result.
    pub fn get_list(&self, name: impl Into<String>) {
        self.get_list_with(name, DiscardSink::named("get_list"));
    }

    /// Fetch a list.
    pub fn get_list_future(&self, name: impl Into<String>) -> ResponseFuture<ListSnapshot> {
        sink::to_future(|sink| self.get_list_with(name, sink))
    }

    /// Append a value to a list.
    ///
    /// Fails with `ALREADY_EXISTS` for a duplicate and `OUT_OF_RANGE` when
    /// the list is full.
    pub fn add_list_value_with(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
        sink: impl ResponseSink<ListSnapshot>,
    ) {
        let request = beta::AddListValueRequest {
            name: name.into(),
            value: value.into(),
        };
        let mut client = self.transport.beta();
        self.transport.unary(
            "add_list_value",
            async move { client.add_list_value(request).await },
            sink::map(sink, ListSnapshot::from_wire),
        );
    }

    /// Append a value to a list, ignoring the result.
    pub fn add_list_value(&self, name: impl Into<String>, value: impl Into<String>) {
        self.add_list_value_with(name, value, DiscardSink::named("add_list_value"));
    }

    /// Append a value to a list.
    pub fn add_list_value_future(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> ResponseFuture<ListSnapshot> {
        sink::to_future(|sink| self.add_list_value_with(name, value, sink))
    }

    /// Remove a value from a list. Fails with `NOT_FOUND` if absent.
    pub fn remove_list_value_with(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
        sink: impl ResponseSink<ListSnapshot>,
    ) {
        let request = beta::RemoveListValueRequest {
            name: name.into(),
            value: value.into(),
        };
        let mut client = self.transport.beta();
        self.transport.unary(
            "remove_list_value",
            async move { client.remove_list_value(request).await },
            sink::map(sink, ListSnapshot::from_wire),
        );
    }

    /// Remove a value from a list, ignoring the result.
    pub fn remove_list_value(&self, name: impl Into<String>, value: impl Into<String>) {
        self.remove_list_value_with(name, value, DiscardSink::named("remove_list_value"));
    }

    /// Remove a value from a list.
    pub fn remove_list_value_future(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> ResponseFuture<ListSnapshot> {
        sink::to_future(|sink| self.remove_list_value_with(name, value, sink))
    }

    /// Overwrite the fields of `list` named in `update_mask` (`capacity`,
    /// `values`). Fails with `INVALID_ARGUMENT` for any other path.
    pub fn update_list_with(
        &self,
        list: ListSnapshot,
        update_mask: Vec<String>,
        sink: impl ResponseSink<ListSnapshot>,
    ) {
        let request = update_list_request(list, update_mask);
        let mut client = self.transport.beta();
        self.transport.unary(
            "update_list",
            async move { client.update_list(request).await },
            sink::map(sink, ListSnapshot::from_wire),
        );
    }

    /// Update a list, ignoring the result.
    pub fn update_list(&self, list: ListSnapshot, update_mask: Vec<String>) {
        self.update_list_with(list, update_mask, DiscardSink::named("update_list"));
    }

    /// Update a list.
    pub fn update_list_future(
        &self,
        list: ListSnapshot,
        update_mask: Vec<String>,
    ) -> ResponseFuture<ListSnapshot> {
        sink::to_future(|sink| self.update_list_with(list, update_mask, sink))
    }

    // ------------------------------------------------------------------
    // Counters (beta)
    // ------------------------------------------------------------------

    /// Fetch a counter. Fails with `NOT_FOUND` if it does not exist.
    pub fn get_counter_with(
        &self,
        name: impl Into<String>,
        sink: impl ResponseSink<CounterSnapshot>,
    ) {
        let request = beta::GetCounterRequest { name: name.into() };
        let mut client = self.transport.beta();
        self.transport.unary(
            "get_counter",
            async move { client.get_counter(request).await },
            sink::map(sink, CounterSnapshot::from_wire),
        );
    }

    /// Fetch a counter, ignoring the result.
    pub fn get_counter(&self, name: impl Into<String>) {
        self.get_counter_with(name, DiscardSink::named("get_counter"));
    }

    /// Fetch a counter.
    pub fn get_counter_future(&self, name: impl Into<String>) -> ResponseFuture<CounterSnapshot> {
        sink::to_future(|sink| self.get_counter_with(name, sink))
    }

    fn update_counter_with(
        &self,
        operation: &'static str,
        request: beta::CounterUpdateRequest,
        sink: impl ResponseSink<CounterSnapshot>,
    ) {
        debug!(operation, counter = %request.name, "Updating counter");
        let request = beta::UpdateCounterRequest {
            counter_update_request: Some(request),
        };
        let mut client = self.transport.beta();
        self.transport.unary(
            operation,
            async move { client.update_counter(request).await },
            sink::map(sink, CounterSnapshot::from_wire),
        );
    }

    /// Add `|amount|` to a counter. Fails with `OUT_OF_RANGE` past capacity.
    pub fn increase_counter_with(
        &self,
        name: impl Into<String>,
        amount: i64,
        sink: impl ResponseSink<CounterSnapshot>,
    ) {
        self.update_counter_with("increase_counter", increase_request(name, amount), sink);
    }

    /// Increase a counter, ignoring the result.
    pub fn increase_counter(&self, name: impl Into<String>, amount: i64) {
        self.increase_counter_with(name, amount, DiscardSink::named("increase_counter"));
    }

    /// Increase a counter.
    pub fn increase_counter_future(
        &self,
        name: impl Into<String>,
        amount: i64,
    ) -> ResponseFuture<CounterSnapshot> {
        sink::to_future(|sink| self.increase_counter_with(name, amount, sink))
    }

    /// Subtract `|amount|` from a counter. Fails with `OUT_OF_RANGE` below
    /// zero.
    pub fn decrease_counter_with(
        &self,
        name: impl Into<String>,
        amount: i64,
        sink: impl ResponseSink<CounterSnapshot>,
    ) {
        self.update_counter_with("decrease_counter", decrease_request(name, amount), sink);
    }

    /// Decrease a counter, ignoring the result.
    pub fn decrease_counter(&self, name: impl Into<String>, amount: i64) {
        self.decrease_counter_with(name, amount, DiscardSink::named("decrease_counter"));
    }

    /// Decrease a counter.
    pub fn decrease_counter_future(
        &self,
        name: impl Into<String>,
        amount: i64,
    ) -> ResponseFuture<CounterSnapshot> {
        sink::to_future(|sink| self.decrease_counter_with(name, amount, sink))
    }

    /// Set a counter's count.
    pub fn set_counter_count_with(
        &self,
        name: impl Into<String>,
        count: i64,
        sink: impl ResponseSink<CounterSnapshot>,
    ) {
        self.update_counter_with("set_counter_count", set_count_request(name, count), sink);
    }

    /// Set a counter's count, ignoring the result.
    pub fn set_counter_count(&self, name: impl Into<String>, count: i64) {
        self.set_counter_count_with(name, count, DiscardSink::named("set_counter_count"));
    }

    /// Set a counter's count.
    pub fn set_counter_count_future(
        &self,
        name: impl Into<String>,
        count: i64,
    ) -> ResponseFuture<CounterSnapshot> {
        sink::to_future(|sink| self.set_counter_count_with(name, count, sink))
    }

    /// Set a counter's capacity.
    pub fn set_counter_capacity_with(
        &self,
        name: impl Into<String>,
        capacity: i64,
        sink: impl ResponseSink<CounterSnapshot>,
    ) {
        self.update_counter_with(
            "set_counter_capacity",
            set_capacity_request(name, capacity),
            sink,
        );
    }

    /// Set a counter's capacity, ignoring the result.
    pub fn set_counter_capacity(&self, name: impl Into<String>, capacity: i64) {
        self.set_counter_capacity_with(name, capacity, DiscardSink::named("set_counter_capacity"));
    }

    /// Set a counter's capacity.
    pub fn set_counter_capacity_future(
        &self,
        name: impl Into<String>,
        capacity: i64,
    ) -> ResponseFuture<CounterSnapshot> {
        sink::to_future(|sink| self.set_counter_capacity_with(name, capacity, sink))
    }

    // ------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------

    /// Stop heartbeats and close the transport.
    ///
    /// Waits up to five seconds for in-flight calls, then cancels them.
    /// Ends the watcher subscription and all raw streams.
    pub async fn close(self) {
        self.health.stop();
        self.transport.close().await;
    }
}

fn counter_update(name: impl Into<String>) -> beta::CounterUpdateRequest {
    beta::CounterUpdateRequest {
        name: name.into(),
        count: None,
        capacity: None,
        count_diff: 0,
    }
}

/// Increment by `|amount|`, whatever its sign.
fn increase_request(name: impl Into<String>, amount: i64) -> beta::CounterUpdateRequest {
    beta::CounterUpdateRequest {
        count_diff: amount.saturating_abs(),
        ..counter_update(name)
    }
}

/// Decrement by `|amount|`, whatever its sign.
fn decrease_request(name: impl Into<String>, amount: i64) -> beta::CounterUpdateRequest {
    beta::CounterUpdateRequest {
        count_diff: -amount.saturating_abs(),
        ..counter_update(name)
    }
}

fn set_count_request(name: impl Into<String>, count: i64) -> beta::CounterUpdateRequest {
    beta::CounterUpdateRequest {
        count: Some(count),
        ..counter_update(name)
    }
}

fn set_capacity_request(name: impl Into<String>, capacity: i64) -> beta::CounterUpdateRequest {
    beta::CounterUpdateRequest {
        capacity: Some(capacity),
        ..counter_update(name)
    }
}

fn update_list_request(list: ListSnapshot, paths: Vec<String>) -> beta::UpdateListRequest {
    beta::UpdateListRequest {
        list: Some(list.into()),
        update_mask: Some(FieldMask { paths }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counter_sign_normalisation() {
        assert_eq!(increase_request("c", 5).count_diff, 5);
        assert_eq!(increase_request("c", -5).count_diff, 5);
        assert_eq!(decrease_request("c", 5).count_diff, -5);
        assert_eq!(decrease_request("c", -5).count_diff, -5);
        assert_eq!(decrease_request("c", i64::MIN).count_diff, -i64::MAX);
    }

    #[test]
    fn test_set_requests_use_replace_fields() {
        let request = set_count_request("sessions", 3);
        assert_eq!(request.count, Some(3));
        assert_eq!(request.capacity, None);
        assert_eq!(request.count_diff, 0);

        let request = set_capacity_request("sessions", 10);
        assert_eq!(request.capacity, Some(10));
        assert_eq!(request.count, None);
        assert_eq!(request.count_diff, 0);
    }

    #[test]
    fn test_update_list_request_carries_mask() {
        let list = ListSnapshot::new("party", 4, vec!["a".to_string()]);
        let request = update_list_request(list, vec!["capacity".to_string()]);
        assert_eq!(request.list.map(|l| l.capacity), Some(4));
        assert_eq!(
            request.update_mask.map(|m| m.paths),
            Some(vec!["capacity".to_string()])
        );
    }
}
