//! End-to-end lifecycle and metadata calls against the mock sidecar.

use std::time::Duration;

use agonkit::prelude::*;
use agonkit::sink;
use agonkit_testing::{MockSidecar, RecordedCall, with_default_timeout};
use pretty_assertions::assert_eq;

fn connect(mock: &MockSidecar) -> Sidecar {
    SidecarBuilder::with_environment(SidecarEnv::empty())
        .with_target(mock.target())
        .build()
        .unwrap()
}

fn state(gs: &GameServer) -> &str {
    gs.status.as_ref().map_or("", |s| s.state.as_str())
}

// =============================================================================
// State transitions
// =============================================================================

#[tokio::test]
async fn test_ready_allocate_shutdown_in_order() {
    let mock = MockSidecar::start().await.unwrap();
    let sidecar = connect(&mock);

    sidecar.ready_future().await.unwrap();
    assert_eq!(state(&mock.state().game_server()), "Ready");

    sidecar.allocate_future().await.unwrap();
    assert_eq!(state(&mock.state().game_server()), "Allocated");

    sidecar.shutdown_future().await.unwrap();
    assert_eq!(state(&mock.state().game_server()), "Shutdown");

    assert_eq!(
        mock.state().calls(),
        vec![
            RecordedCall::Ready,
            RecordedCall::Allocate,
            RecordedCall::Shutdown
        ]
    );
    sidecar.close().await;
}

#[tokio::test]
async fn test_reserve_sends_whole_seconds() {
    let mock = MockSidecar::start().await.unwrap();
    let sidecar = connect(&mock);

    sidecar
        .reserve_future(Duration::from_millis(30_900))
        .await
        .unwrap();

    assert_eq!(
        mock.state().last_call(),
        Some(RecordedCall::Reserve { seconds: 30 })
    );
    assert_eq!(state(&mock.state().game_server()), "Reserved");
    sidecar.close().await;
}

#[tokio::test]
async fn test_fire_and_forget_reaches_sidecar() {
    let mock = MockSidecar::start().await.unwrap();
    let sidecar = connect(&mock);

    sidecar.ready();
    sidecar.set_label("mode", "ranked");
    mock.wait_for_calls("ready", 1).await;
    mock.wait_for_calls("set_label", 1).await;

    sidecar.close().await;
}

#[tokio::test]
async fn test_push_form_completes_sink() {
    let mock = MockSidecar::start().await.unwrap();
    let sidecar = connect(&mock);

    let (sink, mut events) = sink::channel::<()>();
    sidecar.allocate_with(sink);

    let first = with_default_timeout(events.recv()).await.unwrap();
    assert!(matches!(first, sink::SinkEvent::Next(())));
    let second = with_default_timeout(events.recv()).await.unwrap();
    assert!(matches!(second, sink::SinkEvent::Completed));
    sidecar.close().await;
}

// =============================================================================
// Metadata
// =============================================================================

#[tokio::test]
async fn test_labels_and_annotations_are_prefixed() {
    let mock = MockSidecar::start().await.unwrap();
    let sidecar = connect(&mock);

    sidecar.set_label_future("map", "harbor").await.unwrap();
    sidecar
        .set_annotation_future("build", "2024.3")
        .await
        .unwrap();

    let gs = sidecar.get_game_server_future().await.unwrap();
    let meta = gs.object_meta.unwrap();
    assert_eq!(
        meta.labels.get("agones.dev/sdk-map").map(String::as_str),
        Some("harbor")
    );
    assert_eq!(
        meta.annotations
            .get("agones.dev/sdk-build")
            .map(String::as_str),
        Some("2024.3")
    );
    sidecar.close().await;
}

#[tokio::test]
async fn test_get_game_server_returns_snapshot() {
    let mock = MockSidecar::start().await.unwrap();
    let sidecar = connect(&mock);

    let gs = sidecar.get_game_server_future().await.unwrap();
    assert_eq!(gs.object_meta.unwrap().name, "mock-gameserver");
    assert_eq!(gs.status.unwrap().address, "127.0.0.1");
    sidecar.close().await;
}
