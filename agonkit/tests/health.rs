//! Heartbeat scheduling against the mock sidecar.

use std::time::Duration;

use agonkit::prelude::*;
use agonkit::sink;
use agonkit_testing::{MockSidecar, with_default_timeout};
use pretty_assertions::assert_eq;

const DELAY: Duration = Duration::from_millis(10);
const PERIOD: Duration = Duration::from_millis(20);

fn connect(mock: &MockSidecar) -> Sidecar {
    SidecarBuilder::with_environment(SidecarEnv::empty())
        .with_target(mock.target())
        .with_health_check(DELAY, PERIOD)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_heartbeats_reach_sidecar() {
    let mock = MockSidecar::start().await.unwrap();
    let sidecar = connect(&mock);

    assert!(sidecar.can_health_check());
    assert!(!sidecar.is_health_checking());

    sidecar.start_health_checking().unwrap();
    assert!(sidecar.is_health_checking());
    mock.wait_for_heartbeats(3).await;

    sidecar.close().await;
}

#[tokio::test]
async fn test_stop_halts_heartbeats() {
    let mock = MockSidecar::start().await.unwrap();
    let sidecar = connect(&mock);

    sidecar.start_health_checking().unwrap();
    mock.wait_for_heartbeats(2).await;
    sidecar.stop_health_checking();
    assert!(!sidecar.is_health_checking());

    // Let a beat that was already queued land before sampling.
    tokio::time::sleep(PERIOD * 2).await;
    let settled = mock.state().heartbeats();
    tokio::time::sleep(PERIOD * 5).await;
    assert_eq!(mock.state().heartbeats(), settled);

    sidecar.close().await;
}

#[tokio::test]
async fn test_restart_resumes_heartbeats() {
    let mock = MockSidecar::start().await.unwrap();
    let sidecar = connect(&mock);

    sidecar.start_health_checking().unwrap();
    mock.wait_for_heartbeats(1).await;
    sidecar.stop_health_checking();

    sidecar.start_health_checking().unwrap();
    sidecar.start_health_checking().unwrap();
    let before = mock.state().heartbeats();
    mock.wait_for_heartbeats(before + 3).await;
    assert!(sidecar.is_health_checking());

    sidecar.close().await;
}

#[tokio::test]
async fn test_start_without_schedule_fails() {
    let mock = MockSidecar::start().await.unwrap();
    let sidecar = SidecarBuilder::with_environment(SidecarEnv::empty())
        .with_target(mock.target())
        .build()
        .unwrap();

    assert!(!sidecar.can_health_check());
    let err = sidecar.start_health_checking().unwrap_err();
    assert!(matches!(
        err,
        Error::Precondition {
            feature: Feature::HealthCheck,
            ..
        }
    ));
    sidecar.close().await;
}

#[tokio::test]
async fn test_raw_health_stream() {
    let mock = MockSidecar::start().await.unwrap();
    let sidecar = connect(&mock);

    let (done, reply) = sink::pending::<()>();
    let beats = sidecar.health_check_stream(done);
    for _ in 0..2 {
        beats.send(agonkit::proto::sdk::Empty {}).await.unwrap();
    }
    drop(beats);

    with_default_timeout(reply).await.unwrap();
    assert_eq!(mock.state().heartbeats(), 2);
    sidecar.close().await;
}
