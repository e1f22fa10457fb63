//! Target resolution through the public builder.

use agonkit::prelude::*;
use agonkit::transport::ConnectionTarget;
use agonkit::transport::config::DEFAULT_PORT;
use pretty_assertions::assert_eq;

fn address(host: &str, port: u16) -> Option<ConnectionTarget> {
    Some(ConnectionTarget::Address {
        host: host.to_string(),
        port,
    })
}

#[test]
fn test_defaults_without_environment() {
    let builder = SidecarBuilder::with_environment(SidecarEnv::empty());
    assert_eq!(builder.target().unwrap(), address("localhost", DEFAULT_PORT));
}

#[test]
fn test_environment_host_and_port() {
    let env = SidecarEnv::empty().with_host("sidecar").with_port("7000");
    let builder = SidecarBuilder::with_environment(env);
    assert_eq!(builder.target().unwrap(), address("sidecar", 7000));

    assert_eq!(
        builder.with_port(7100).target().unwrap(),
        address("sidecar", 7100)
    );
    assert_eq!(
        builder.with_host("other").target().unwrap(),
        address("other", 7000)
    );
}

#[test]
fn test_address_variable_wins_over_host_and_port() {
    let env = SidecarEnv::empty()
        .with_host("sidecar")
        .with_port("7000")
        .with_address("dns:///sidecar.local:9357");
    let builder = SidecarBuilder::with_environment(env);
    assert_eq!(
        builder.target().unwrap(),
        Some(ConnectionTarget::Target("dns:///sidecar.local:9357".to_string()))
    );
}

#[test]
fn test_unparsable_port_falls_back_to_default() {
    let env = SidecarEnv::empty().with_port("not-a-port");
    let builder = SidecarBuilder::with_environment(env);
    assert_eq!(builder.target().unwrap(), address("localhost", DEFAULT_PORT));
}

#[test]
fn test_target_string_beats_host_and_port() {
    let builder = SidecarBuilder::with_environment(SidecarEnv::empty())
        .with_target("10.0.0.5:9000")
        .with_address("10.0.0.6", 9001);
    assert_eq!(
        builder.target().unwrap(),
        Some(ConnectionTarget::Target("10.0.0.5:9000".to_string()))
    );

    let reset = builder.with_default_target();
    assert_eq!(reset.target().unwrap(), address("localhost", DEFAULT_PORT));
}

#[test]
fn test_host_and_port_setters_combine() {
    let builder = SidecarBuilder::with_environment(SidecarEnv::empty())
        .with_port(7001)
        .with_host("gs-7");
    assert_eq!(builder.target().unwrap(), address("gs-7", 7001));
}

#[test]
fn test_target_from_env_requires_variable() {
    let builder = SidecarBuilder::with_environment(SidecarEnv::empty()).with_target_from_env();
    let err = builder.target().unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
}

#[test]
fn test_build_outside_runtime_fails() {
    let err = SidecarBuilder::with_environment(SidecarEnv::empty())
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
}

#[tokio::test]
async fn test_build_does_not_connect() {
    // Nothing listens on port 1, but building is lazy.
    let sidecar = SidecarBuilder::with_environment(SidecarEnv::empty())
        .with_address("127.0.0.1", 1)
        .build()
        .unwrap();
    assert_eq!(
        sidecar.transport().target(),
        address("127.0.0.1", 1).as_ref()
    );
    sidecar.close().await;
}
