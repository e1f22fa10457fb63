//! Generated wire schema for the sidecar protocol.
//!
//! The three packages share one channel: [`sdk`] is the stable lifecycle
//! surface, [`alpha`] carries player tracking and [`beta`] carries counters
//! and lists. Each package defines a service named `SDK`, so each module
//! exposes `sdk_client::SdkClient` and `sdk_server::{Sdk, SdkServer}`.

/// Stable lifecycle surface (`agones.dev.sdk`).
#[allow(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
pub mod sdk {
    tonic::include_proto!("agones.dev.sdk");
}

/// Player tracking surface (`agones.dev.sdk.alpha`).
#[allow(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
pub mod alpha {
    tonic::include_proto!("agones.dev.sdk.alpha");
}

/// Counters and lists surface (`agones.dev.sdk.beta`).
#[allow(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
pub mod beta {
    tonic::include_proto!("agones.dev.sdk.beta");
}
