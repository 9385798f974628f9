//! dnsbridge Protocol Buffers
//!
//! Generated protobuf code for the plugin bridge gRPC API.
//!
//! This crate contains:
//! - `DnsProvider` service (server and client) for challenge forwarding
//! - Duration conversion helpers shared by both sides of the bridge

#![allow(clippy::derive_partial_eq_without_eq)]

pub mod duration;

/// dnsbridge v1 API definitions.
///
/// All generated types and services are included here.
pub mod v1 {
    tonic::include_proto!("dnsbridge.v1");
}

// Re-export v1 as the default API version for convenience
pub use v1::*;

pub use prost_types;

/// Metadata key set on a failure status raised by the provider itself.
pub const ERROR_KIND_KEY: &str = "x-dnsbridge-error";

/// [`ERROR_KIND_KEY`] value for provider failures.
pub const ERROR_KIND_PROVIDER: &str = "provider";
