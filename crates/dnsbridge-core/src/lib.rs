//! dnsbridge Core Library
//!
//! Shared functionality for both sides of the DNS-01 plugin bridge:
//! - The provider contract and its optional capability views
//! - Capability probing into a fixed record
//! - Environment variable remapping applied before provider construction
//! - The plugin handshake line and magic cookie
//! - DNS-01 challenge record derivation
//! - Common error types

pub mod capability;
pub mod challenge;
pub mod env;
pub mod error;
pub mod handshake;
pub mod provider;
pub mod tracing_init;

pub use capability::CapabilityRecord;
pub use challenge::ChallengeInfo;
pub use env::{EnvMapEntry, EnvMapping};
pub use error::{Error, Result};
pub use handshake::Handshake;
pub use provider::{
    DEFAULT_POLLING_INTERVAL, DEFAULT_PROPAGATION_TIMEOUT, Provider, ProviderTimeout,
    SequentialProvider,
};
