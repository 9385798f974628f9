//! dnsbridge Host Library
//!
//! The host half of the bridge:
//! - `BridgeClient`, a local [`dnsbridge_core::Provider`] backed by a plugin
//! - Plugin subprocess launch, handshake and shutdown
//! - Call scheduling honouring a provider's sequential requirement

pub mod client;
pub mod config;
pub mod launcher;
pub mod scheduler;

pub use client::BridgeClient;
pub use config::PluginConfig;
pub use launcher::{PluginError, PluginHandle};
pub use scheduler::{CallScheduler, SequentialGate};
