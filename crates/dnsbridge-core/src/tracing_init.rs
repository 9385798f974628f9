//! Logging setup for dnsbridge binaries.
//!
//! Logs always go to stderr: a plugin's stdout carries the handshake line
//! and must stay clean. `RUST_LOG` overrides the filter built from the
//! component name and level.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter enabling `level` for `component` and the shared core crate.
pub fn log_filter(component: &str, level: &str) -> String {
    let component = component.replace('-', "_");
    format!("{component}={level},dnsbridge_core={level},dnsbridge_proto={level}")
}

/// Install the global subscriber for `component` (e.g. `"dnsbridge-plugin"`).
///
/// Fails if a subscriber is already installed.
pub fn init_tracing(component: &str, level: &str, log_json: bool) -> Result<(), TryInitError> {
    let filter = std::env::var("RUST_LOG")
        .map_or_else(|_| EnvFilter::new(log_filter(component, level)), EnvFilter::new);
    let registry = tracing_subscriber::registry().with(filter);
    if log_json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_ansi(false).with_writer(std::io::stderr))
            .try_init()
    }
}
