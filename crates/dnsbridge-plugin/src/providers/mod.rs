//! Built-in providers a plugin binary can serve.

pub mod exec;

use std::sync::Arc;

use dnsbridge_core::{Error, Provider, Result};

pub use exec::{ExecConfig, ExecProvider};

/// Names accepted by [`build_provider`].
pub const PROVIDER_NAMES: &[&str] = &["exec"];

/// Construct the named provider from the process environment.
///
/// Must run after the environment mapping has been applied, since providers
/// read their configuration from fixed variable names.
pub fn build_provider(name: &str) -> Result<Arc<dyn Provider>> {
    match name {
        "exec" => Ok(Arc::new(ExecProvider::new(ExecConfig::from_env()?))),
        other => Err(Error::Config(format!(
            "unknown provider '{other}' (available: {})",
            PROVIDER_NAMES.join(", ")
        ))),
    }
}
