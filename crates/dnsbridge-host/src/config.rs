//! Plugin launch configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use dnsbridge_core::EnvMapping;

const fn default_start_timeout_ms() -> u64 {
    10_000
}

const fn default_call_timeout_ms() -> u64 {
    30_000
}

const fn default_terminate_timeout_ms() -> u64 {
    5_000
}

/// Whole milliseconds in `d`, rounded up so a non-zero duration never
/// becomes a zero deadline.
fn ceil_millis(d: Duration) -> u64 {
    u64::try_from(d.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

/// How to start one provider plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Path to the plugin binary.
    pub program: PathBuf,
    /// Provider name passed to the plugin.
    pub provider: String,
    /// Extra variables set in the plugin's environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Variables the plugin copies to the names its provider reads.
    #[serde(default)]
    pub env_mapping: EnvMapping,
    /// Milliseconds to wait for the handshake line.
    #[serde(default = "default_start_timeout_ms")]
    pub start_timeout_ms: u64,
    /// Deadline for each remote call, in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Milliseconds to wait for graceful plugin exit before SIGKILL.
    #[serde(default = "default_terminate_timeout_ms")]
    pub terminate_timeout_ms: u64,
}

impl PluginConfig {
    pub fn new(program: impl Into<PathBuf>, provider: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            provider: provider.into(),
            env: BTreeMap::new(),
            env_mapping: EnvMapping::new(),
            start_timeout_ms: default_start_timeout_ms(),
            call_timeout_ms: default_call_timeout_ms(),
            terminate_timeout_ms: default_terminate_timeout_ms(),
        }
    }

    /// Set a variable in the plugin's environment.
    #[must_use]
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Have the plugin copy `source` to `dest` before building its provider.
    #[must_use]
    pub fn map_env(mut self, source: impl Into<String>, dest: impl Into<String>) -> Self {
        self.env_mapping.insert(source, dest);
        self
    }

    /// Set the per-call deadline.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = ceil_millis(timeout);
        self
    }

    /// Set the handshake wait.
    #[must_use]
    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout_ms = ceil_millis(timeout);
        self
    }

    pub const fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub const fn terminate_timeout(&self) -> Duration {
        Duration::from_millis(self.terminate_timeout_ms)
    }
}
