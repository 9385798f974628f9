//! `exec` provider: delegates record changes to an external program.
//!
//! The program is invoked as
//!
//! ```text
//! <program> present <fqdn> <value>
//! <program> cleanup <fqdn> <value>
//! ```
//!
//! or, with `EXEC_MODE=RAW`, as `<program> present -- <domain> <token>
//! <keyAuth>`. Calls are serialized: the program is assumed to be unable to
//! cope with concurrent edits.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use dnsbridge_core::{
    ChallengeInfo, DEFAULT_POLLING_INTERVAL, DEFAULT_PROPAGATION_TIMEOUT, Error, Provider,
    ProviderTimeout, Result, SequentialProvider,
};

pub const ENV_PATH: &str = "EXEC_PATH";
pub const ENV_MODE: &str = "EXEC_MODE";
pub const ENV_PROPAGATION_TIMEOUT: &str = "EXEC_PROPAGATION_TIMEOUT";
pub const ENV_POLLING_INTERVAL: &str = "EXEC_POLLING_INTERVAL";
pub const ENV_SEQUENCE_INTERVAL: &str = "EXEC_SEQUENCE_INTERVAL";

/// Configuration for [`ExecProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    pub program: PathBuf,
    /// Pass domain, token and key authorization verbatim.
    pub raw: bool,
    pub propagation_timeout: Duration,
    pub polling_interval: Duration,
    pub sequence_interval: Duration,
}

impl ExecConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            raw: false,
            propagation_timeout: DEFAULT_PROPAGATION_TIMEOUT,
            polling_interval: DEFAULT_POLLING_INTERVAL,
            sequence_interval: DEFAULT_PROPAGATION_TIMEOUT,
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let program = lookup(ENV_PATH)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::Config(format!("exec: {ENV_PATH} is not set")))?;

        let mut config = Self::new(program);
        config.raw = lookup(ENV_MODE).is_some_and(|m| m == "RAW");
        if let Some(d) = seconds(&lookup, ENV_PROPAGATION_TIMEOUT)? {
            config.propagation_timeout = d;
        }
        if let Some(d) = seconds(&lookup, ENV_POLLING_INTERVAL)? {
            config.polling_interval = d;
        }
        if let Some(d) = seconds(&lookup, ENV_SEQUENCE_INTERVAL)? {
            config.sequence_interval = d;
        }
        Ok(config)
    }
}

fn seconds<F>(lookup: &F, name: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|s| Some(Duration::from_secs(s)))
            .map_err(|_| {
                Error::Config(format!(
                    "exec: {name}={raw:?} is not a whole number of seconds"
                ))
            }),
    }
}

/// Provider running an external program for each record change.
#[derive(Debug)]
pub struct ExecProvider {
    config: ExecConfig,
}

impl ExecProvider {
    pub const fn new(config: ExecConfig) -> Self {
        Self { config }
    }

    fn args(&self, action: &str, domain: &str, token: &str, key_auth: &str) -> Vec<String> {
        if self.config.raw {
            vec![
                action.to_string(),
                "--".to_string(),
                domain.to_string(),
                token.to_string(),
                key_auth.to_string(),
            ]
        } else {
            let info = ChallengeInfo::new(domain, key_auth);
            vec![action.to_string(), info.fqdn, info.value]
        }
    }

    async fn run(&self, args: Vec<String>) -> Result<()> {
        debug!(program = %self.config.program.display(), ?args, "Running exec provider program");
        let output = Command::new(&self.config.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                Error::Provider(format!(
                    "failed to run {}: {e}",
                    self.config.program.display()
                ))
            })?;

        if output.status.success() {
            return Ok(());
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(Error::Provider(format!(
            "{} {}: {}: {}",
            self.config.program.display(),
            args.first().map_or("", String::as_str),
            output.status,
            text.trim()
        )))
    }
}

#[async_trait]
impl Provider for ExecProvider {
    async fn present(&self, domain: &str, token: &str, key_auth: &str) -> Result<()> {
        self.run(self.args("present", domain, token, key_auth)).await
    }

    async fn clean_up(&self, domain: &str, token: &str, key_auth: &str) -> Result<()> {
        self.run(self.args("cleanup", domain, token, key_auth)).await
    }

    fn as_timeout(&self) -> Option<&dyn ProviderTimeout> {
        Some(self)
    }

    fn as_sequential(&self) -> Option<&dyn SequentialProvider> {
        Some(self)
    }
}

#[async_trait]
impl ProviderTimeout for ExecProvider {
    async fn timeout(&self) -> (Duration, Duration) {
        (self.config.propagation_timeout, self.config.polling_interval)
    }
}

#[async_trait]
impl SequentialProvider for ExecProvider {
    async fn sequential(&self) -> Duration {
        self.config.sequence_interval
    }
}
