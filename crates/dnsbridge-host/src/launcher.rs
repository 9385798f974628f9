//! Plugin subprocess lifecycle.
//!
//! Spawns the plugin binary, waits for its handshake line, connects a
//! [`BridgeClient`], and terminates the process on shutdown.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use dnsbridge_core::Handshake;
use dnsbridge_core::handshake::{MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE};

use crate::client::BridgeClient;
use crate::config::PluginConfig;

/// Errors from plugin launch and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Failed to spawn plugin: {reason}")]
    SpawnFailed { reason: String },

    #[error("Plugin did not complete its handshake within {timeout:?}")]
    StartTimeout { timeout: Duration },

    #[error("Plugin exited before its handshake ({status})")]
    ExitedEarly { status: String },

    #[error("Invalid plugin handshake: {0}")]
    Handshake(#[source] dnsbridge_core::Error),

    #[error("Failed to connect to plugin: {0}")]
    Connect(#[source] dnsbridge_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A running plugin and the client bound to it.
///
/// Dropping the handle kills the process; [`PluginHandle::shutdown`] stops
/// it gracefully.
pub struct PluginHandle {
    provider: String,
    child: Child,
    handshake: Handshake,
    client: Arc<BridgeClient>,
    terminate_timeout: Duration,
}

impl PluginHandle {
    /// Start the plugin described by `config` and connect to it.
    pub async fn launch(config: &PluginConfig) -> Result<Self, PluginError> {
        let mut cmd = Command::new(&config.program);
        cmd.arg("--provider").arg(&config.provider);
        for entry in config.env_mapping.iter() {
            cmd.arg("--map-env").arg(entry.to_string());
        }
        cmd.envs(&config.env)
            .env(MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(
            program = %config.program.display(),
            provider = %config.provider,
            mapped_vars = config.env_mapping.len(),
            "Spawning plugin subprocess"
        );
        let mut child = cmd.spawn().map_err(|e| PluginError::SpawnFailed {
            reason: e.to_string(),
        })?;

        // Plugin logs arrive on stderr; fold them into ours.
        if let Some(stderr) = child.stderr.take() {
            let name = config.provider.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(plugin = %name, "{line}");
                }
                debug!(plugin = %name, "plugin stderr closed");
            });
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PluginError::SpawnFailed {
                reason: "Failed to capture stdout".to_string(),
            })?;
        let mut lines = BufReader::new(stdout).lines();

        let line = match tokio::time::timeout(config.start_timeout(), lines.next_line()).await {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => {
                let status = match child.wait().await {
                    Ok(status) => status.to_string(),
                    Err(e) => e.to_string(),
                };
                return Err(PluginError::ExitedEarly { status });
            }
            Ok(Err(e)) => return Err(PluginError::Io(e)),
            Err(_) => {
                return Err(PluginError::StartTimeout {
                    timeout: config.start_timeout(),
                });
            }
        };

        let handshake: Handshake = line.parse().map_err(PluginError::Handshake)?;
        debug!(addr = %handshake.addr, "Plugin handshake received");

        // Keep draining stdout so a chatty plugin never blocks on a full pipe.
        let name = config.provider.clone();
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(plugin = %name, "stdout: {line}");
            }
        });

        let client =
            BridgeClient::connect(handshake.addr, config.start_timeout(), config.call_timeout())
                .await
                .map_err(PluginError::Connect)?;

        info!(
            provider = %config.provider,
            addr = %handshake.addr,
            sequential = ?client.sequential_interval(),
            "Plugin ready"
        );

        Ok(Self {
            provider: config.provider.clone(),
            child,
            handshake,
            client: Arc::new(client),
            terminate_timeout: config.terminate_timeout(),
        })
    }

    /// Client bound to this plugin.
    pub fn client(&self) -> Arc<BridgeClient> {
        Arc::clone(&self.client)
    }

    pub const fn handshake(&self) -> Handshake {
        self.handshake
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Ask the plugin to exit, killing it after the terminate timeout.
    pub async fn shutdown(mut self) -> Result<(), PluginError> {
        debug!(provider = %self.provider, "Terminating plugin");

        #[cfg(unix)]
        {
            if let Some(pid) = self.child.id() {
                // SAFETY: pid is a valid process ID obtained from our own Child handle.
                // kill(2) with SIGINT is safe to call on any owned subprocess.
                #[allow(unsafe_code)]
                #[allow(clippy::cast_possible_wrap)]
                let ret = unsafe { libc::kill(pid as i32, libc::SIGINT) };
                if ret != 0 {
                    let err = std::io::Error::last_os_error();
                    warn!(provider = %self.provider, pid, error = %err, "Failed to send SIGINT");
                }
            }
        }

        match tokio::time::timeout(self.terminate_timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!(provider = %self.provider, ?status, "Plugin exited gracefully");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(provider = %self.provider, error = %e, "Error waiting for plugin");
                self.child.kill().await.ok();
                Ok(())
            }
            Err(_) => {
                warn!(provider = %self.provider, "Timeout waiting for graceful shutdown, killing");
                self.child.kill().await.ok();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let config = PluginConfig::new("/nonexistent/dnsbridge-plugin", "exec");
        let Err(err) = PluginHandle::launch(&config).await else {
            panic!("launch should fail");
        };
        assert!(matches!(err, PluginError::SpawnFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_exit_is_reported() {
        let config = PluginConfig::new("true", "exec");
        let Err(err) = PluginHandle::launch(&config).await else {
            panic!("launch should fail");
        };
        assert!(matches!(err, PluginError::ExitedEarly { .. }), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn garbage_handshake_is_rejected() {
        // `echo` prints its arguments, which is not a handshake line.
        let config = PluginConfig::new("echo", "exec");
        let Err(err) = PluginHandle::launch(&config).await else {
            panic!("launch should fail");
        };
        assert!(matches!(err, PluginError::Handshake(_)), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_plugin_times_out() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("hang.sh");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        let config =
            PluginConfig::new(&script, "exec").with_start_timeout(Duration::from_secs(1));
        let Err(err) = PluginHandle::launch(&config).await else {
            panic!("launch should fail");
        };
        assert!(matches!(err, PluginError::StartTimeout { .. }), "{err}");
    }
}
