//! dnsbridge plugin
//!
//! Launched by a host with the magic cookie set. Applies the host's
//! environment mapping, constructs the requested provider, then serves it
//! over gRPC on a loopback port announced through the handshake line.

use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use dnsbridge_core::handshake::{self, Handshake};
use dnsbridge_core::{EnvMapEntry, EnvMapping};
use dnsbridge_plugin::PluginServer;
use dnsbridge_plugin::providers::build_provider;

#[derive(Parser, Debug)]
#[command(name = "dnsbridge-plugin")]
#[command(version, about = "dnsbridge plugin - serves a DNS-01 challenge provider")]
struct Args {
    /// Provider to construct (e.g. "exec")
    #[arg(long, env = "DNSBRIDGE_PROVIDER")]
    provider: String,

    /// Copy variable SRC to DST before the provider is constructed. Repeatable.
    #[arg(long = "map-env", value_name = "SRC=DST")]
    map_env: Vec<EnvMapEntry>,

    /// Loopback address to listen on; port 0 picks a free port.
    #[arg(long, default_value = "127.0.0.1:0", env = "DNSBRIDGE_PLUGIN_ADDR")]
    addr: SocketAddr,

    /// Log level filter (e.g. "info", "debug", "warn").
    #[arg(long, default_value = "info", env = "DNSBRIDGE_LOG_LEVEL")]
    log_level: String,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "DNSBRIDGE_LOG_JSON")]
    log_json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dnsbridge_core::tracing_init::init_tracing(
        "dnsbridge-plugin",
        &args.log_level,
        args.log_json,
    )?;

    if !handshake::cookie_present() {
        error!("dnsbridge-plugin must be launched by a dnsbridge host");
        anyhow::bail!(
            "missing or invalid {}; this binary is not meant to be run directly",
            handshake::MAGIC_COOKIE_KEY
        );
    }

    // Still single-threaded here: the mapping has to land before the runtime
    // starts and before the provider reads its variables.
    let mapping: EnvMapping = args.map_env.iter().cloned().collect();
    info!(entries = mapping.len(), "Applying environment mapping");
    mapping.apply();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(&args))
}

async fn run(args: &Args) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        provider = %args.provider,
        "Starting dnsbridge-plugin"
    );

    let provider = build_provider(&args.provider)?;
    let server = PluginServer::new(provider);

    let listener = TcpListener::bind(args.addr).await?;
    let addr = listener.local_addr()?;
    dnsbridge_plugin::announce(&Handshake::new(addr))?;

    server.serve_with_shutdown(listener, shutdown_signal()).await?;

    info!("dnsbridge-plugin shut down");
    Ok(())
}

/// Resolves on Ctrl+C (SIGINT) or, on unix, SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    error!(error = %e, "Failed to install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C");
    }
}
