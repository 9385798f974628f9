//! dnsbridge Plugin Library
//!
//! The subprocess half of the bridge:
//! - gRPC server forwarding calls to one DNS-01 provider
//! - Built-in providers selectable by name
//! - Handshake announcement for the launching host

pub mod providers;
pub mod server;

use std::io::Write;

use dnsbridge_core::Handshake;

pub use server::{DnsProviderServiceImpl, PluginServer, ServerError};

/// Write the handshake line to stdout for the host to read.
#[allow(clippy::print_stdout)]
pub fn announce(handshake: &Handshake) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{handshake}")?;
    stdout.flush()
}
