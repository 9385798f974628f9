//! Plugin handshake.
//!
//! The host starts the plugin with [`MAGIC_COOKIE_KEY`] set to
//! [`MAGIC_COOKIE_VALUE`]; a plugin started any other way refuses to run.
//! Once listening, the plugin writes a single line to stdout:
//!
//! ```text
//! 1|tcp|127.0.0.1:40123|grpc
//! ```
//!
//! carrying the protocol version, network, address and wire protocol.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::Error;

/// Environment variable holding the magic cookie.
pub const MAGIC_COOKIE_KEY: &str = "DNSBRIDGE_PLUGIN_MAGIC_COOKIE";

/// Expected cookie value.
pub const MAGIC_COOKIE_VALUE: &str = "5b1e0c3f6a9d4e27b8c1f0a2d3e4b5c6";

/// Bridge protocol version spoken by this build.
pub const PROTOCOL_VERSION: u32 = 1;

const NETWORK: &str = "tcp";
const WIRE_PROTOCOL: &str = "grpc";

/// Whether the current process was started by a dnsbridge host.
pub fn cookie_present() -> bool {
    std::env::var(MAGIC_COOKIE_KEY).is_ok_and(|v| v == MAGIC_COOKIE_VALUE)
}

/// Parsed handshake line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handshake {
    pub protocol_version: u32,
    pub addr: SocketAddr,
}

impl Handshake {
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            addr,
        }
    }
}

impl fmt::Display for Handshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{NETWORK}|{}|{WIRE_PROTOCOL}",
            self.protocol_version, self.addr
        )
    }
}

impl FromStr for Handshake {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.trim().split('|').collect();
        let [version, network, addr, protocol] = parts.as_slice() else {
            return Err(Error::Handshake(format!(
                "expected 4 fields, got {}: {line:?}",
                parts.len()
            )));
        };

        let protocol_version: u32 = version
            .parse()
            .map_err(|_| Error::Handshake(format!("invalid protocol version {version:?}")))?;
        if protocol_version != PROTOCOL_VERSION {
            return Err(Error::Handshake(format!(
                "unsupported protocol version {protocol_version}, expected {PROTOCOL_VERSION}"
            )));
        }
        if *network != NETWORK {
            return Err(Error::Handshake(format!("unsupported network {network:?}")));
        }
        if *protocol != WIRE_PROTOCOL {
            return Err(Error::Handshake(format!(
                "unsupported wire protocol {protocol:?}"
            )));
        }
        let addr = addr
            .parse()
            .map_err(|_| Error::Handshake(format!("invalid address {addr:?}")))?;

        Ok(Self {
            protocol_version,
            addr,
        })
    }
}
