//! Error types for dnsbridge.

use thiserror::Error;

/// Result type alias using dnsbridge Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for provider and bridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The DNS provider rejected or failed the request.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The plugin subprocess could not be reached (disconnect, crash).
    #[error("Plugin unavailable: {0}")]
    Unavailable(String),

    /// A remote call did not complete before its deadline.
    #[error("Plugin call deadline exceeded")]
    DeadlineExceeded,

    /// Malformed plugin handshake line
    #[error("Handshake error: {0}")]
    Handshake(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure came from the process boundary rather than from
    /// the provider itself.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::DeadlineExceeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(Error::Unavailable("gone".into()).is_transport());
        assert!(Error::DeadlineExceeded.is_transport());
        assert!(!Error::Provider("rejected".into()).is_transport());
        assert!(!Error::Config("bad".into()).is_transport());
    }

    #[test]
    fn provider_message_is_kept() {
        let err = Error::Provider("zone not found".into());
        assert_eq!(err.to_string(), "Provider error: zone not found");
    }
}
