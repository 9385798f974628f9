//! DNS-01 challenge record derivation (RFC 8555 §8.4).

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

const CHALLENGE_LABEL: &str = "_acme-challenge";

/// Name and value of the TXT record answering a DNS-01 challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeInfo {
    /// Fully qualified record name, with trailing dot.
    pub fqdn: String,
    /// Record value: unpadded base64url of SHA-256(key authorization).
    pub value: String,
}

impl ChallengeInfo {
    pub fn new(domain: &str, key_auth: &str) -> Self {
        let domain = domain.trim_end_matches('.');
        let digest = Sha256::digest(key_auth.as_bytes());
        Self {
            fqdn: format!("{CHALLENGE_LABEL}.{domain}."),
            value: URL_SAFE_NO_PAD.encode(digest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_record_name_and_value() {
        let info = ChallengeInfo::new("example.com", "token.thumbprint");
        assert_eq!(info.fqdn, "_acme-challenge.example.com.");
        assert_eq!(info.value, "61rBZ_4knHblO0MNoxFsXZ_eTFUHum0B6IVRbhvUn5I");
    }

    #[test]
    fn fqdn_input_is_not_doubled() {
        let info = ChallengeInfo::new("example.com.", "token.thumbprint");
        assert_eq!(info.fqdn, "_acme-challenge.example.com.");
    }

    #[test]
    fn value_has_no_padding() {
        let info = ChallengeInfo::new("example.com", "x");
        assert!(!info.value.contains('='));
        assert_eq!(info.value.len(), 43);
    }
}
