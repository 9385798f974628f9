//! The DNS-01 challenge provider contract.
//!
//! Every provider can present and clean up a challenge record. Two further
//! capabilities are optional and are reached through typed views on the
//! base trait: a provider opts in by returning `Some(self)` from
//! [`Provider::as_timeout`] or [`Provider::as_sequential`].

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Propagation timeout a host applies when the provider has no override.
pub const DEFAULT_PROPAGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Polling interval a host applies when the provider has no override.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(2);

/// A DNS-01 challenge provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Create the TXT record proving control of `domain`.
    async fn present(&self, domain: &str, token: &str, key_auth: &str) -> Result<()>;

    /// Remove the record created by [`Provider::present`].
    async fn clean_up(&self, domain: &str, token: &str, key_auth: &str) -> Result<()>;

    /// Timeout-override view, if the provider has one.
    fn as_timeout(&self) -> Option<&dyn ProviderTimeout> {
        None
    }

    /// Sequential-execution view, if calls to the provider must not overlap.
    fn as_sequential(&self) -> Option<&dyn SequentialProvider> {
        None
    }
}

/// Overrides the propagation timeout and polling interval used while
/// waiting for a presented record to become visible.
#[async_trait]
pub trait ProviderTimeout: Send + Sync {
    /// Returns `(timeout, interval)`.
    async fn timeout(&self) -> (Duration, Duration);
}

/// Marks a provider whose calls must be serialized.
///
/// Implementing the trait is the signal; the returned value is the minimum
/// spacing between successive calls.
#[async_trait]
pub trait SequentialProvider: Send + Sync {
    async fn sequential(&self) -> Duration;
}
