//! Capability probing.
//!
//! A provider is reduced once to a [`CapabilityRecord`]; code downstream of
//! the probe reads the record and never asks the provider again.

use std::time::Duration;

use crate::provider::Provider;

/// Optional capabilities of one provider instance.
///
/// Absent capabilities carry zero durations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilityRecord {
    pub has_timeout: bool,
    pub timeout: Duration,
    pub interval: Duration,
    pub is_sequential: bool,
    pub sequential_interval: Duration,
}

impl CapabilityRecord {
    /// Probe both optional views of `provider`.
    ///
    /// The two probes are independent and absence is not an error.
    pub async fn probe(provider: &dyn Provider) -> Self {
        let mut record = Self::default();

        if let Some(view) = provider.as_timeout() {
            let (timeout, interval) = view.timeout().await;
            record.has_timeout = true;
            record.timeout = timeout;
            record.interval = interval;
        }

        if let Some(view) = provider.as_sequential() {
            record.is_sequential = true;
            record.sequential_interval = view.sequential().await;
        }

        tracing::debug!(
            has_timeout = record.has_timeout,
            timeout = ?record.timeout,
            interval = ?record.interval,
            is_sequential = record.is_sequential,
            sequential_interval = ?record.sequential_interval,
            "Probed provider capabilities"
        );

        record
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::provider::{ProviderTimeout, SequentialProvider};
    use async_trait::async_trait;

    struct Bare;

    #[async_trait]
    impl Provider for Bare {
        async fn present(&self, _: &str, _: &str, _: &str) -> Result<()> {
            Ok(())
        }
        async fn clean_up(&self, _: &str, _: &str, _: &str) -> Result<()> {
            Ok(())
        }
    }

    struct Full {
        timeout: Duration,
        interval: Duration,
        spacing: Duration,
    }

    #[async_trait]
    impl Provider for Full {
        async fn present(&self, _: &str, _: &str, _: &str) -> Result<()> {
            Ok(())
        }
        async fn clean_up(&self, _: &str, _: &str, _: &str) -> Result<()> {
            Ok(())
        }
        fn as_timeout(&self) -> Option<&dyn ProviderTimeout> {
            Some(self)
        }
        fn as_sequential(&self) -> Option<&dyn SequentialProvider> {
            Some(self)
        }
    }

    #[async_trait]
    impl ProviderTimeout for Full {
        async fn timeout(&self) -> (Duration, Duration) {
            (self.timeout, self.interval)
        }
    }

    #[async_trait]
    impl SequentialProvider for Full {
        async fn sequential(&self) -> Duration {
            self.spacing
        }
    }

    struct SequentialOnly;

    #[async_trait]
    impl Provider for SequentialOnly {
        async fn present(&self, _: &str, _: &str, _: &str) -> Result<()> {
            Ok(())
        }
        async fn clean_up(&self, _: &str, _: &str, _: &str) -> Result<()> {
            Ok(())
        }
        fn as_sequential(&self) -> Option<&dyn SequentialProvider> {
            Some(self)
        }
    }

    #[async_trait]
    impl SequentialProvider for SequentialOnly {
        async fn sequential(&self) -> Duration {
            Duration::from_secs(30)
        }
    }

    #[tokio::test]
    async fn bare_provider_has_no_capabilities() {
        let record = CapabilityRecord::probe(&Bare).await;
        assert_eq!(record, CapabilityRecord::default());
    }

    #[tokio::test]
    async fn full_provider_reports_both() {
        let provider = Full {
            timeout: Duration::from_secs(120),
            interval: Duration::from_secs(4),
            spacing: Duration::from_secs(60),
        };
        let record = CapabilityRecord::probe(&provider).await;
        assert!(record.has_timeout);
        assert_eq!(record.timeout, Duration::from_secs(120));
        assert_eq!(record.interval, Duration::from_secs(4));
        assert!(record.is_sequential);
        assert_eq!(record.sequential_interval, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn probes_are_independent() {
        let record = CapabilityRecord::probe(&SequentialOnly).await;
        assert!(!record.has_timeout);
        assert_eq!(record.timeout, Duration::ZERO);
        assert_eq!(record.interval, Duration::ZERO);
        assert!(record.is_sequential);
        assert_eq!(record.sequential_interval, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn zero_override_still_counts_as_present() {
        let provider = Full {
            timeout: Duration::ZERO,
            interval: Duration::ZERO,
            spacing: Duration::ZERO,
        };
        let record = CapabilityRecord::probe(&provider).await;
        assert!(record.has_timeout);
        assert!(record.is_sequential);
        assert_eq!(record.sequential_interval, Duration::ZERO);
    }
}
