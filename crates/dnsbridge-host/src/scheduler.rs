//! Call scheduling for providers with a sequential requirement.
//!
//! Providers without the requirement may be called concurrently across
//! domains. Sequential providers get a [`SequentialGate`]: one call at a
//! time, and successive call starts at least `interval` apart.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use dnsbridge_core::Provider;

/// Serializes calls and spaces their starts.
#[derive(Debug)]
pub struct SequentialGate {
    interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl SequentialGate {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: Mutex::const_new(None),
        }
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `call` once the previous call has finished and `interval` has
    /// passed since it started.
    #[allow(clippy::significant_drop_tightening)]
    pub async fn run<F, T>(&self, call: F) -> T
    where
        F: Future<Output = T>,
    {
        let mut last_start = self.last_start.lock().await;
        if let Some(prev) = *last_start {
            let ready_at = prev + self.interval;
            if Instant::now() < ready_at {
                debug!(wait = ?(ready_at - Instant::now()), "Waiting for sequential interval");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_start = Some(Instant::now());
        call.await
    }
}

/// How calls to one provider may be issued.
#[derive(Debug)]
pub enum CallScheduler {
    Concurrent,
    Sequential(SequentialGate),
}

impl CallScheduler {
    /// Choose a scheduler from the provider's sequential view.
    pub async fn for_provider(provider: &dyn Provider) -> Self {
        match provider.as_sequential() {
            Some(view) => Self::Sequential(SequentialGate::new(view.sequential().await)),
            None => Self::Concurrent,
        }
    }

    pub const fn is_sequential(&self) -> bool {
        matches!(self, Self::Sequential(_))
    }

    pub async fn run<F, T>(&self, call: F) -> T
    where
        F: Future<Output = T>,
    {
        match self {
            Self::Concurrent => call.await,
            Self::Sequential(gate) => gate.run(call).await,
        }
    }
}
