//! Bridge client.
//!
//! Presents a plugin-hosted provider as a local [`Provider`]. Each method is
//! one remote call bounded by the client's call timeout. A timed-out call is
//! not cancelled on the plugin side: a record may still be created after the
//! host has given up on it.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Response, Status};
use tracing::{debug, info, warn};

use dnsbridge_core::{
    DEFAULT_POLLING_INTERVAL, DEFAULT_PROPAGATION_TIMEOUT, Error, Provider, ProviderTimeout,
    Result, SequentialProvider,
};
use dnsbridge_proto::{ERROR_KIND_KEY, ERROR_KIND_PROVIDER, duration};
use dnsbridge_proto::v1::dns_provider_client::DnsProviderClient;
use dnsbridge_proto::v1::{
    CleanUpRequest, IsSequentialRequest, PresentRequest, TimeoutRequest,
};

/// Classify a failed call.
///
/// Provider failures carry the [`ERROR_KIND_KEY`] marker and are returned
/// as-is, whatever their message says. Everything else means the plugin
/// could not be reached or did not answer in time. The substring checks
/// cover transport drops that surface with a generic code; their wording
/// belongs to hyper/h2 and may drift.
pub fn status_to_error(status: &Status) -> Error {
    if is_provider_failure(status) {
        return Error::Provider(status.message().to_string());
    }

    match status.code() {
        Code::DeadlineExceeded => return Error::DeadlineExceeded,
        Code::Unavailable | Code::Cancelled => {
            return Error::Unavailable(status.message().to_string());
        }
        _ => {}
    }

    let msg = status.message();
    if msg.contains("h2 protocol error")
        || msg.contains("broken pipe")
        || msg.contains("connection reset")
        || msg.contains("transport error")
    {
        return Error::Unavailable(msg.to_string());
    }

    match status.code() {
        Code::Unknown => Error::Provider(msg.to_string()),
        code => Error::Unavailable(format!("{code:?}: {msg}")),
    }
}

fn is_provider_failure(status: &Status) -> bool {
    status
        .metadata()
        .get(ERROR_KIND_KEY)
        .and_then(|v| v.to_str().ok())
        == Some(ERROR_KIND_PROVIDER)
}

/// Host-side handle on a plugin's `DnsProvider` service.
#[derive(Clone)]
pub struct BridgeClient {
    client: DnsProviderClient<Channel>,
    call_timeout: Duration,
    /// `IsSequential` answer captured at connect time.
    sequential: Option<Duration>,
}

impl BridgeClient {
    /// Connect to a plugin listening on `addr`.
    pub async fn connect(
        addr: SocketAddr,
        connect_timeout: Duration,
        call_timeout: Duration,
    ) -> Result<Self> {
        let endpoint = Endpoint::from_shared(format!("http://{addr}"))
            .map_err(|e| Error::Unavailable(format!("invalid plugin address {addr}: {e}")))?
            .connect_timeout(connect_timeout)
            .timeout(call_timeout)
            .http2_keep_alive_interval(Duration::from_secs(30))
            .keep_alive_timeout(Duration::from_secs(10));

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| Error::Unavailable(format!("connect to plugin at {addr}: {e}")))?;

        info!(%addr, "Connected to plugin");
        Self::from_channel(channel, call_timeout).await
    }

    /// Wrap an established channel and query the sequential requirement.
    pub async fn from_channel(channel: Channel, call_timeout: Duration) -> Result<Self> {
        let mut this = Self {
            client: DnsProviderClient::new(channel),
            call_timeout,
            sequential: None,
        };
        this.sequential = this.is_sequential().await?;
        debug!(sequential = ?this.sequential, "Queried plugin sequential requirement");
        Ok(this)
    }

    pub const fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Minimum spacing between calls, if the provider requires serialization.
    pub const fn sequential_interval(&self) -> Option<Duration> {
        self.sequential
    }

    /// Raw `Timeout` answer; `(0, 0)` means the provider has no override.
    pub async fn remote_timeout(&self) -> Result<(Duration, Duration)> {
        let mut client = self.client.clone();
        let resp = self
            .call("Timeout", client.timeout(self.request(TimeoutRequest {})))
            .await?;
        Ok((
            duration::from_proto(resp.timeout),
            duration::from_proto(resp.interval),
        ))
    }

    /// Raw `IsSequential` answer.
    pub async fn is_sequential(&self) -> Result<Option<Duration>> {
        let mut client = self.client.clone();
        let resp = self
            .call(
                "IsSequential",
                client.is_sequential(self.request(IsSequentialRequest {})),
            )
            .await?;
        Ok(resp.ok.then(|| duration::from_proto(resp.interval)))
    }

    fn request<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        request.set_timeout(self.call_timeout);
        request
    }

    async fn call<T, F>(&self, rpc: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<Response<T>, Status>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(resp)) => Ok(resp.into_inner()),
            Ok(Err(status)) => {
                let err = status_to_error(&status);
                debug!(rpc, code = ?status.code(), error = %err, "Plugin call failed");
                Err(err)
            }
            Err(_) => {
                warn!(rpc, timeout = ?self.call_timeout, "Plugin call deadline exceeded");
                Err(Error::DeadlineExceeded)
            }
        }
    }
}

#[async_trait]
impl Provider for BridgeClient {
    async fn present(&self, domain: &str, token: &str, key_auth: &str) -> Result<()> {
        let mut client = self.client.clone();
        let req = PresentRequest {
            domain: domain.to_string(),
            token: token.to_string(),
            key_auth: key_auth.to_string(),
        };
        self.call("Present", client.present(self.request(req)))
            .await
            .map(drop)
    }

    async fn clean_up(&self, domain: &str, token: &str, key_auth: &str) -> Result<()> {
        let mut client = self.client.clone();
        let req = CleanUpRequest {
            domain: domain.to_string(),
            token: token.to_string(),
            key_auth: key_auth.to_string(),
        };
        self.call("CleanUp", client.clean_up(self.request(req)))
            .await
            .map(drop)
    }

    fn as_timeout(&self) -> Option<&dyn ProviderTimeout> {
        Some(self)
    }

    fn as_sequential(&self) -> Option<&dyn SequentialProvider> {
        if self.sequential.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl ProviderTimeout for BridgeClient {
    /// Always asks the plugin; a `(0, 0)` answer or a failed query yields
    /// the host defaults.
    async fn timeout(&self) -> (Duration, Duration) {
        match self.remote_timeout().await {
            Ok((timeout, interval)) if timeout.is_zero() && interval.is_zero() => {
                (DEFAULT_PROPAGATION_TIMEOUT, DEFAULT_POLLING_INTERVAL)
            }
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Plugin timeout query failed, using defaults");
                (DEFAULT_PROPAGATION_TIMEOUT, DEFAULT_POLLING_INTERVAL)
            }
        }
    }
}

#[async_trait]
impl SequentialProvider for BridgeClient {
    async fn sequential(&self) -> Duration {
        self.sequential.unwrap_or_default()
    }
}
