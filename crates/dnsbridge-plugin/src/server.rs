//! Bridge server: exposes one provider over the `DnsProvider` gRPC service.
//!
//! Present and `CleanUp` are forwarded to the provider one-to-one, with no
//! retries. Timeout and `IsSequential` answer from a [`CapabilityRecord`]
//! probed on the first capability query and never recomputed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::OnceCell;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::metadata::MetadataValue;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{info, instrument, warn};

use dnsbridge_core::{CapabilityRecord, Provider};
use dnsbridge_proto::{ERROR_KIND_KEY, ERROR_KIND_PROVIDER, duration};
use dnsbridge_proto::v1::dns_provider_server::{DnsProvider, DnsProviderServer};
use dnsbridge_proto::v1::{
    CleanUpRequest, CleanUpResponse, IsSequentialRequest, IsSequentialResponse, PresentRequest,
    PresentResponse, TimeoutRequest, TimeoutResponse,
};

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// `DnsProvider` service implementation owning a single provider.
#[derive(Clone)]
pub struct DnsProviderServiceImpl {
    provider: Arc<dyn Provider>,
    capabilities: Arc<OnceCell<CapabilityRecord>>,
}

impl DnsProviderServiceImpl {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            capabilities: Arc::new(OnceCell::new()),
        }
    }

    /// The provider's capability record, probed on first use.
    pub async fn capabilities(&self) -> CapabilityRecord {
        *self
            .capabilities
            .get_or_init(|| CapabilityRecord::probe(self.provider.as_ref()))
            .await
    }
}

/// Provider failures travel as `Unknown` with the provider's message,
/// tagged so the host never mistakes them for a transport drop.
fn provider_error_to_status(err: &dnsbridge_core::Error) -> Status {
    let msg = match err {
        dnsbridge_core::Error::Provider(msg) => msg.clone(),
        other => other.to_string(),
    };
    let mut status = Status::unknown(msg);
    status.metadata_mut().insert(
        ERROR_KIND_KEY,
        MetadataValue::from_static(ERROR_KIND_PROVIDER),
    );
    status
}

#[tonic::async_trait]
impl DnsProvider for DnsProviderServiceImpl {
    #[instrument(skip(self, request), fields(rpc = "Present"))]
    async fn present(
        &self,
        request: Request<PresentRequest>,
    ) -> Result<Response<PresentResponse>, Status> {
        let req = request.into_inner();
        match self
            .provider
            .present(&req.domain, &req.token, &req.key_auth)
            .await
        {
            Ok(()) => {
                info!(domain = %req.domain, "Presented challenge record");
                Ok(Response::new(PresentResponse {}))
            }
            Err(e) => {
                warn!(domain = %req.domain, error = %e, "Provider failed to present record");
                Err(provider_error_to_status(&e))
            }
        }
    }

    #[instrument(skip(self, request), fields(rpc = "CleanUp"))]
    async fn clean_up(
        &self,
        request: Request<CleanUpRequest>,
    ) -> Result<Response<CleanUpResponse>, Status> {
        let req = request.into_inner();
        match self
            .provider
            .clean_up(&req.domain, &req.token, &req.key_auth)
            .await
        {
            Ok(()) => {
                info!(domain = %req.domain, "Cleaned up challenge record");
                Ok(Response::new(CleanUpResponse {}))
            }
            Err(e) => {
                warn!(domain = %req.domain, error = %e, "Provider failed to clean up record");
                Err(provider_error_to_status(&e))
            }
        }
    }

    #[instrument(skip(self, _request), fields(rpc = "Timeout"))]
    async fn timeout(
        &self,
        _request: Request<TimeoutRequest>,
    ) -> Result<Response<TimeoutResponse>, Status> {
        let caps = self.capabilities().await;
        // Zeros tell the caller to fall back to its own defaults.
        let (timeout, interval) = if caps.has_timeout {
            (caps.timeout, caps.interval)
        } else {
            (Duration::ZERO, Duration::ZERO)
        };
        Ok(Response::new(TimeoutResponse {
            timeout: Some(duration::to_proto(timeout)),
            interval: Some(duration::to_proto(interval)),
        }))
    }

    #[instrument(skip(self, _request), fields(rpc = "IsSequential"))]
    async fn is_sequential(
        &self,
        _request: Request<IsSequentialRequest>,
    ) -> Result<Response<IsSequentialResponse>, Status> {
        let caps = self.capabilities().await;
        let interval = if caps.is_sequential {
            caps.sequential_interval
        } else {
            Duration::ZERO
        };
        Ok(Response::new(IsSequentialResponse {
            ok: caps.is_sequential,
            interval: Some(duration::to_proto(interval)),
        }))
    }
}

/// gRPC server handle for the plugin process.
pub struct PluginServer {
    service: DnsProviderServiceImpl,
}

impl PluginServer {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            service: DnsProviderServiceImpl::new(provider),
        }
    }

    /// Get a clone of the service that shares the provider and its record.
    pub fn service_impl(&self) -> DnsProviderServiceImpl {
        self.service.clone()
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = listener.local_addr()?;
        info!(%addr, "Starting plugin gRPC server");

        Server::builder()
            .http2_keepalive_interval(Some(Duration::from_secs(30)))
            .http2_keepalive_timeout(Some(Duration::from_secs(10)))
            .add_service(DnsProviderServer::new(self.service))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
            .await?;

        info!(%addr, "Plugin gRPC server stopped");
        Ok(())
    }
}
