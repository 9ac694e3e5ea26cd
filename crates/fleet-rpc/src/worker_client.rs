use std::sync::atomic::{AtomicUsize, Ordering};

use backon::{ExponentialBuilder, Retryable};
use tonic::Status;
use tonic::transport::Channel;

use crate::proto::worker_service_client::WorkerServiceClient;
use crate::proto::{
    DecommissionServerRequest, Empty, ProvisionServerRequest, StopServerRequest, ValidateServerRequest,
};

/// Supplies a connected [`WorkerServiceClient`] on demand, reconnecting and
/// failing over across known endpoints as needed. Mirrors the teacher's
/// `ConnectionProvider` trait in its RPC client wrapper, simplified to drop
/// the TLS-certificate-staleness tracking this spec's worker transport
/// doesn't need.
#[async_trait::async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn provide_connection(&self) -> Result<WorkerServiceClient<Channel>, Status>;
}

/// Round-robins across a fixed list of worker endpoint URLs, advancing past
/// an endpoint once it fails to connect.
pub struct RoundRobinEndpoints {
    urls: Vec<String>,
    next_index: AtomicUsize,
}

impl RoundRobinEndpoints {
    pub fn new(urls: Vec<String>) -> Self {
        assert!(!urls.is_empty(), "RoundRobinEndpoints needs at least one url");
        Self {
            urls,
            next_index: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl ConnectionProvider for RoundRobinEndpoints {
    async fn provide_connection(&self) -> Result<WorkerServiceClient<Channel>, Status> {
        let start = self.next_index.load(Ordering::SeqCst);
        for offset in 0..self.urls.len() {
            let index = (start + offset) % self.urls.len();
            let url = &self.urls[index];
            match Channel::from_shared(url.clone())
                .map_err(|e| Status::internal(format!("invalid endpoint {url}: {e}")))?
                .connect()
                .await
            {
                Ok(channel) => {
                    self.next_index.store((index + 1) % self.urls.len(), Ordering::SeqCst);
                    return Ok(WorkerServiceClient::new(channel));
                }
                Err(e) => {
                    tracing::warn!(url, error = %e, "failed to connect to worker endpoint");
                }
            }
        }
        Err(Status::unavailable("no worker endpoint reachable"))
    }
}

/// Thin wrapper over [`WorkerServiceClient`] giving the coordinator's
/// fire-and-forget (`send`) calls retry-on-connect semantics, per §4.4's
/// "pushes a fire-and-forget RPC" transitions and §4.5's cooperative-stop
/// signal.
pub struct WorkerClient<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> WorkerClient<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    async fn with_retry<T, F, Fut>(&self, call: F) -> Result<T, Status>
    where
        F: Fn(WorkerServiceClient<Channel>) -> Fut,
        Fut: std::future::Future<Output = Result<T, Status>>,
    {
        let backoff = ExponentialBuilder::default().with_max_times(3);
        (|| async {
            let client = self.provider.provide_connection().await?;
            call(client).await
        })
        .retry(backoff)
        .when(|status: &Status| {
            matches!(
                status.code(),
                tonic::Code::Unavailable | tonic::Code::DeadlineExceeded
            )
        })
        .await
    }

    pub async fn send_validate_server(&self, req: ValidateServerRequest) -> Result<(), Status> {
        self.with_retry(move |mut client| {
            let req = req.clone();
            async move { client.send_validate_server(req).await.map(|r| r.into_inner()) }
        })
        .await
        .map(|_: Empty| ())
    }

    pub async fn send_provision_server(&self, req: ProvisionServerRequest) -> Result<(), Status> {
        self.with_retry(move |mut client| {
            let req = req.clone();
            async move { client.send_provision_server(req).await.map(|r| r.into_inner()) }
        })
        .await
        .map(|_: Empty| ())
    }

    pub async fn send_stop_server(&self, req: StopServerRequest) -> Result<(), Status> {
        self.with_retry(move |mut client| {
            let req = req.clone();
            async move { client.send_stop_server(req).await.map(|r| r.into_inner()) }
        })
        .await
        .map(|_: Empty| ())
    }

    pub async fn send_decommission_server(&self, req: DecommissionServerRequest) -> Result<(), Status> {
        self.with_retry(move |mut client| {
            let req = req.clone();
            async move { client.send_decommission_server(req).await.map(|r| r.into_inner()) }
        })
        .await
        .map(|_: Empty| ())
    }
}
