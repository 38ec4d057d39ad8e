use tonic::transport::Channel;
use tonic::Status;

use crate::config::WorkerConfig;
use crate::error::Result;
use crate::grpc::channel;
use crate::proto::worker_service_client::WorkerServiceClient;
use crate::proto::{JobStatus as ProtoJobStatus, LeaseJobRequest, ReportStatusRequest};
use crate::scheduler::{JobId, JobStatus};
use crate::tls::PeerTls;

/// A job handed to this worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeasedJob {
    pub id: JobId,
    pub command: String,
}

/// Where pollers lease jobs from and report outcomes to.
#[tonic::async_trait]
pub trait JobSource: Send + Sync + 'static {
    /// `Ok(None)` means the queue is empty.
    async fn lease(&self) -> std::result::Result<Option<LeasedJob>, Status>;

    async fn report(
        &self,
        id: JobId,
        status: JobStatus,
        output: Option<String>,
    ) -> std::result::Result<(), Status>;
}

/// [`JobSource`] backed by the coordinator's worker endpoint.
#[derive(Clone)]
pub struct GrpcJobSource {
    client: WorkerServiceClient<Channel>,
}

impl GrpcJobSource {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: WorkerServiceClient::new(channel),
        }
    }

    /// Load the worker's TLS material and open a lazy channel to the
    /// coordinator.
    pub async fn connect(config: &WorkerConfig) -> Result<Self> {
        let tls = PeerTls::load(&config.tls).await?;
        tracing::info!(
            coordinator = %config.coordinator_addr,
            client_certificate = tls.has_identity(),
            "Connecting to coordinator"
        );
        let channel = channel::connect_lazy(&config.coordinator_addr, &config.tls_domain, &tls)?;
        Ok(Self::new(channel))
    }
}

#[tonic::async_trait]
impl JobSource for GrpcJobSource {
    async fn lease(&self) -> std::result::Result<Option<LeasedJob>, Status> {
        let mut client = self.client.clone();
        let response = client.lease_job(LeaseJobRequest {}).await?.into_inner();

        Ok(response.job.map(|job| LeasedJob {
            id: job.id,
            command: job.command,
        }))
    }

    async fn report(
        &self,
        id: JobId,
        status: JobStatus,
        output: Option<String>,
    ) -> std::result::Result<(), Status> {
        let mut client = self.client.clone();
        client
            .report_status(ReportStatusRequest {
                id,
                status: ProtoJobStatus::from(status) as i32,
                output: output.unwrap_or_default(),
            })
            .await?;
        Ok(())
    }
}
