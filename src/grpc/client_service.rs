use std::sync::Arc;
use tonic::{Request, Response, Status};

use crate::grpc::list_jobs_response;
use crate::grpc::peer::PeerIdentity;
use crate::proto::client_service_server::ClientService;
use crate::proto::{
    JobInfo, ListJobsRequest, ListJobsResponse, SubmitJobRequest, SubmitJobResponse,
};
use crate::scheduler::JobStore;

/// gRPC service for submitting clients.
pub struct ClientServiceImpl {
    store: Arc<JobStore>,
}

impl ClientServiceImpl {
    pub fn new(store: Arc<JobStore>) -> Self {
        Self { store }
    }
}

#[tonic::async_trait]
impl ClientService for ClientServiceImpl {
    async fn submit_job(
        &self,
        request: Request<SubmitJobRequest>,
    ) -> Result<Response<SubmitJobResponse>, Status> {
        let peer = PeerIdentity::of(&request);
        if !peer.verified {
            tracing::warn!(peer = %peer.addr, "Rejected job submission from unverified peer");
            return Err(Status::unauthenticated("Mutual TLS required"));
        }

        let command = request.into_inner().command;
        if command.trim().is_empty() {
            return Err(Status::invalid_argument("Command must not be empty"));
        }

        let job = self.store.submit(command).await;
        tracing::info!(job_id = job.id, peer = %peer.addr, "Accepted job submission");

        Ok(Response::new(SubmitJobResponse {
            job: Some(JobInfo::from(&job)),
        }))
    }

    async fn list_jobs(
        &self,
        request: Request<ListJobsRequest>,
    ) -> Result<Response<ListJobsResponse>, Status> {
        let peer = PeerIdentity::of(&request);
        tracing::debug!(peer = %peer.addr, "Listing jobs");
        Ok(Response::new(list_jobs_response(&self.store).await))
    }
}
