use std::sync::Arc;
use tonic::{Request, Response, Status};

use crate::grpc::convert::status_from_proto;
use crate::grpc::list_jobs_response;
use crate::grpc::peer::PeerIdentity;
use crate::proto::worker_service_server::WorkerService;
use crate::proto::{
    JobInfo, LeaseJobRequest, LeaseJobResponse, ListJobsRequest, ListJobsResponse,
    ReportStatusRequest, ReportStatusResponse,
};
use crate::scheduler::{JobStore, ReportOutcome};

/// gRPC service for polling workers.
pub struct WorkerServiceImpl {
    store: Arc<JobStore>,
}

impl WorkerServiceImpl {
    pub fn new(store: Arc<JobStore>) -> Self {
        Self { store }
    }
}

#[tonic::async_trait]
impl WorkerService for WorkerServiceImpl {
    async fn lease_job(
        &self,
        request: Request<LeaseJobRequest>,
    ) -> Result<Response<LeaseJobResponse>, Status> {
        let peer = PeerIdentity::of(&request);
        let job = self.store.lease(Some(peer.addr)).await;

        Ok(Response::new(LeaseJobResponse {
            job: job.as_ref().map(JobInfo::from),
        }))
    }

    async fn report_status(
        &self,
        request: Request<ReportStatusRequest>,
    ) -> Result<Response<ReportStatusResponse>, Status> {
        let req = request.into_inner();
        let status = status_from_proto(req.status)
            .ok_or_else(|| Status::invalid_argument("Invalid job status"))?;
        let output = if req.output.is_empty() {
            None
        } else {
            Some(req.output)
        };

        match self.store.report(req.id, status, output).await {
            ReportOutcome::Applied => Ok(Response::new(ReportStatusResponse { applied: true })),
            // Unknown ids are acknowledged so that late or duplicated reports
            // can be retried freely.
            ReportOutcome::Unchanged | ReportOutcome::Unknown => {
                Ok(Response::new(ReportStatusResponse { applied: false }))
            }
            ReportOutcome::Rejected { current } => Err(Status::failed_precondition(format!(
                "Job {} is {}, cannot become {}",
                req.id, current, status
            ))),
        }
    }

    async fn list_jobs(
        &self,
        _request: Request<ListJobsRequest>,
    ) -> Result<Response<ListJobsResponse>, Status> {
        Ok(Response::new(list_jobs_response(&self.store).await))
    }
}
