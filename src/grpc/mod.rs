//! Coordinator protocol over gRPC.
//!
//! Two services share one [`JobStore`](crate::scheduler::JobStore):
//! - [`ClientServiceImpl`]: submission (verified client certificate required)
//!   and listing
//! - [`WorkerServiceImpl`]: leasing, status reports and listing
//!
//! [`CoordinatorServer`] serves each on its own TLS listener.

pub mod channel;
pub mod client_service;
pub mod convert;
pub mod peer;
pub mod server;
pub mod worker_service;

pub use client_service::ClientServiceImpl;
pub use peer::{identify_peer, PeerIdentity};
pub use server::CoordinatorServer;
pub use worker_service::WorkerServiceImpl;

use crate::proto::{JobInfo, ListJobsResponse};
use crate::scheduler::JobStore;

pub(crate) async fn list_jobs_response(store: &JobStore) -> ListJobsResponse {
    let jobs = store.snapshot().await;
    ListJobsResponse {
        jobs: jobs.iter().map(JobInfo::from).collect(),
    }
}
