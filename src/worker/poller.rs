use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tonic::{Code, Status};

use crate::config::WorkerConfig;
use crate::scheduler::{JobId, JobStatus};
use crate::worker::executor::{ExecutionResult, JobExecutor};
use crate::worker::source::{JobSource, LeasedJob};

/// Reports are always retried at least once.
const MIN_REPORT_ATTEMPTS: u32 = 2;

/// One lease-execute-report loop.
pub struct Poller<S> {
    worker: usize,
    source: Arc<S>,
    executor: JobExecutor,
    poll_interval: Duration,
    report_attempts: u32,
    report_retry_delay: Duration,
}

impl<S: JobSource> Poller<S> {
    pub fn new(
        worker: usize,
        source: Arc<S>,
        executor: JobExecutor,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            worker,
            source,
            executor,
            poll_interval: config.poll_interval,
            report_attempts: config.report_attempts.max(MIN_REPORT_ATTEMPTS),
            report_retry_delay: config.report_retry_delay,
        }
    }

    /// Poll until `shutdown` is cancelled.
    ///
    /// An empty queue or a failed lease waits `poll_interval` before the next
    /// attempt. A job that is already executing is finished and reported
    /// before the loop notices cancellation.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(worker = self.worker, "Poller started");

        while !shutdown.is_cancelled() {
            match self.source.lease().await {
                Ok(Some(job)) => {
                    self.process(job).await;
                    continue;
                }
                Ok(None) => {}
                Err(status) => {
                    tracing::warn!(worker = self.worker, error = %status, "Failed to lease job");
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        tracing::info!(worker = self.worker, "Poller stopped");
    }

    /// Report `running`, execute, report the terminal status.
    pub async fn process(&self, job: LeasedJob) -> ExecutionResult {
        tracing::info!(worker = self.worker, job_id = job.id, command = %job.command, "Got job");

        if let Err(status) = self.report(job.id, JobStatus::Running, None).await {
            tracing::warn!(
                worker = self.worker,
                job_id = job.id,
                error = %status,
                "Could not report running status, executing anyway"
            );
        }

        let result = self.executor.execute(job.id, &job.command).await;
        tracing::info!(
            worker = self.worker,
            job_id = job.id,
            status = %result.status,
            output = %result.output,
            "Job finished"
        );

        if let Err(status) = self
            .report(job.id, result.status, Some(result.output.clone()))
            .await
        {
            tracing::error!(
                worker = self.worker,
                job_id = job.id,
                error = %status,
                "Giving up on status report"
            );
        }
        result
    }

    async fn report(
        &self,
        id: JobId,
        status: JobStatus,
        output: Option<String>,
    ) -> Result<(), Status> {
        let mut attempt = 1;
        loop {
            match self.source.report(id, status, output.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.report_attempts && is_retryable(&e) => {
                    tracing::warn!(
                        worker = self.worker,
                        job_id = id,
                        status = %status,
                        attempt,
                        error = %e,
                        "Status report failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.report_retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Transport failures are worth another attempt; a coordinator verdict on
/// the report itself is not.
fn is_retryable(status: &Status) -> bool {
    !matches!(
        status.code(),
        Code::InvalidArgument
            | Code::FailedPrecondition
            | Code::Unauthenticated
            | Code::PermissionDenied
    )
}
