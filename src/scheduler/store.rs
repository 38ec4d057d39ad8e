use tokio::sync::RwLock;

use crate::scheduler::job::{Job, JobId, JobStatus};
use crate::scheduler::queue::{JobQueue, QueueStats, ReportOutcome};

/// The coordinator's job state.
///
/// All mutations go through one lock, so `submit`, `lease` and `report` are
/// atomic with respect to each other and readers never see a job halfway
/// between the pending queue and the leased set.
#[derive(Debug, Default)]
pub struct JobStore {
    queue: RwLock<JobQueue>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submit(&self, command: String) -> Job {
        let job = self.queue.write().await.submit(command);
        tracing::info!(job_id = job.id, command = %job.command, "Job queued");
        job
    }

    /// Hand out the oldest pending job, or `None` when the queue is empty.
    pub async fn lease(&self, leased_by: Option<String>) -> Option<Job> {
        let job = self.queue.write().await.lease(leased_by)?;
        tracing::info!(
            job_id = job.id,
            leased_by = job.leased_by.as_deref().unwrap_or("-"),
            "Job leased"
        );
        Some(job)
    }

    pub async fn report(
        &self,
        id: JobId,
        status: JobStatus,
        output: Option<String>,
    ) -> ReportOutcome {
        let outcome = self.queue.write().await.report(id, status, output);
        match outcome {
            ReportOutcome::Applied => {
                tracing::info!(job_id = id, status = %status, "Job status updated")
            }
            ReportOutcome::Unchanged => {
                tracing::debug!(job_id = id, status = %status, "Repeated status report")
            }
            ReportOutcome::Unknown => {
                tracing::warn!(job_id = id, status = %status, "Status report for unknown job")
            }
            ReportOutcome::Rejected { current } => tracing::warn!(
                job_id = id,
                status = %status,
                current = %current,
                "Rejected status report"
            ),
        }
        outcome
    }

    /// Owned copy of every job in submission order.
    pub async fn snapshot(&self) -> Vec<Job> {
        self.queue
            .read()
            .await
            .all_jobs()
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: JobId) -> Option<Job> {
        self.queue.read().await.get(id).cloned()
    }

    pub async fn stats(&self) -> QueueStats {
        self.queue.read().await.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn concurrent_submits_get_distinct_ids() {
        let store = Arc::new(JobStore::new());

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.submit(format!("echo {}", i)).await.id })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }
        assert_eq!(ids, (0..64).collect::<HashSet<_>>());
    }

    #[tokio::test]
    async fn concurrent_leases_never_share_a_job() {
        let store = Arc::new(JobStore::new());
        for i in 0..32 {
            store.submit(format!("echo {}", i)).await;
        }

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.lease(None).await.map(|j| j.id) })
            })
            .collect();

        let mut leased = Vec::new();
        for handle in handles {
            if let Some(id) = handle.await.unwrap() {
                leased.push(id);
            }
        }

        let unique: HashSet<_> = leased.iter().copied().collect();
        assert_eq!(leased.len(), 32);
        assert_eq!(unique.len(), 32);
    }

    #[tokio::test]
    async fn snapshot_is_a_detached_copy() {
        let store = JobStore::new();
        store.submit("echo hi".to_string()).await;

        let before = store.snapshot().await;
        store.lease(None).await;

        assert_eq!(before[0].status, JobStatus::Waiting);
        assert_eq!(store.snapshot().await[0].status, JobStatus::Running);
    }

    #[tokio::test]
    async fn listing_contains_each_job_once_with_latest_status() {
        let store = JobStore::new();
        for cmd in ["a", "b", "c", "d"] {
            store.submit(cmd.to_string()).await;
        }
        store.lease(None).await;
        store.lease(None).await;
        store.report(0, JobStatus::Done, Some("ok".into())).await;
        store.report(1, JobStatus::Failed, None).await;

        let jobs = store.snapshot().await;
        let summary: Vec<(JobId, JobStatus)> = jobs.iter().map(|j| (j.id, j.status)).collect();
        assert_eq!(
            summary,
            vec![
                (0, JobStatus::Done),
                (1, JobStatus::Failed),
                (2, JobStatus::Waiting),
                (3, JobStatus::Waiting),
            ]
        );
    }

    #[tokio::test]
    async fn get_finds_pending_and_leased_jobs() {
        let store = JobStore::new();
        store.submit("a".into()).await;
        store.submit("b".into()).await;
        store.lease(None).await;

        assert_eq!(store.get(0).await.unwrap().status, JobStatus::Running);
        assert_eq!(store.get(1).await.unwrap().status, JobStatus::Waiting);
        assert!(store.get(2).await.is_none());
    }
}
