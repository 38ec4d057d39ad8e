use std::collections::{BTreeMap, VecDeque};

use chrono::Utc;

use crate::scheduler::job::{Job, JobId, JobStatus};

/// Result of applying a worker's status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The status moved forward.
    Applied,
    /// The job already had this status; nothing changed.
    Unchanged,
    /// No leased job has this id; nothing changed.
    Unknown,
    /// The transition would move the lifecycle backwards or out of a
    /// terminal state; nothing changed.
    Rejected { current: JobStatus },
}

/// Job counts per lifecycle stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub waiting: usize,
    pub running: usize,
    pub done: usize,
    pub failed: usize,
}

/// Pending FIFO plus the set of jobs already handed out.
///
/// Every submitted id lives in exactly one of the two collections. Ids come
/// from a counter that only grows, so pruning either collection can never
/// cause an id to be handed out twice.
#[derive(Debug, Default)]
pub struct JobQueue {
    pending: VecDeque<Job>,
    leased: BTreeMap<JobId, Job>,
    next_id: JobId,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new `waiting` job and return a copy of it.
    pub fn submit(&mut self, command: String) -> Job {
        let id = self.next_id;
        self.next_id += 1;

        let job = Job::new(id, command);
        self.pending.push_back(job.clone());
        job
    }

    /// Move the oldest pending job into the leased set, marking it `running`.
    pub fn lease(&mut self, leased_by: Option<String>) -> Option<Job> {
        let mut job = self.pending.pop_front()?;
        job.status = JobStatus::Running;
        job.leased_by = leased_by;

        self.leased.insert(job.id, job.clone());
        Some(job)
    }

    /// Apply a status report for a leased job.
    ///
    /// `output` is recorded only when the job enters a terminal status.
    pub fn report(&mut self, id: JobId, status: JobStatus, output: Option<String>) -> ReportOutcome {
        let Some(job) = self.leased.get_mut(&id) else {
            return ReportOutcome::Unknown;
        };

        if job.status == status {
            return ReportOutcome::Unchanged;
        }
        if !job.status.can_transition_to(status) {
            return ReportOutcome::Rejected {
                current: job.status,
            };
        }

        job.status = status;
        if status.is_terminal() {
            job.output = output.unwrap_or_default();
            job.finished_at = Some(Utc::now());
        }
        ReportOutcome::Applied
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.leased
            .get(&id)
            .or_else(|| self.pending.iter().find(|j| j.id == id))
    }

    /// Every job in submission order.
    ///
    /// Leasing is FIFO, so every leased id is smaller than every pending id
    /// and chaining the two collections yields ascending ids.
    pub fn all_jobs(&self) -> Vec<&Job> {
        self.leased.values().chain(self.pending.iter()).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn leased_len(&self) -> usize {
        self.leased.len()
    }

    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            waiting: self.pending.len(),
            ..QueueStats::default()
        };
        for job in self.leased.values() {
            match job.status {
                JobStatus::Waiting => stats.waiting += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Done => stats.done += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(queue: &JobQueue) -> Vec<JobId> {
        queue.all_jobs().iter().map(|j| j.id).collect()
    }

    #[test]
    fn ids_start_at_zero_and_increase() {
        let mut queue = JobQueue::new();
        assert_eq!(queue.submit("a".into()).id, 0);
        assert_eq!(queue.submit("b".into()).id, 1);
        queue.lease(None);
        assert_eq!(queue.submit("c".into()).id, 2);
    }

    #[test]
    fn lease_is_fifo() {
        let mut queue = JobQueue::new();
        for cmd in ["A", "B", "C"] {
            queue.submit(cmd.to_string());
        }

        let leased: Vec<String> = (0..3)
            .map(|_| queue.lease(None).unwrap().command)
            .collect();
        assert_eq!(leased, vec!["A", "B", "C"]);
        assert!(queue.lease(None).is_none());
    }

    #[test]
    fn lease_moves_job_between_collections() {
        let mut queue = JobQueue::new();
        queue.submit("echo hi".into());
        assert_eq!((queue.pending_len(), queue.leased_len()), (1, 0));

        let job = queue.lease(Some("10.0.0.2:4000".into())).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.leased_by.as_deref(), Some("10.0.0.2:4000"));
        assert_eq!((queue.pending_len(), queue.leased_len()), (0, 1));
    }

    #[test]
    fn lease_on_empty_queue_returns_none() {
        let mut queue = JobQueue::new();
        assert!(queue.lease(None).is_none());
        assert_eq!((queue.pending_len(), queue.leased_len()), (0, 0));
    }

    #[test]
    fn all_jobs_is_in_submission_order() {
        let mut queue = JobQueue::new();
        for i in 0..5 {
            queue.submit(format!("echo {}", i));
        }
        queue.lease(None);
        queue.lease(None);

        assert_eq!(ids(&queue), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn report_applies_forward_transition_and_records_output() {
        let mut queue = JobQueue::new();
        queue.submit("echo hi".into());
        queue.lease(None);

        assert_eq!(
            queue.report(0, JobStatus::Running, None),
            ReportOutcome::Unchanged
        );
        assert_eq!(
            queue.report(0, JobStatus::Done, Some("hi\n".into())),
            ReportOutcome::Applied
        );

        let job = queue.get(0).unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.output, "hi\n");
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn report_for_unknown_or_pending_id_is_ignored() {
        let mut queue = JobQueue::new();
        queue.submit("sleep 1".into());

        assert_eq!(
            queue.report(99, JobStatus::Done, None),
            ReportOutcome::Unknown
        );
        // Still pending, so not reportable.
        assert_eq!(
            queue.report(0, JobStatus::Running, None),
            ReportOutcome::Unknown
        );
        assert_eq!(queue.get(0).unwrap().status, JobStatus::Waiting);
    }

    #[test]
    fn terminal_status_cannot_be_overwritten() {
        let mut queue = JobQueue::new();
        queue.submit("false".into());
        queue.lease(None);
        queue.report(0, JobStatus::Failed, Some("boom".into()));

        assert_eq!(
            queue.report(0, JobStatus::Done, Some("late".into())),
            ReportOutcome::Rejected {
                current: JobStatus::Failed
            }
        );
        assert_eq!(
            queue.report(0, JobStatus::Running, None),
            ReportOutcome::Rejected {
                current: JobStatus::Failed
            }
        );

        let job = queue.get(0).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.output, "boom");
    }

    #[test]
    fn leased_job_cannot_return_to_waiting() {
        let mut queue = JobQueue::new();
        queue.submit("true".into());
        queue.lease(None);

        assert_eq!(
            queue.report(0, JobStatus::Waiting, None),
            ReportOutcome::Rejected {
                current: JobStatus::Running
            }
        );
        assert_eq!(queue.pending_len(), 0);
    }

    #[test]
    fn repeated_terminal_report_leaves_state_identical() {
        let mut queue = JobQueue::new();
        queue.submit("echo hi".into());
        queue.lease(None);
        queue.report(0, JobStatus::Done, Some("hi\n".into()));
        let once = queue.get(0).cloned().unwrap();

        assert_eq!(
            queue.report(0, JobStatus::Done, Some("hi\n".into())),
            ReportOutcome::Unchanged
        );
        assert_eq!(queue.get(0).cloned().unwrap(), once);
    }

    #[test]
    fn stats_count_each_stage() {
        let mut queue = JobQueue::new();
        for _ in 0..4 {
            queue.submit("true".into());
        }
        queue.lease(None);
        queue.lease(None);
        queue.lease(None);
        queue.report(0, JobStatus::Done, None);
        queue.report(1, JobStatus::Failed, None);

        assert_eq!(
            queue.stats(),
            QueueStats {
                waiting: 1,
                running: 1,
                done: 1,
                failed: 1,
            }
        );
    }
}
