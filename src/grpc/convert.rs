use chrono::{DateTime, Utc};
use tonic::Status;

use crate::proto::{JobInfo, JobStatus as ProtoJobStatus};
use crate::scheduler::{Job, JobStatus};

impl From<JobStatus> for ProtoJobStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Waiting => ProtoJobStatus::Waiting,
            JobStatus::Running => ProtoJobStatus::Running,
            JobStatus::Done => ProtoJobStatus::Done,
            JobStatus::Failed => ProtoJobStatus::Failed,
        }
    }
}

/// Decode a wire status. `UNSPECIFIED` and unknown values yield `None`.
pub fn status_from_proto(value: i32) -> Option<JobStatus> {
    match ProtoJobStatus::try_from(value) {
        Ok(ProtoJobStatus::Waiting) => Some(JobStatus::Waiting),
        Ok(ProtoJobStatus::Running) => Some(JobStatus::Running),
        Ok(ProtoJobStatus::Done) => Some(JobStatus::Done),
        Ok(ProtoJobStatus::Failed) => Some(JobStatus::Failed),
        Ok(ProtoJobStatus::Unspecified) | Err(_) => None,
    }
}

impl From<&Job> for JobInfo {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            command: job.command.clone(),
            status: ProtoJobStatus::from(job.status) as i32,
            output: job.output.clone(),
            leased_by: job.leased_by.clone().unwrap_or_default(),
            created_at_ms: job.created_at.timestamp_millis(),
            finished_at_ms: job.finished_at.map(|t| t.timestamp_millis()),
        }
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

impl TryFrom<JobInfo> for Job {
    type Error = Status;

    fn try_from(info: JobInfo) -> Result<Self, Self::Error> {
        let status = status_from_proto(info.status)
            .ok_or_else(|| Status::internal(format!("Invalid status for job {}", info.id)))?;

        Ok(Job {
            id: info.id,
            command: info.command,
            status,
            output: info.output,
            leased_by: if info.leased_by.is_empty() {
                None
            } else {
                Some(info.leased_by)
            },
            created_at: from_millis(info.created_at_ms),
            finished_at: info.finished_at_ms.map(from_millis),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspecified_status_is_rejected() {
        assert_eq!(status_from_proto(ProtoJobStatus::Unspecified as i32), None);
        assert_eq!(status_from_proto(42), None);
        assert_eq!(
            status_from_proto(ProtoJobStatus::Done as i32),
            Some(JobStatus::Done)
        );
    }

    #[test]
    fn job_survives_the_wire() {
        let mut job = Job::new(3, "echo hi".to_string());
        job.status = JobStatus::Done;
        job.output = "hi\n".to_string();
        job.leased_by = Some("127.0.0.1:5555".to_string());
        job.finished_at = Some(Utc::now());

        let decoded = Job::try_from(JobInfo::from(&job)).unwrap();
        assert_eq!(decoded.id, 3);
        assert_eq!(decoded.status, JobStatus::Done);
        assert_eq!(decoded.output, "hi\n");
        assert_eq!(decoded.leased_by, job.leased_by);
        assert_eq!(
            decoded.created_at.timestamp_millis(),
            job.created_at.timestamp_millis()
        );
        assert!(decoded.finished_at.is_some());
    }

    #[test]
    fn waiting_job_has_no_leaser_on_the_wire() {
        let info = JobInfo::from(&Job::new(0, "true".to_string()));
        assert!(info.leased_by.is_empty());
        assert!(info.finished_at_ms.is_none());
        assert_eq!(info.status, ProtoJobStatus::Waiting as i32);
    }
}
