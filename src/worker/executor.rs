use std::io::{self, Read};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

use crate::scheduler::{JobId, JobStatus};

/// Result of job execution
#[derive(Debug)]
pub struct ExecutionResult {
    pub job_id: JobId,
    /// `Done` or `Failed`.
    pub status: JobStatus,
    pub exit_code: Option<i32>,
    /// Standard output and standard error interleaved in the order the
    /// command wrote them, or the spawn error.
    pub output: String,
}

/// Runs job commands through a shell on the worker host.
#[derive(Debug, Clone)]
pub struct JobExecutor {
    shell: String,
}

impl Default for JobExecutor {
    fn default() -> Self {
        Self::new("/bin/sh")
    }
}

impl JobExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// Run `<shell> -c <command>` to completion.
    pub async fn execute(&self, job_id: JobId, command: &str) -> ExecutionResult {
        tracing::info!(job_id, command, "Executing job");

        let result = self.run(command).await;
        Self::process_output(job_id, result)
    }

    /// Both output streams share one pipe, so their writes stay in order.
    async fn run(&self, command: &str) -> io::Result<(ExitStatus, Vec<u8>)> {
        let (mut reader, writer) = io::pipe()?;

        // The command holds the parent's copies of the write end; dropping it
        // right after spawn lets the reader see EOF once the child exits.
        let mut child = {
            let mut cmd = Command::new(&self.shell);
            cmd.arg("-c")
                .arg(command)
                .stdin(Stdio::null())
                .stderr(writer.try_clone()?)
                .stdout(writer)
                .kill_on_drop(true);
            cmd.spawn()?
        };

        let collect = tokio::task::spawn_blocking(move || {
            let mut output = Vec::new();
            reader.read_to_end(&mut output).map(|_| output)
        });

        let status = child.wait().await?;
        let output = collect.await.map_err(io::Error::other)??;
        Ok((status, output))
    }

    fn process_output(
        job_id: JobId,
        result: io::Result<(ExitStatus, Vec<u8>)>,
    ) -> ExecutionResult {
        match result {
            Ok((exit_status, output)) => {
                let combined = String::from_utf8_lossy(&output).into_owned();
                let exit_code = exit_status.code();

                let status = if exit_status.success() {
                    JobStatus::Done
                } else {
                    JobStatus::Failed
                };

                tracing::info!(
                    job_id,
                    status = %status,
                    exit_code = ?exit_code,
                    "Job completed"
                );

                ExecutionResult {
                    job_id,
                    status,
                    exit_code,
                    output: combined,
                }
            }
            Err(e) => {
                tracing::error!(job_id, error = %e, "Job execution failed");
                ExecutionResult {
                    job_id,
                    status: JobStatus::Failed,
                    exit_code: None,
                    output: e.to_string(),
                }
            }
        }
    }
}
