//! Worker side: lease jobs, run them, report the outcome.
//!
//! # Components
//!
//! - [`JobSource`]: lease/report seam, implemented over gRPC by
//!   [`GrpcJobSource`]
//! - [`JobExecutor`]: runs `sh -c <command>` and captures its output
//! - [`Poller`]: one lease-execute-report loop
//! - [`WorkerPool`]: a fixed number of pollers
//!
//! # Execution Flow
//!
//! 1. A poller leases a job; an empty queue waits `poll_interval`
//! 2. It reports `running`, then [`JobExecutor::execute`] runs the command
//! 3. It reports `done` or `failed` with the combined output
//! 4. Reports are retried on transport failure; exhausted retries are
//!    logged and the poller moves on
//!
//! Commands run directly on the worker host without sandboxing.

pub mod executor;
pub mod poller;
pub mod pool;
pub mod source;

pub use executor::{ExecutionResult, JobExecutor};
pub use poller::Poller;
pub use pool::WorkerPool;
pub use source::{GrpcJobSource, JobSource, LeasedJob};

use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::error::Result;

/// Connect to the coordinator and run the configured pool until shutdown.
pub async fn run_worker(config: WorkerConfig, shutdown: CancellationToken) -> Result<()> {
    let source = GrpcJobSource::connect(&config).await?;
    WorkerPool::new(config, source).run(shutdown).await;
    Ok(())
}
