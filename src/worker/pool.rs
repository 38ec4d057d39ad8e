use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::worker::executor::JobExecutor;
use crate::worker::poller::Poller;
use crate::worker::source::JobSource;

/// A fixed number of independent pollers sharing one [`JobSource`].
pub struct WorkerPool<S> {
    config: WorkerConfig,
    source: Arc<S>,
    executor: JobExecutor,
}

impl<S: JobSource> WorkerPool<S> {
    pub fn new(config: WorkerConfig, source: S) -> Self {
        Self {
            config,
            source: Arc::new(source),
            executor: JobExecutor::default(),
        }
    }

    /// Run every poller until `shutdown` is cancelled and all have stopped.
    pub async fn run(self, shutdown: CancellationToken) {
        let pool_size = self.config.pool_size.max(1);
        tracing::info!(
            pool_size,
            coordinator = %self.config.coordinator_addr,
            "Starting worker pool"
        );

        let mut pollers = JoinSet::new();
        for worker in 0..pool_size {
            let poller = Poller::new(
                worker,
                self.source.clone(),
                self.executor.clone(),
                &self.config,
            );
            let token = shutdown.clone();
            pollers.spawn(async move { poller.run(token).await });
        }

        while let Some(result) = pollers.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Poller task failed");
            }
        }
        tracing::info!("Worker pool stopped");
    }
}
