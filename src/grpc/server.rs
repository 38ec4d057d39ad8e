use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

use crate::config::CoordinatorConfig;
use crate::error::Result;
use crate::grpc::client_service::ClientServiceImpl;
use crate::grpc::peer::identify_peer;
use crate::grpc::worker_service::WorkerServiceImpl;
use crate::proto::client_service_server::ClientServiceServer;
use crate::proto::worker_service_server::WorkerServiceServer;
use crate::scheduler::JobStore;
use crate::tls::CoordinatorIdentity;

/// The coordinator process: one job store behind two TLS listeners.
pub struct CoordinatorServer {
    config: CoordinatorConfig,
    store: Arc<JobStore>,
    tls: CoordinatorIdentity,
}

impl CoordinatorServer {
    pub fn new(config: CoordinatorConfig, store: Arc<JobStore>, tls: CoordinatorIdentity) -> Self {
        Self { config, store, tls }
    }

    /// Bind both configured addresses and serve until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let client_listener = TcpListener::bind(self.config.client_addr).await?;
        let worker_listener = TcpListener::bind(self.config.worker_addr).await?;
        self.serve(client_listener, worker_listener, shutdown).await
    }

    /// Serve on already bound listeners.
    ///
    /// Either listener failing stops the coordinator.
    pub async fn serve(
        self,
        client_listener: TcpListener,
        worker_listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let client_addr = client_listener.local_addr()?;
        let worker_addr = worker_listener.local_addr()?;

        let client_router = Server::builder()
            .tls_config(self.tls.client_listener_config())?
            .add_service(ClientServiceServer::with_interceptor(
                ClientServiceImpl::new(self.store.clone()),
                identify_peer,
            ));
        let worker_router = Server::builder()
            .tls_config(self.tls.worker_listener_config())?
            .add_service(WorkerServiceServer::with_interceptor(
                WorkerServiceImpl::new(self.store.clone()),
                identify_peer,
            ));

        tracing::info!(
            client_addr = %client_addr,
            worker_addr = %worker_addr,
            worker_mtls = self.tls.requires_worker_certificates(),
            "Starting coordinator"
        );

        let client_shutdown = shutdown.clone();
        let client = client_router.serve_with_incoming_shutdown(
            TcpListenerStream::new(client_listener),
            async move { client_shutdown.cancelled().await },
        );
        let worker = worker_router.serve_with_incoming_shutdown(
            TcpListenerStream::new(worker_listener),
            async move { shutdown.cancelled().await },
        );

        tokio::try_join!(client, worker)?;

        let stats = self.store.stats().await;
        tracing::info!(
            waiting = stats.waiting,
            running = stats.running,
            done = stats.done,
            failed = stats.failed,
            "Coordinator stopped"
        );
        Ok(())
    }
}
