use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Server name every peer expects in the coordinator's certificate.
///
/// Workers and clients usually connect by IP address, so the certificate is
/// matched against this name rather than the dialled host.
pub const DEFAULT_TLS_DOMAIN: &str = "jobrelay-coordinator";

pub const DEFAULT_CLIENT_PORT: u16 = 8443;
pub const DEFAULT_WORKER_PORT: u16 = 8444;

/// Resolve a hostname or IP literal to the first matching socket address.
pub async fn resolve_addr(host: &str, port: u16) -> io::Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address found for {}", host),
            )
        })
}

/// `host:port` for dialling, with IPv6 literals in brackets.
pub fn host_port(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(ip)) => format!("[{}]:{}", ip, port),
        _ => format!("{}:{}", host, port),
    }
}

/// Certificate material for a connecting peer (worker or submitting client).
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Trusted authority bundle used to verify the coordinator (PEM).
    pub ca_cert_path: Option<PathBuf>,

    /// This peer's certificate (PEM), presented during the handshake.
    pub cert_path: Option<PathBuf>,

    /// Private key matching `cert_path` (PEM).
    pub key_path: Option<PathBuf>,
}

/// Certificate material for the coordinator's two listeners.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorTlsConfig {
    /// Coordinator certificate (PEM), presented on both listeners.
    pub cert_path: Option<PathBuf>,

    /// Private key matching `cert_path` (PEM).
    pub key_path: Option<PathBuf>,

    /// Authority that signs submitting clients' certificates (PEM).
    pub client_ca_cert_path: Option<PathBuf>,

    /// Authority that signs worker certificates (PEM). When unset the worker
    /// listener only authenticates the coordinator to workers.
    pub worker_ca_cert_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Listener for job submission and listing.
    pub client_addr: SocketAddr,
    /// Listener for leasing and status reports.
    pub worker_addr: SocketAddr,
    pub tls: CoordinatorTlsConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            client_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_CLIENT_PORT)),
            worker_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_WORKER_PORT)),
            tls: CoordinatorTlsConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn new(client_addr: SocketAddr, worker_addr: SocketAddr) -> Self {
        Self {
            client_addr,
            worker_addr,
            ..Default::default()
        }
    }

    pub fn with_tls(mut self, tls: CoordinatorTlsConfig) -> Self {
        self.tls = tls;
        self
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Coordinator worker endpoint, `host:port`.
    pub coordinator_addr: String,
    pub tls_domain: String,
    pub tls: TlsConfig,
    /// Number of concurrent pollers.
    pub pool_size: usize,
    /// Wait between lease attempts when the queue is empty.
    pub poll_interval: Duration,
    /// Delivery attempts per status report, including the first.
    pub report_attempts: u32,
    /// Wait between report delivery attempts.
    pub report_retry_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            coordinator_addr: format!("127.0.0.1:{}", DEFAULT_WORKER_PORT),
            tls_domain: DEFAULT_TLS_DOMAIN.to_string(),
            tls: TlsConfig::default(),
            pool_size: 1,
            poll_interval: Duration::from_secs(1),
            report_attempts: 3,
            report_retry_delay: Duration::from_millis(500),
        }
    }
}

impl WorkerConfig {
    pub fn new(coordinator_addr: impl Into<String>) -> Self {
        Self {
            coordinator_addr: coordinator_addr.into(),
            ..Default::default()
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_configs_default_to_no_paths() {
        let cfg = TlsConfig::default();
        assert!(cfg.ca_cert_path.is_none());
        assert!(cfg.cert_path.is_none());
        assert!(cfg.key_path.is_none());

        let cfg = CoordinatorTlsConfig::default();
        assert!(cfg.cert_path.is_none());
        assert!(cfg.key_path.is_none());
        assert!(cfg.client_ca_cert_path.is_none());
        assert!(cfg.worker_ca_cert_path.is_none());
    }

    #[test]
    fn coordinator_config_default() {
        let cfg = CoordinatorConfig::default();
        assert_eq!(cfg.client_addr.to_string(), "127.0.0.1:8443");
        assert_eq!(cfg.worker_addr.to_string(), "127.0.0.1:8444");
        assert!(cfg.tls.client_ca_cert_path.is_none());
    }

    #[test]
    fn worker_config_default() {
        let cfg = WorkerConfig::default();
        assert_eq!(cfg.coordinator_addr, "127.0.0.1:8444");
        assert_eq!(cfg.tls_domain, DEFAULT_TLS_DOMAIN);
        assert_eq!(cfg.pool_size, 1);
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
        assert_eq!(cfg.report_attempts, 3);
    }

    #[tokio::test]
    async fn resolve_addr_accepts_hostnames_and_ip_literals() {
        let addr = resolve_addr("127.0.0.1", 8443).await.unwrap();
        assert_eq!(addr, "127.0.0.1:8443".parse::<SocketAddr>().unwrap());

        let addr = resolve_addr("::1", 8443).await.unwrap();
        assert_eq!(addr, "[::1]:8443".parse::<SocketAddr>().unwrap());

        let addr = resolve_addr("localhost", 8444).await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 8444);
    }

    #[tokio::test]
    async fn resolve_addr_rejects_unresolvable_host() {
        assert!(resolve_addr("no such host.invalid", 8443).await.is_err());
    }

    #[test]
    fn host_port_brackets_ipv6_literals() {
        assert_eq!(host_port("127.0.0.1", 8444), "127.0.0.1:8444");
        assert_eq!(host_port("localhost", 8444), "localhost:8444");
        assert_eq!(host_port("::1", 8444), "[::1]:8444");
    }

    #[test]
    fn worker_config_builders() {
        let cfg = WorkerConfig::new("10.0.0.1:9000")
            .with_pool_size(4)
            .with_poll_interval(Duration::from_millis(50));
        assert_eq!(cfg.coordinator_addr, "10.0.0.1:9000");
        assert_eq!(cfg.pool_size, 4);
        assert_eq!(cfg.poll_interval, Duration::from_millis(50));
    }
}
