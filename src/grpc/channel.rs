use tonic::transport::{Channel, Endpoint};

use crate::error::{RelayError, Result};
use crate::tls::PeerTls;

/// Build an mTLS endpoint for a coordinator listener at `host:port`.
pub fn endpoint(addr: &str, domain: &str, tls: &PeerTls) -> Result<Endpoint> {
    let host_port = addr
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let endpoint = Endpoint::from_shared(format!("https://{}", host_port))
        .map_err(|e| RelayError::InvalidAddress(format!("{}: {}", addr, e)))?;

    Ok(endpoint.tls_config(tls.client_tls_config(domain))?)
}

/// Connect eagerly; fails if the coordinator is unreachable.
pub async fn connect(addr: &str, domain: &str, tls: &PeerTls) -> Result<Channel> {
    Ok(endpoint(addr, domain, tls)?.connect().await?)
}

/// Connect on first use, so a worker can start before the coordinator.
pub fn connect_lazy(addr: &str, domain: &str, tls: &PeerTls) -> Result<Channel> {
    Ok(endpoint(addr, domain, tls)?.connect_lazy())
}
