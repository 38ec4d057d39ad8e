//! Certificate loading and mTLS configuration for both sides of a connection.
//!
//! The coordinator presents one certificate on two listeners with different
//! trust requirements:
//! - the client listener verifies submitting clients against the client CA
//! - the worker listener authenticates the coordinator to workers, and
//!   additionally verifies workers when a worker CA is configured
//!
//! Workers and submitting clients verify the coordinator against their own
//! trusted authority bundle and may present an identity of their own.

use std::path::{Path, PathBuf};

use tokio::fs;
use tonic::transport::{Certificate, ClientTlsConfig, Identity, ServerTlsConfig};

use crate::config::{CoordinatorTlsConfig, TlsConfig};

/// Error type for TLS configuration issues.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("CA certificate path not configured")]
    MissingCaCert,

    #[error("Certificate path not configured")]
    MissingCert,

    #[error("Private key path not configured")]
    MissingKey,

    #[error("CA certificate not found: {0}")]
    CaCertNotFound(PathBuf),

    #[error("Certificate not found: {0}")]
    CertNotFound(PathBuf),

    #[error("Private key not found: {0}")]
    KeyNotFound(PathBuf),

    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),
}

async fn read_pem(path: &Path, not_found: fn(PathBuf) -> TlsError) -> Result<Vec<u8>, TlsError> {
    if !path.exists() {
        return Err(not_found(path.to_path_buf()));
    }
    Ok(fs::read(path).await?)
}

async fn load_identity(cert_path: &Path, key_path: &Path) -> Result<Identity, TlsError> {
    let cert_pem = read_pem(cert_path, TlsError::CertNotFound).await?;
    let key_pem = read_pem(key_path, TlsError::KeyNotFound).await?;
    Ok(Identity::from_pem(cert_pem, key_pem))
}

async fn load_ca(path: &Path) -> Result<Certificate, TlsError> {
    let pem = read_pem(path, TlsError::CaCertNotFound).await?;
    Ok(Certificate::from_pem(pem))
}

/// Loaded coordinator TLS materials.
#[derive(Clone)]
pub struct CoordinatorIdentity {
    identity: Identity,
    client_ca: Certificate,
    worker_ca: Option<Certificate>,
}

impl CoordinatorIdentity {
    /// Load the coordinator certificate, key and trusted authorities.
    ///
    /// # Errors
    ///
    /// Returns an error if a required path is not configured, or if any
    /// configured file does not exist or cannot be read.
    pub async fn load(config: &CoordinatorTlsConfig) -> Result<Self, TlsError> {
        let client_ca_path = config
            .client_ca_cert_path
            .as_ref()
            .ok_or(TlsError::MissingCaCert)?;
        let cert_path = config.cert_path.as_ref().ok_or(TlsError::MissingCert)?;
        let key_path = config.key_path.as_ref().ok_or(TlsError::MissingKey)?;

        let client_ca = load_ca(client_ca_path).await?;
        let identity = load_identity(cert_path, key_path).await?;
        let worker_ca = match &config.worker_ca_cert_path {
            Some(path) => Some(load_ca(path).await?),
            None => None,
        };

        Ok(Self {
            identity,
            client_ca,
            worker_ca,
        })
    }

    /// TLS config for the client listener.
    ///
    /// Client certificates are verified against the client CA whenever they
    /// are presented. A connection without one is still accepted so that
    /// listing works; submission handlers reject such peers individually.
    pub fn client_listener_config(&self) -> ServerTlsConfig {
        ServerTlsConfig::new()
            .identity(self.identity.clone())
            .client_ca_root(self.client_ca.clone())
            .client_auth_optional(true)
    }

    /// TLS config for the worker listener.
    pub fn worker_listener_config(&self) -> ServerTlsConfig {
        let config = ServerTlsConfig::new().identity(self.identity.clone());
        match &self.worker_ca {
            Some(ca) => config.client_ca_root(ca.clone()),
            None => config,
        }
    }

    pub fn requires_worker_certificates(&self) -> bool {
        self.worker_ca.is_some()
    }
}

/// Loaded TLS materials for a peer connecting to the coordinator.
#[derive(Clone)]
pub struct PeerTls {
    ca_cert: Certificate,
    identity: Option<Identity>,
}

impl PeerTls {
    /// Load the trusted authority and, when configured, this peer's identity.
    ///
    /// A certificate without its key (or the reverse) is a configuration error.
    pub async fn load(config: &TlsConfig) -> Result<Self, TlsError> {
        let ca_path = config.ca_cert_path.as_ref().ok_or(TlsError::MissingCaCert)?;
        let ca_cert = load_ca(ca_path).await?;

        let identity = match (&config.cert_path, &config.key_path) {
            (Some(cert_path), Some(key_path)) => Some(load_identity(cert_path, key_path).await?),
            (Some(_), None) => return Err(TlsError::MissingKey),
            (None, Some(_)) => return Err(TlsError::MissingCert),
            (None, None) => None,
        };

        Ok(Self { ca_cert, identity })
    }

    pub fn has_identity(&self) -> bool {
        self.identity.is_some()
    }

    /// Client TLS config verifying the coordinator as `domain`.
    pub fn client_tls_config(&self, domain: &str) -> ClientTlsConfig {
        let config = ClientTlsConfig::new()
            .domain_name(domain)
            .ca_certificate(self.ca_cert.clone());
        match &self.identity {
            Some(identity) => config.identity(identity.clone()),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn coordinator_load_missing_paths() {
        let result = CoordinatorIdentity::load(&CoordinatorTlsConfig::default()).await;
        assert!(matches!(result, Err(TlsError::MissingCaCert)));

        let config = CoordinatorTlsConfig {
            client_ca_cert_path: Some(PathBuf::from("/tmp/ca.crt")),
            ..Default::default()
        };
        let result = CoordinatorIdentity::load(&config).await;
        assert!(matches!(result, Err(TlsError::MissingCert)));
    }

    #[tokio::test]
    async fn coordinator_load_nonexistent_files() {
        let config = CoordinatorTlsConfig {
            cert_path: Some(PathBuf::from("/nonexistent/server.crt")),
            key_path: Some(PathBuf::from("/nonexistent/server.key")),
            client_ca_cert_path: Some(PathBuf::from("/nonexistent/ca.crt")),
            worker_ca_cert_path: None,
        };

        let result = CoordinatorIdentity::load(&config).await;
        assert!(matches!(result, Err(TlsError::CaCertNotFound(_))));
    }

    #[tokio::test]
    async fn peer_load_missing_ca() {
        let result = PeerTls::load(&TlsConfig::default()).await;
        assert!(matches!(result, Err(TlsError::MissingCaCert)));
    }

    #[tokio::test]
    async fn peer_load_nonexistent_ca() {
        let config = TlsConfig {
            ca_cert_path: Some(PathBuf::from("/nonexistent/ca.crt")),
            cert_path: None,
            key_path: None,
        };
        let result = PeerTls::load(&config).await;
        assert!(matches!(result, Err(TlsError::CaCertNotFound(_))));
    }
}
