use thiserror::Error;

use crate::tls::TlsError;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("TLS error: {0}")]
    Tls(#[from] TlsError),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("gRPC error: {0}")]
    GrpcError(#[from] tonic::Status),

    #[error("Transport error: {0}")]
    TransportError(#[from] tonic::transport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
