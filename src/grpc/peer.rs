use tonic::{Request, Status};

/// What the transport tells a handler about the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerIdentity {
    /// The peer presented a certificate chain that verified against the
    /// listener's trusted authority.
    pub verified: bool,
    /// Remote socket address, or `unknown`.
    pub addr: String,
}

impl PeerIdentity {
    pub fn verified(addr: impl Into<String>) -> Self {
        Self {
            verified: true,
            addr: addr.into(),
        }
    }

    pub fn unverified(addr: impl Into<String>) -> Self {
        Self {
            verified: false,
            addr: addr.into(),
        }
    }

    /// Identity attached by [`identify_peer`]; requests that did not pass
    /// through the interceptor are treated as unverified.
    pub fn of<T>(request: &Request<T>) -> Self {
        request
            .extensions()
            .get::<PeerIdentity>()
            .cloned()
            .unwrap_or_else(|| Self::unverified(remote_addr(request)))
    }
}

fn remote_addr<T>(request: &Request<T>) -> String {
    request
        .remote_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Interceptor that derives a [`PeerIdentity`] from the TLS session.
///
/// rustls only completes a handshake with a client certificate once the chain
/// verified against the configured client authority, so the presence of peer
/// certificates is what marks a caller as verified.
pub fn identify_peer(mut request: Request<()>) -> Result<Request<()>, Status> {
    let verified = request
        .peer_certs()
        .is_some_and(|certs| !certs.is_empty());
    let identity = PeerIdentity {
        verified,
        addr: remote_addr(&request),
    };
    request.extensions_mut().insert(identity);
    Ok(request)
}
