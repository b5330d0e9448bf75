//! TCP listener binding.
//!
//! # Responsibilities
//! - Bind one socket per configured listener
//! - Report the OS-assigned address when port 0 is configured
//! - Surface bind failures (port conflicts) as fatal startup errors

use std::net::{IpAddr, SocketAddr};

use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind a listener on `ip:port`, returning it with its actual address.
pub async fn bind(ip: IpAddr, port: u16) -> Result<(TcpListener, SocketAddr), ListenerError> {
    let addr = SocketAddr::new(ip, port);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { addr, source })?;

    tracing::debug!(address = %local_addr, "Listener bound");

    Ok((listener, local_addr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[tokio::test]
    async fn binds_ephemeral_port() {
        let (listener, addr) = bind(LOOPBACK, 0).await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(listener.local_addr().unwrap(), addr);
    }

    #[tokio::test]
    async fn port_conflict_is_bind_error() {
        let (_first, first_addr) = bind(LOOPBACK, 0).await.unwrap();
        let port = first_addr.port();

        let err = bind(LOOPBACK, port).await.unwrap_err();
        let ListenerError::Bind { addr, source } = err;
        assert_eq!(addr.port(), port);
        assert_eq!(source.kind(), std::io::ErrorKind::AddrInUse);
    }
}
