use tokio::io;
use tokio::net::{TcpStream, ToSocketAddrs};

/// Opens a TCP connection to the device.
pub(crate) async fn connect_tcp(addr: impl ToSocketAddrs, nodelay: bool) -> io::Result<TcpStream> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(nodelay)?;
    Ok(stream)
}

/// Extracts the host from `host:port`, `[v6]:port` or a bare host.
#[cfg(feature = "tls")]
pub(crate) fn host_of(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        return rest.split_once(']').map_or(rest, |(host, _)| host);
    }
    match addr.rsplit_once(':') {
        // More than one colon without brackets is a bare IPv6 address.
        Some((host, _)) if !host.contains(':') => host,
        _ => addr,
    }
}

#[cfg(feature = "tls")]
pub(crate) use tls::connect_tls;

#[cfg(feature = "tls")]
mod tls {
    use std::sync::Arc;

    use rustls::ClientConfig;
    use rustls::pki_types::ServerName;
    use tokio::net::TcpStream;
    use tokio_rustls::{TlsConnector, client::TlsStream};

    use super::{connect_tcp, host_of};
    use crate::error::{ClientError, ClientResult};

    /// Opens a TCP connection and runs the TLS handshake, verifying the host of `addr`.
    pub(crate) async fn connect_tls(
        addr: &str,
        config: Arc<ClientConfig>,
        nodelay: bool,
    ) -> ClientResult<TlsStream<TcpStream>> {
        let server_name = ServerName::try_from(host_of(addr).to_string())
            .map_err(|e| ClientError::ServerName(e.to_string()))?;
        let stream = connect_tcp(addr, nodelay).await?;
        let stream = TlsConnector::from(config).connect(server_name, stream).await?;
        Ok(stream)
    }
}

#[cfg(all(test, feature = "tls"))]
mod tests {
    use super::*;

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("192.168.88.1:8729"), "192.168.88.1");
        assert_eq!(host_of("router.lan:8729"), "router.lan");
        assert_eq!(host_of("router.lan"), "router.lan");
        assert_eq!(host_of("[fe80::1]:8729"), "fe80::1");
        assert_eq!(host_of("fe80::1"), "fe80::1");
    }
}
