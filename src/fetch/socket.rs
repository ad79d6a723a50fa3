//! Socket plumbing shared by the raw-socket and stream transports.

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;
use url::{Host, Position, Url};

pub trait Io: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Io for T {}

/// A plain or TLS-wrapped connection. Dropping it closes the socket.
pub type BoxedIo = Box<dyn Io>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    /// Value for the `Host` header: the port is only included when it is not
    /// the scheme default.
    pub authority: String,
    pub path_and_query: String,
}

impl Target {
    pub fn from_url(url: &Url) -> Result<Self> {
        let tls = match url.scheme() {
            "https" => true,
            "http" => false,
            other => bail!("Unsupported URL scheme '{other}' in {url}"),
        };
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => bail!("URL has no host: {url}"),
        };
        let port = url
            .port_or_known_default()
            .with_context(|| format!("URL has no port: {url}"))?;
        let host_str = url.host_str().unwrap_or_default();
        let authority = match url.port() {
            Some(port) => format!("{host_str}:{port}"),
            None => host_str.to_string(),
        };
        let path_and_query = url[Position::BeforePath..Position::AfterQuery].to_string();

        Ok(Self {
            host,
            port,
            tls,
            authority,
            path_and_query: if path_and_query.is_empty() {
                "/".to_string()
            } else {
                path_and_query
            },
        })
    }
}

/// Opens a TCP connection to `target`, negotiating TLS for https.
pub async fn open(target: &Target, accept_invalid_certs: bool) -> Result<BoxedIo> {
    let tcp = TcpStream::connect((target.host.as_str(), target.port))
        .await
        .with_context(|| format!("Failed to connect to {}:{}", target.host, target.port))?;
    debug!(host = %target.host, port = target.port, tls = target.tls, "Socket connected");

    if !target.tls {
        return Ok(Box::new(tcp));
    }

    let connector = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(accept_invalid_certs)
        .danger_accept_invalid_hostnames(accept_invalid_certs)
        .build()
        .context("Failed to build TLS connector")?;
    let stream = tokio_native_tls::TlsConnector::from(connector)
        .connect(&target.host, tcp)
        .await
        .with_context(|| format!("TLS handshake with {} failed", target.host))?;

    Ok(Box::new(stream))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_target_uses_default_port() {
        let url: Url = "https://api.example.com/data?x=1".parse().unwrap();
        let target = Target::from_url(&url).unwrap();
        assert_eq!(target.host, "api.example.com");
        assert_eq!(target.port, 443);
        assert!(target.tls);
        assert_eq!(target.authority, "api.example.com");
        assert_eq!(target.path_and_query, "/data?x=1");
    }

    #[test]
    fn test_explicit_port_is_kept_in_authority() {
        let url: Url = "http://127.0.0.1:8080".parse().unwrap();
        let target = Target::from_url(&url).unwrap();
        assert_eq!(target.port, 8080);
        assert!(!target.tls);
        assert_eq!(target.authority, "127.0.0.1:8080");
        assert_eq!(target.path_and_query, "/");
    }

    #[test]
    fn test_ipv6_host_is_unbracketed_for_connect() {
        let url: Url = "http://[::1]:9000/feed".parse().unwrap();
        let target = Target::from_url(&url).unwrap();
        assert_eq!(target.host, "::1");
        assert_eq!(target.authority, "[::1]:9000");
    }

    #[test]
    fn test_unsupported_scheme() {
        let url: Url = "ftp://example.com/file".parse().unwrap();
        assert!(Target::from_url(&url).is_err());
    }
}
