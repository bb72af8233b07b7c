use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::{Certificate, ClientConfig, RootCertStore, ServerName};
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::error::ProbeError;

/// Fetches the leaf certificate an endpoint presents.
#[async_trait]
pub trait CertificateProbe: Send + Sync {
    async fn probe(
        &self,
        host: &str,
        port: u16,
        limit: Duration,
    ) -> Result<Certificate, ProbeError>;
}

/// Opens a dedicated TLS connection, lets rustls validate the chain and
/// hostname against the configured roots, and keeps the first certificate the
/// server sent.
#[derive(Clone)]
pub struct TlsProbe {
    connector: TlsConnector,
}

impl TlsProbe {
    pub fn new(roots: RootCertStore) -> Self {
        let config = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth();

        Self::from_config(Arc::new(config))
    }

    pub fn from_config(config: Arc<ClientConfig>) -> Self {
        Self {
            connector: TlsConnector::from(config),
        }
    }

    /// Trusts whatever the operating system trusts.
    pub fn with_native_roots() -> io::Result<Self> {
        let native: Vec<Vec<u8>> = rustls_native_certs::load_native_certs()?
            .into_iter()
            .map(|cert| cert.0)
            .collect();

        let mut roots = RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(&native);
        debug!(added, ignored, "loaded native trust anchors");

        Ok(Self::new(roots))
    }

    async fn handshake(&self, host: &str, port: u16) -> Result<Certificate, ProbeError> {
        let endpoint = format!("{host}:{port}");
        // URIs keep IPv6 literals bracketed
        let address = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        let server_name =
            ServerName::try_from(address).map_err(|e| ProbeError::ConnectionFailed {
                endpoint: endpoint.clone(),
                source: io::Error::new(io::ErrorKind::InvalidInput, e.to_string()),
            })?;

        let tcp = TcpStream::connect((address, port))
            .await
            .map_err(|source| ProbeError::ConnectionFailed {
                endpoint: endpoint.clone(),
                source,
            })?;

        let mut stream = self
            .connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| ProbeError::TlsHandshakeFailed {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let leaf = {
            let (_, session) = stream.get_ref();
            session
                .peer_certificates()
                .and_then(|chain| chain.first())
                .cloned()
        };

        // close_notify; the socket is dropped with the stream either way
        let _ = stream.shutdown().await;

        leaf.ok_or(ProbeError::NoCertificatePresented { endpoint })
    }
}

#[async_trait]
impl CertificateProbe for TlsProbe {
    async fn probe(
        &self,
        host: &str,
        port: u16,
        limit: Duration,
    ) -> Result<Certificate, ProbeError> {
        match timeout(limit, self.handshake(host, port)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout {
                endpoint: format!("{host}:{port}"),
                timeout: limit,
            }),
        }
    }
}
