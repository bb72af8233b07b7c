use std::io;
use std::sync::Arc;
use std::time::Duration;

use tls_pin_gate::{CertificateProbe, ProbeError, TlsProbe};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::rustls::{Certificate, PrivateKey, RootCertStore, ServerConfig};
use tokio_rustls::TlsAcceptor;

const LIMIT: Duration = Duration::from_secs(5);

fn self_signed() -> (Vec<u8>, Vec<u8>) {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).unwrap();
    (cert.serialize_der().unwrap(), cert.serialize_private_key_der())
}

/// Serves every connection with the given certificate until the client hangs up.
async fn spawn_tls_server(der: Vec<u8>, key: Vec<u8>) -> u16 {
    let config = ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(vec![Certificate(der)], PrivateKey(key))
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                if let Ok(mut tls) = acceptor.accept(tcp).await {
                    let mut buf = [0u8; 64];
                    let _ = tls.read(&mut buf).await;
                }
            });
        }
    });

    port
}

fn trusting(der: &[u8]) -> TlsProbe {
    let mut roots = RootCertStore::empty();
    roots.add(&Certificate(der.to_vec())).unwrap();
    TlsProbe::new(roots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_returns_leaf_certificate() {
        let (der, key) = self_signed();
        let port = spawn_tls_server(der.clone(), key).await;

        let leaf = trusting(&der)
            .probe("localhost", port, LIMIT)
            .await
            .expect("probe should succeed against a trusted server");

        assert_eq!(leaf.0, der);
    }

    #[tokio::test]
    async fn test_untrusted_chain_fails_handshake() {
        let (der, key) = self_signed();
        let port = spawn_tls_server(der, key).await;

        let err = TlsProbe::new(RootCertStore::empty())
            .probe("localhost", port, LIMIT)
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::TlsHandshakeFailed { .. }), "{err:?}");
        assert_eq!(err.endpoint(), format!("localhost:{port}"));
    }

    #[tokio::test]
    async fn test_hostname_mismatch_fails_handshake() {
        let (der, key) = self_signed();
        let port = spawn_tls_server(der.clone(), key).await;

        // certificate names localhost only
        let err = trusting(&der)
            .probe("127.0.0.1", port, LIMIT)
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::TlsHandshakeFailed { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = TlsProbe::new(RootCertStore::empty())
            .probe("127.0.0.1", port, LIMIT)
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::ConnectionFailed { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_invalid_hostname_fails_before_connecting() {
        let err = TlsProbe::new(RootCertStore::empty())
            .probe("bad host.example", 443, LIMIT)
            .await
            .unwrap_err();

        match err {
            ProbeError::ConnectionFailed { endpoint, source } => {
                assert_eq!(endpoint, "bad host.example:443");
                assert_eq!(source.kind(), io::ErrorKind::InvalidInput);
            }
            other => panic!("expected a connection failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_plaintext_peer_fails_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut tcp, _)) = listener.accept().await {
                let mut buf = [0u8; 512];
                let _ = tcp.read(&mut buf).await;
                let _ = tcp.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n").await;
            }
        });

        let err = TlsProbe::new(RootCertStore::empty())
            .probe("127.0.0.1", port, LIMIT)
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::TlsHandshakeFailed { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((tcp, _)) = listener.accept().await {
                tokio::time::sleep(Duration::from_secs(10)).await;
                drop(tcp);
            }
        });

        let limit = Duration::from_millis(200);
        let err = TlsProbe::new(RootCertStore::empty())
            .probe("127.0.0.1", port, limit)
            .await
            .unwrap_err();

        match err {
            ProbeError::Timeout { endpoint, timeout } => {
                assert_eq!(endpoint, format!("127.0.0.1:{port}"));
                assert_eq!(timeout, limit);
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
    }
}
