#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use parking_lot::Mutex;
use tls_pin_gate::{
    Certificate, CertificateProbe, ErrorCode, GateConfig, PinVerifier, ProbeError, ServiceError,
    Transport, TransportError, VerificationGate,
};

pub const SAMPLE_DER: &[u8] = &[0x30, 0x82, 0x01, 0x0a, 0x02, 0x82, 0x01, 0x01, 0x00, 0xc3];

pub enum ProbeBehaviour {
    Certificate(Vec<u8>),
    HandshakeFailure,
    ConnectionRefused,
    NoCertificate,
    Timeout,
    /// Never answers; the in-flight call holds a [`ReleaseFlag`] until dropped.
    Stall,
}

/// Raises its flag when dropped.
pub struct ReleaseFlag(Arc<AtomicBool>);

impl Drop for ReleaseFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct MockProbe {
    behaviour: ProbeBehaviour,
    calls: AtomicUsize,
    released: Arc<AtomicBool>,
}

impl MockProbe {
    pub fn new(behaviour: ProbeBehaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: AtomicUsize::new(0),
            released: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn returning(der: &[u8]) -> Arc<Self> {
        Self::new(ProbeBehaviour::Certificate(der.to_vec()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether a stalled call has been dropped.
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Waits until `n` calls have started.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl CertificateProbe for MockProbe {
    async fn probe(
        &self,
        host: &str,
        port: u16,
        limit: Duration,
    ) -> Result<Certificate, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let endpoint = format!("{host}:{port}");
        match &self.behaviour {
            ProbeBehaviour::Certificate(der) => Ok(Certificate(der.clone())),
            ProbeBehaviour::HandshakeFailure => Err(ProbeError::TlsHandshakeFailed {
                endpoint,
                reason: "invalid peer certificate: UnknownIssuer".to_owned(),
            }),
            ProbeBehaviour::ConnectionRefused => Err(ProbeError::ConnectionFailed {
                endpoint,
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            }),
            ProbeBehaviour::NoCertificate => Err(ProbeError::NoCertificatePresented { endpoint }),
            ProbeBehaviour::Timeout => Err(ProbeError::Timeout {
                endpoint,
                timeout: limit,
            }),
            ProbeBehaviour::Stall => {
                let _held = ReleaseFlag(self.released.clone());
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(ProbeError::Timeout {
                    endpoint,
                    timeout: limit,
                })
            }
        }
    }
}

pub struct MockVerifier {
    rejection: Option<ErrorCode>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockVerifier {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            rejection: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn rejecting(code: ErrorCode) -> Arc<Self> {
        Arc::new(Self {
            rejection: Some(code),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_call(&self) -> Option<(String, String)> {
        self.calls.lock().last().cloned()
    }
}

#[async_trait]
impl PinVerifier for MockVerifier {
    async fn verify(&self, domain: &str, certificate_pem: &str) -> Result<(), ServiceError> {
        self.calls
            .lock()
            .push((domain.to_owned(), certificate_pem.to_owned()));
        match self.rejection {
            Some(code) => Err(ServiceError::new(code, format!("{domain} rejected by mock"))),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        self.sent
            .lock()
            .push(format!("{} {}", request.method(), request.uri()));
        Ok(Response::builder()
            .status(200)
            .body(Bytes::from_static(b"ok"))?)
    }
}

pub fn gate(probe: &Arc<MockProbe>, verifier: &Arc<MockVerifier>) -> VerificationGate {
    VerificationGate::new(probe.clone(), verifier.clone(), GateConfig::default())
}
