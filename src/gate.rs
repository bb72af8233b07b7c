use std::io;
use std::sync::Arc;
use std::time::Duration;

use http::uri::Scheme;
use http::Uri;
use tracing::{debug, info, warn};

use crate::cache::{CertificateCache, CertificateRecord, EndpointKey};
use crate::error::{ProbeError, VerificationError};
use crate::probe::{CertificateProbe, TlsProbe};
use crate::verifier::{sha256_fingerprint, PinVerifier};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_HTTPS_PORT: u16 = 443;

#[derive(Debug, Clone, Copy)]
pub struct GateConfig {
    pub probe_timeout: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl GateConfig {
    pub fn probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }
}

#[derive(Debug)]
pub enum VerificationOutcome {
    Verified,
    Rejected(VerificationError),
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }

    pub fn into_result(self) -> Result<(), VerificationError> {
        match self {
            Self::Verified => Ok(()),
            Self::Rejected(error) => Err(error),
        }
    }
}

impl From<Result<(), VerificationError>> for VerificationOutcome {
    fn from(result: Result<(), VerificationError>) -> Self {
        match result {
            Ok(()) => Self::Verified,
            Err(error) => Self::Rejected(error),
        }
    }
}

/// Only `https` requests go through the gate.
pub fn requires_verification(uri: &Uri) -> bool {
    uri.scheme() == Some(&Scheme::HTTPS)
}

/// Establishes trust in an endpoint's leaf certificate before a request is
/// allowed out.
///
/// Certificates are cached per endpoint; verification results are not, so
/// the pin verifier is consulted on every call.
pub struct VerificationGate {
    probe: Arc<dyn CertificateProbe>,
    verifier: Arc<dyn PinVerifier>,
    cache: CertificateCache,
    config: GateConfig,
}

impl VerificationGate {
    pub fn new(
        probe: Arc<dyn CertificateProbe>,
        verifier: Arc<dyn PinVerifier>,
        config: GateConfig,
    ) -> Self {
        Self {
            probe,
            verifier,
            cache: CertificateCache::new(),
            config,
        }
    }

    pub fn with_native_roots(
        verifier: Arc<dyn PinVerifier>,
        config: GateConfig,
    ) -> io::Result<Self> {
        Ok(Self::new(
            Arc::new(TlsProbe::with_native_roots()?),
            verifier,
            config,
        ))
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn cache(&self) -> &CertificateCache {
        &self.cache
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("certificate cache cleared");
    }

    /// One cache lookup, at most one probe and exactly one verifier call
    /// unless the probe fails.
    pub async fn authorize(&self, host: &str, port: u16) -> Result<(), VerificationError> {
        let key = EndpointKey::new(host, port);

        let record = match self.cache.get(&key) {
            Some(record) => {
                debug!(endpoint = %key, "using cached certificate");
                record
            }
            None => {
                let certificate = self
                    .probe
                    .probe(host, port, self.config.probe_timeout)
                    .await
                    .map_err(|error| {
                        warn!(endpoint = %key, %error, "certificate probe failed");
                        error
                    })?;

                let record = Arc::new(CertificateRecord::new(certificate));
                info!(
                    endpoint = %key,
                    fingerprint = %hex::encode(sha256_fingerprint(record.der())),
                    "probed leaf certificate"
                );
                self.cache.put(key.clone(), Arc::clone(&record));
                record
            }
        };

        self.verifier
            .verify(host, record.pem())
            .await
            .map_err(|error| {
                warn!(
                    endpoint = %key,
                    code = %error.code,
                    message = %error.message,
                    "pin verification rejected certificate"
                );
                VerificationError::PinRejected(error)
            })
    }

    pub async fn evaluate(&self, host: &str, port: u16) -> VerificationOutcome {
        self.authorize(host, port).await.into()
    }

    /// Runs [`authorize`](Self::authorize) for `https` URIs and lets anything
    /// else through untouched.
    pub async fn authorize_request(&self, uri: &Uri) -> Result<(), VerificationError> {
        if !requires_verification(uri) {
            debug!(%uri, "insecure scheme, skipping certificate verification");
            return Ok(());
        }

        let Some(host) = uri.host() else {
            return Err(ProbeError::ConnectionFailed {
                endpoint: uri.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "request URI has no host"),
            }
            .into());
        };
        let port = uri.port_u16().unwrap_or(DEFAULT_HTTPS_PORT);

        self.authorize(host, port).await
    }
}
