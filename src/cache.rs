use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustls::Certificate;

use crate::pem::to_pem;

/// `host:port` exactly as the request URI spelled the host. No case folding
/// or IDNA normalisation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointKey(String);

impl EndpointKey {
    pub fn new(host: &str, port: u16) -> Self {
        Self(format!("{host}:{port}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Leaf certificate observed by a successful probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    certificate: Certificate,
    pem: String,
}

impl CertificateRecord {
    pub fn new(certificate: Certificate) -> Self {
        let pem = to_pem(&certificate.0);
        Self { certificate, pem }
    }

    pub fn der(&self) -> &[u8] {
        &self.certificate.0
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }
}

/// Probe results keyed by endpoint.
///
/// Records are handed out as `Arc`s, so a caller holding one keeps using it
/// even if the cache is cleared underneath. Entries never expire.
#[derive(Debug, Default)]
pub struct CertificateCache {
    entries: RwLock<HashMap<EndpointKey, Arc<CertificateRecord>>>,
}

impl CertificateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &EndpointKey) -> Option<Arc<CertificateRecord>> {
        self.entries.read().get(key).cloned()
    }

    /// Last write wins. Returns the record that was replaced, if any.
    pub fn put(
        &self,
        key: EndpointKey,
        record: Arc<CertificateRecord>,
    ) -> Option<Arc<CertificateRecord>> {
        self.entries.write().insert(key, record)
    }

    pub fn contains(&self, key: &EndpointKey) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
