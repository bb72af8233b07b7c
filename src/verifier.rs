use std::collections::HashMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{ErrorCode, ServiceError};
use crate::pem::from_pem;

/// The pin verification service consulted after every successful gate lookup.
#[async_trait]
pub trait PinVerifier: Send + Sync {
    async fn verify(&self, domain: &str, certificate_pem: &str) -> Result<(), ServiceError>;
}

pub fn sha256_fingerprint(der: &[u8]) -> [u8; 32] {
    Sha256::digest(der).into()
}

/// Static verifier comparing the SHA-256 of the whole leaf certificate with a
/// fingerprint registered per domain.
///
/// Meant for the bundled binary and local setups; there is no signed pin
/// configuration and no pin expiry behind it.
#[derive(Debug, Clone, Default)]
pub struct FingerprintVerifier {
    pins: HashMap<String, [u8; 32]>,
    strict: bool,
}

impl FingerprintVerifier {
    /// Unregistered domains are rejected.
    pub fn strict() -> Self {
        Self {
            pins: HashMap::new(),
            strict: true,
        }
    }

    /// Unregistered domains are let through.
    pub fn permissive() -> Self {
        Self {
            pins: HashMap::new(),
            strict: false,
        }
    }

    pub fn with_pin(mut self, domain: impl Into<String>, fingerprint: [u8; 32]) -> Self {
        self.pins.insert(domain.into(), fingerprint);
        self
    }
}

#[async_trait]
impl PinVerifier for FingerprintVerifier {
    async fn verify(&self, domain: &str, certificate_pem: &str) -> Result<(), ServiceError> {
        let Some(expected) = self.pins.get(domain) else {
            if self.strict {
                return Err(ServiceError::new(
                    ErrorCode::DomainNotRegistered,
                    format!("no pin registered for {domain}"),
                ));
            }
            return Ok(());
        };

        let der = from_pem(certificate_pem).ok_or_else(|| {
            ServiceError::new(
                ErrorCode::InvalidServerCert,
                "server certificate is not valid PEM",
            )
        })?;

        let actual = sha256_fingerprint(&der);
        if &actual == expected {
            Ok(())
        } else {
            Err(ServiceError::new(
                ErrorCode::PinsMismatch,
                format!(
                    "certificate fingerprint {} does not match the pin for {domain}",
                    hex::encode(actual)
                ),
            ))
        }
    }
}
