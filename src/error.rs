use std::fmt;
use std::io;
use std::str::FromStr;
use std::time::Duration;

/// Failure of the out-of-band TLS probe.
#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error("could not connect to {endpoint}")]
    ConnectionFailed {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("TLS handshake with {endpoint} failed: {reason}")]
    TlsHandshakeFailed { endpoint: String, reason: String },
    #[error("{endpoint} completed the handshake without presenting a certificate")]
    NoCertificatePresented { endpoint: String },
    #[error("probing {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },
}

impl ProbeError {
    pub fn endpoint(&self) -> &str {
        match self {
            Self::ConnectionFailed { endpoint, .. }
            | Self::TlsHandshakeFailed { endpoint, .. }
            | Self::NoCertificatePresented { endpoint }
            | Self::Timeout { endpoint, .. } => endpoint,
        }
    }
}

/// Error codes owned by the pin verification service.
///
/// The crate never interprets these; they are carried through so callers can
/// branch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    PinsMismatch,
    DomainNotRegistered,
    AllPinsExpired,
    ErrorFetchingPinningInfo,
    JwsValidationFailed,
    InvalidServerCert,
    ConfigurationValidationFailed,
    InvalidProjectConfig,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 8] = [
        Self::PinsMismatch,
        Self::DomainNotRegistered,
        Self::AllPinsExpired,
        Self::ErrorFetchingPinningInfo,
        Self::JwsValidationFailed,
        Self::InvalidServerCert,
        Self::ConfigurationValidationFailed,
        Self::InvalidProjectConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PinsMismatch => "PINS_MISMATCH",
            Self::DomainNotRegistered => "DOMAIN_NOT_REGISTERED",
            Self::AllPinsExpired => "ALL_PINS_EXPIRED",
            Self::ErrorFetchingPinningInfo => "ERROR_FETCHING_PINNING_INFO",
            Self::JwsValidationFailed => "JWS_VALIDATION_FAILED",
            Self::InvalidServerCert => "INVALID_SERVER_CERT",
            Self::ConfigurationValidationFailed => "CONFIGURATION_VALIDATION_FAILED",
            Self::InvalidProjectConfig => "INVALID_PROJECT_CONFIG",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown pin verification error code {0:?}")]
pub struct UnknownErrorCode(pub String);

impl FromStr for ErrorCode {
    type Err = UnknownErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownErrorCode(s.to_owned()))
    }
}

/// Rejection returned by a [`PinVerifier`](crate::verifier::PinVerifier).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ServiceError {
    pub code: ErrorCode,
    pub message: String,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Why the verification gate refused an endpoint.
#[derive(thiserror::Error, Debug)]
pub enum VerificationError {
    #[error(transparent)]
    Transport(#[from] ProbeError),
    #[error("certificate rejected by pin verification: {0}")]
    PinRejected(#[from] ServiceError),
}

impl VerificationError {
    /// The service's error code, if the rejection came from pin verification.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::PinRejected(error) => Some(error.code),
            Self::Transport(_) => None,
        }
    }

    /// Whether the caller may reasonably retry the whole request. This crate
    /// itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(ProbeError::ConnectionFailed { .. } | ProbeError::Timeout { .. })
        )
    }
}

/// Error surfaced by HTTP transports and both interception adapters.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("request blocked by certificate verification")]
    Verification(#[from] VerificationError),
    #[error("invalid request")]
    InvalidRequest(#[from] http::Error),
    #[error("HTTP transport failed")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("client is closed")]
    Closed,
    #[error("interceptor neither continued nor rejected the request")]
    Abandoned,
}

impl TransportError {
    pub fn verification(&self) -> Option<&VerificationError> {
        match self {
            Self::Verification(error) => Some(error),
            _ => None,
        }
    }

    pub fn pin_error_code(&self) -> Option<ErrorCode> {
        self.verification().and_then(VerificationError::code)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        Self::Http(Box::new(error))
    }
}
