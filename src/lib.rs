pub mod cache;
pub mod client;
pub mod error;
pub mod gate;
pub mod interceptor;
pub mod log;
pub mod pem;
pub mod probe;
pub mod tools;
pub mod transport;
pub mod verifier;

pub use cache::{CertificateCache, CertificateRecord, EndpointKey};
pub use client::PinnedClient;
pub use error::{ErrorCode, ProbeError, ServiceError, TransportError, VerificationError};
pub use gate::{GateConfig, VerificationGate, VerificationOutcome};
pub use interceptor::{
    CertificatePinningInterceptor, InterceptorHandler, Pipeline, RequestInterceptor,
};
pub use probe::{CertificateProbe, TlsProbe};
pub use rustls::Certificate;
pub use transport::{ReqwestTransport, Transport};
pub use verifier::{FingerprintVerifier, PinVerifier};
