use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::TransportError;
use crate::gate::VerificationGate;
use crate::transport::Transport;

/// Callbacks handed to an interceptor. Exactly one of them should be called;
/// a handler dropped without either aborts the request with
/// [`TransportError::Abandoned`].
pub trait InterceptorHandler: Send {
    /// Pass the request on to the next stage.
    fn next(self: Box<Self>, request: Request<Bytes>);

    /// Stop the pipeline. The request never reaches the transport.
    fn reject(self: Box<Self>, error: TransportError);
}

/// A pre-send stage in a [`Pipeline`].
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn on_request(&self, request: Request<Bytes>, handler: Box<dyn InterceptorHandler>);
}

enum Decision {
    Continue(Request<Bytes>),
    Reject(TransportError),
}

struct StageHandler(oneshot::Sender<Decision>);

impl InterceptorHandler for StageHandler {
    fn next(self: Box<Self>, request: Request<Bytes>) {
        let _ = self.0.send(Decision::Continue(request));
    }

    fn reject(self: Box<Self>, error: TransportError) {
        let _ = self.0.send(Decision::Reject(error));
    }
}

/// Runs a request through each interceptor in order, then hands it to the
/// transport.
pub struct Pipeline<T> {
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    transport: T,
}

impl<T: Transport> Pipeline<T> {
    pub fn new(transport: T) -> Self {
        Self {
            interceptors: Vec::new(),
            transport,
        }
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let mut request = request;

        for interceptor in &self.interceptors {
            let (tx, rx) = oneshot::channel();
            interceptor
                .on_request(request, Box::new(StageHandler(tx)))
                .await;

            request = match rx.await {
                Ok(Decision::Continue(request)) => request,
                Ok(Decision::Reject(error)) => return Err(error),
                Err(_) => return Err(TransportError::Abandoned),
            };
        }

        self.transport.send(request).await
    }
}

#[async_trait]
impl<T: Transport> Transport for Pipeline<T> {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        Pipeline::send(self, request).await
    }
}

/// Pipeline stage that gates `https` requests on certificate verification.
pub struct CertificatePinningInterceptor {
    gate: VerificationGate,
}

impl CertificatePinningInterceptor {
    pub fn new(gate: VerificationGate) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &VerificationGate {
        &self.gate
    }

    pub fn clear_certificate_cache(&self) {
        self.gate.clear_cache();
    }

    /// Empties the certificate cache.
    pub fn close(&self) {
        self.gate.clear_cache();
    }
}

#[async_trait]
impl RequestInterceptor for CertificatePinningInterceptor {
    async fn on_request(&self, request: Request<Bytes>, handler: Box<dyn InterceptorHandler>) {
        let verified = self.gate.authorize_request(request.uri()).await;
        match verified {
            Ok(()) => handler.next(request),
            Err(error) => {
                debug!(uri = %request.uri(), "rejecting request");
                handler.reject(TransportError::Verification(error));
            }
        }
    }
}
