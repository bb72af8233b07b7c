use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request, Response, Uri};
use parking_lot::RwLock;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::error::TransportError;
use crate::gate::VerificationGate;
use crate::transport::Transport;

/// HTTP client wrapper that refuses to send an `https` request until the
/// gate has verified the endpoint's certificate.
pub struct PinnedClient<T> {
    gate: VerificationGate,
    inner: RwLock<Option<Arc<T>>>,
    shutdown: CancellationToken,
}

impl<T: Transport> PinnedClient<T> {
    pub fn new(inner: T, gate: VerificationGate) -> Self {
        Self {
            gate,
            inner: RwLock::new(Some(Arc::new(inner))),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn gate(&self) -> &VerificationGate {
        &self.gate
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// In-flight requests that already passed the gate are unaffected.
    pub fn clear_certificate_cache(&self) {
        self.gate.clear_cache();
    }

    /// Aborts gate work still in progress, drops the inner transport and
    /// empties the cache. Calling it again does nothing.
    pub fn close(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();
        self.inner.write().take();
        self.gate.clear_cache();
        debug!("pinned client closed");
    }

    pub async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let inner = self.inner.read().clone().ok_or(TransportError::Closed)?;
        let span = info_span!("pinned_send", request_id = %Uuid::new_v4(), uri = %request.uri());

        async move {
            select! {
                _ = self.shutdown.cancelled() => return Err(TransportError::Closed),
                verified = self.gate.authorize_request(request.uri()) => verified?,
            }
            inner.send(request).await
        }
        .instrument(span)
        .await
    }

    pub async fn get<U>(&self, uri: U) -> Result<Response<Bytes>, TransportError>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        self.execute(Method::GET, uri, Bytes::new()).await
    }

    pub async fn head<U>(&self, uri: U) -> Result<Response<Bytes>, TransportError>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        self.execute(Method::HEAD, uri, Bytes::new()).await
    }

    pub async fn delete<U>(&self, uri: U) -> Result<Response<Bytes>, TransportError>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        self.execute(Method::DELETE, uri, Bytes::new()).await
    }

    pub async fn options<U>(&self, uri: U) -> Result<Response<Bytes>, TransportError>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        self.execute(Method::OPTIONS, uri, Bytes::new()).await
    }

    pub async fn post<U, B>(&self, uri: U, body: B) -> Result<Response<Bytes>, TransportError>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
        B: Into<Bytes>,
    {
        self.execute(Method::POST, uri, body.into()).await
    }

    pub async fn put<U, B>(&self, uri: U, body: B) -> Result<Response<Bytes>, TransportError>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
        B: Into<Bytes>,
    {
        self.execute(Method::PUT, uri, body.into()).await
    }

    pub async fn patch<U, B>(&self, uri: U, body: B) -> Result<Response<Bytes>, TransportError>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
        B: Into<Bytes>,
    {
        self.execute(Method::PATCH, uri, body.into()).await
    }

    async fn execute<U>(
        &self,
        method: Method,
        uri: U,
        body: Bytes,
    ) -> Result<Response<Bytes>, TransportError>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        let request = Request::builder().method(method).uri(uri).body(body)?;
        self.send(request).await
    }
}

#[async_trait]
impl<T: Transport> Transport for PinnedClient<T> {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        PinnedClient::send(self, request).await
    }
}
