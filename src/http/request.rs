//! Request ID assignment.
//!
//! # Responsibilities
//! - Reuse a client-supplied `x-request-id` or generate a UUID v4
//! - Expose the ID to handlers through request extensions
//! - Wrap the request in a span so every log line carries the ID
//! - Echo the ID on the response
//!
//! The ID stays between client and proxy; the header sanitizer strips it
//! before anything is sent upstream.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::response::Response;
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// IDs longer than this are replaced rather than trusted.
const MAX_CLIENT_ID_LEN: usize = 128;

/// The request's correlation ID, available via `request.extensions()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Convenience accessor for handlers holding a raw request.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for axum::http::Request<B> {
    fn request_id(&self) -> &str {
        self.extensions()
            .get::<RequestId>()
            .map(RequestId::as_str)
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S> Service<Request> for RequestIdService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let id = req
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty() && v.len() <= MAX_CLIENT_ID_LEN)
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let header_value = HeaderValue::from_str(&id).ok();
        let span = tracing::info_span!("request", request_id = %id);
        req.extensions_mut().insert(RequestId(id));

        let future = self.inner.call(req);

        Box::pin(
            async move {
                let mut result = future.await;
                if let (Ok(response), Some(value)) = (result.as_mut(), header_value) {
                    response.headers_mut().insert(X_REQUEST_ID, value);
                }
                result
            }
            .instrument(span),
        )
    }
}
