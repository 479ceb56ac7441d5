//! Authorization middleware.
//!
//! Both layers add an `Authorization` header to requests that do not carry
//! one yet, so a per-call HEADER argument named `Authorization` wins.

use std::sync::Arc;
use std::task::{Context, Poll};

#[cfg(feature = "middleware-basic-auth")]
use base64::Engine;
use tower::{Layer, Service};

use crate::{Request, TransportError};

/// Layer adding `Authorization: Bearer <token>`.
///
/// # Example
///
/// ```
/// use latch::HyperClient;
/// use latch::middleware::BearerAuthLayer;
///
/// let client = HyperClient::builder()
///     .layer(BearerAuthLayer::new("my-secret-token"))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct BearerAuthLayer {
    value: Arc<str>,
}

impl BearerAuthLayer {
    /// Create a bearer auth layer for `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            value: Arc::from(format!("Bearer {}", token.into())),
        }
    }
}

impl<S> Layer<S> for BearerAuthLayer {
    type Service = Authorize<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Authorize {
            inner,
            value: Arc::clone(&self.value),
        }
    }
}

/// Layer adding `Authorization: Basic <base64(username:password)>`.
#[cfg(feature = "middleware-basic-auth")]
#[derive(Debug, Clone)]
pub struct BasicAuthLayer {
    value: Arc<str>,
}

#[cfg(feature = "middleware-basic-auth")]
impl BasicAuthLayer {
    /// Create a basic auth layer for the given credentials.
    #[must_use]
    pub fn new(username: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        let credentials = format!("{}:{}", username.as_ref(), password.as_ref());
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        Self {
            value: Arc::from(format!("Basic {encoded}")),
        }
    }
}

#[cfg(feature = "middleware-basic-auth")]
impl<S> Layer<S> for BasicAuthLayer {
    type Service = Authorize<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Authorize {
            inner,
            value: Arc::clone(&self.value),
        }
    }
}

/// Service setting the `Authorization` header when absent.
#[derive(Debug, Clone)]
pub struct Authorize<S> {
    inner: S,
    value: Arc<str>,
}

impl<S> Service<Request> for Authorize<S>
where
    S: Service<Request, Error = TransportError>,
{
    type Response = S::Response;
    type Error = TransportError;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), TransportError>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        if !request.has_header("authorization") {
            request.set_header("authorization", &*self.value);
        }
        self.inner.call(request)
    }
}
