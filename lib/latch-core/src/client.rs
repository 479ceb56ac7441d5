//! The transport seam.
//!
//! [`HttpClient`] executes one already-bound [`Request`]. The dispatcher is
//! generic over it, so tests and middleware stacks plug in here.

use std::future::Future;
use std::sync::Arc;

use crate::{Request, Response, TransportError};

/// Core HTTP client trait.
///
/// Implementations perform exactly one HTTP exchange per call, buffer the
/// response body, and must be safe to share across concurrent invocations.
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request and return the response.
    ///
    /// Any HTTP status, including 4xx and 5xx, is a successful response
    /// at this level.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no response was obtained: connection,
    /// DNS, TLS, body read or timeout failures.
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;
}

impl<C: HttpClient> HttpClient for Arc<C> {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send {
        (**self).execute(request)
    }
}
