//! Retry policy for `tower::retry`.
//!
//! The executor never retries on its own; install this policy to retry
//! transient failures.

use std::future;

use tower::retry::Policy;

use crate::{Request, Response, TransportError, TransportErrorKind};

/// Retries transient failures a bounded number of times.
///
/// Retried outcomes:
/// - connection, DNS and timeout transport errors
/// - 429, 502, 503 and 504 responses
///
/// Only idempotent methods are retried unless
/// [`RetryPolicy::retry_non_idempotent`] is set.
///
/// # Example
///
/// ```
/// use latch::HyperClient;
/// use latch::middleware::{RetryLayer, RetryPolicy};
///
/// let client = HyperClient::builder()
///     .layer(RetryLayer::new(RetryPolicy::new(3)))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    remaining: u32,
    non_idempotent: bool,
}

impl RetryPolicy {
    /// Create a policy allowing `max_retries` retries per request.
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self {
            remaining: max_retries,
            non_idempotent: false,
        }
    }

    /// Also retry POST and PATCH requests.
    #[must_use]
    pub const fn retry_non_idempotent(mut self) -> Self {
        self.non_idempotent = true;
        self
    }

    fn is_transient_status(status: u16) -> bool {
        matches!(status, 429 | 502 | 503 | 504)
    }

    fn is_transient_error(error: &TransportError) -> bool {
        matches!(
            error.kind(),
            TransportErrorKind::Connect | TransportErrorKind::Dns | TransportErrorKind::Timeout
        )
    }
}

impl Policy<Request, Response, TransportError> for RetryPolicy {
    type Future = future::Ready<()>;

    fn retry(
        &mut self,
        request: &mut Request,
        result: &mut Result<Response, TransportError>,
    ) -> Option<Self::Future> {
        if self.remaining == 0 || !(self.non_idempotent || request.method().is_idempotent()) {
            return None;
        }

        let transient = match result {
            Ok(response) => Self::is_transient_status(response.status()),
            Err(error) => Self::is_transient_error(error),
        };
        if !transient {
            return None;
        }

        self.remaining -= 1;
        tracing::debug!(remaining = self.remaining, url = %request.url(), "retrying request");
        Some(future::ready(()))
    }

    fn clone_request(&mut self, request: &Request) -> Option<Request> {
        Some(request.clone())
    }
}
