//! Single-attempt request execution.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{Instrument, debug, debug_span, warn};

use crate::{HttpClient, Request, Response, TransportError};

/// Hands requests to an [`HttpClient`] under a per-invocation timeout.
///
/// Exactly one attempt is made; retrying belongs to middleware.
#[derive(Debug)]
pub struct Executor<C> {
    client: Arc<C>,
    default_timeout: Duration,
}

impl<C> Clone for Executor<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            default_timeout: self.default_timeout,
        }
    }
}

impl<C: HttpClient> Executor<C> {
    /// Create an executor; `default_timeout` applies to requests without one.
    #[must_use]
    pub fn new(client: Arc<C>, default_timeout: Duration) -> Self {
        Self {
            client,
            default_timeout,
        }
    }

    /// The wrapped client.
    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Execute one request.
    ///
    /// # Errors
    ///
    /// Returns the client's [`TransportError`], or a timeout error when the
    /// invocation outlives its timeout.
    pub async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let timeout = request.timeout().unwrap_or(self.default_timeout);
        let span = debug_span!(
            "latch.execute",
            method = %request.method(),
            url = %request.url(),
        );

        async move {
            let start = Instant::now();
            let result = tokio::time::timeout(timeout, self.client.execute(request)).await;
            let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match result {
                Ok(Ok(response)) => {
                    debug!(status = response.status(), elapsed_ms, "response received");
                    Ok(response)
                }
                Ok(Err(error)) => {
                    warn!(%error, elapsed_ms, "request failed");
                    Err(error)
                }
                Err(_) => {
                    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                    warn!(timeout_ms, "request timed out");
                    Err(TransportError::timeout())
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert2::{check, let_assert};
    use latch_core::{Method, TransportErrorKind};

    use super::*;

    struct SlowClient {
        delay: Duration,
        calls: AtomicUsize,
    }

    impl HttpClient for SlowClient {
        async fn execute(&self, _request: Request) -> Result<Response, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(Response::new(200, HashMap::new(), "ok"))
        }
    }

    fn request(timeout: Option<Duration>) -> Request {
        let url = url::Url::parse("http://localhost/slow").expect("valid URL");
        Request::builder(Method::Get, url).timeout(timeout).build()
    }

    fn executor(delay: Duration) -> Executor<SlowClient> {
        let client = SlowClient {
            delay,
            calls: AtomicUsize::new(0),
        };
        Executor::new(Arc::new(client), Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn completes_within_timeout() {
        let executor = executor(Duration::from_millis(100));
        let response = executor.execute(request(None)).await.expect("response");
        check!(response.status() == 200);
    }

    #[tokio::test(start_paused = true)]
    async fn request_timeout_overrides_default() {
        let executor = executor(Duration::from_secs(2));
        let result = executor.execute(request(Some(Duration::from_secs(1)))).await;

        let_assert!(Err(error) = result);
        check!(error.kind() == TransportErrorKind::Timeout);
        check!(executor.client().calls.load(Ordering::SeqCst) == 1);
    }

    #[tokio::test(start_paused = true)]
    async fn default_timeout_applies() {
        let executor = executor(Duration::from_secs(10));
        let_assert!(Err(error) = executor.execute(request(None)).await);
        check!(error.kind() == TransportErrorKind::Timeout);
    }
}
