//! Follow redirect middleware.
//!
//! Follows `301`, `302`, `303`, `307` and `308` responses carrying a
//! `Location` header, up to a configurable number of hops. The final
//! non-redirect response is what the dispatcher decodes.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::{Layer, Service, ServiceExt};
use url::Url;

use crate::{Method, Request, Response, TransportError};

/// Default maximum number of redirects to follow.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Layer that follows HTTP redirects.
///
/// # Example
///
/// ```
/// use latch::HyperClient;
/// use latch::middleware::FollowRedirectLayer;
///
/// let client = HyperClient::builder()
///     .layer(FollowRedirectLayer::with_max_redirects(3))
///     .build();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FollowRedirectLayer {
    max_redirects: usize,
}

impl Default for FollowRedirectLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl FollowRedirectLayer {
    /// Follow up to [`DEFAULT_MAX_REDIRECTS`] redirects.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Follow up to `max_redirects` redirects.
    #[must_use]
    pub const fn with_max_redirects(max_redirects: usize) -> Self {
        Self { max_redirects }
    }
}

impl<S> Layer<S> for FollowRedirectLayer {
    type Service = FollowRedirect<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FollowRedirect {
            inner,
            max_redirects: self.max_redirects,
        }
    }
}

/// Service that follows HTTP redirects.
#[derive(Debug, Clone)]
pub struct FollowRedirect<S> {
    inner: S,
    max_redirects: usize,
}

const fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// `307` and `308` keep the method and body; the others switch to `GET`,
/// except for `HEAD` which stays `HEAD`.
fn redirect_method(status: u16, original: Method) -> Method {
    match (status, original) {
        (307 | 308, _) | (_, Method::Head) => original,
        _ => Method::Get,
    }
}

fn resolve_location(base: &Url, location: &str) -> Result<Url, TransportError> {
    base.join(location)
        .map_err(|err| TransportError::redirect(format!("invalid Location '{location}': {err}")))
}

/// The request for the next hop.
///
/// The body and its content type are dropped when the method changes to
/// `GET`; credentials are dropped when the redirect leaves the origin.
fn next_request(
    request: Request,
    status: u16,
    location: &str,
) -> Result<Request, TransportError> {
    let timeout = request.timeout();
    let url = resolve_location(request.url(), location)?;
    let same_origin = url.origin() == request.url().origin();
    let method = redirect_method(status, request.method());
    let keep_body = method == request.method();

    let (_, _, headers, body) = request.into_parts();
    let headers = headers.iter().filter(|(name, _)| {
        let name = name.as_str();
        (keep_body || !matches!(name, "content-type" | "content-length"))
            && (same_origin || name != "authorization")
    });

    let mut builder = Request::builder(method, url)
        .headers(headers.map(|(name, value)| (name.as_str(), value.clone())))
        .timeout(timeout);
    if let Some(body) = body.filter(|_| keep_body) {
        builder = builder.body(body);
    }
    Ok(builder.build())
}

impl<S> Service<Request> for FollowRedirect<S>
where
    S: Service<Request, Response = Response, Error = TransportError> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<Response, TransportError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), TransportError>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let max_redirects = self.max_redirects;

        Box::pin(async move {
            let mut current = request;
            let mut redirects = 0;

            loop {
                let response = inner.ready().await?.call(current.clone()).await?;
                if !is_redirect(response.status()) {
                    return Ok(response);
                }
                if redirects >= max_redirects {
                    return Err(TransportError::redirect(format!(
                        "too many redirects (max {max_redirects})"
                    )));
                }

                let Some(location) = response.header("location") else {
                    return Err(TransportError::redirect(format!(
                        "{} response without a Location header",
                        response.status()
                    )));
                };
                tracing::debug!(status = response.status(), %location, "following redirect");
                current = next_request(current, response.status(), location)?;
                redirects += 1;
            }
        })
    }
}
