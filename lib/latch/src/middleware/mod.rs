//! Tower middleware layers for the latch HTTP transport.
//!
//! Every layer wraps a `Service<Request, Response = Response, Error =
//! TransportError>`, so layers compose freely through
//! [`crate::HyperClientBuilder::layer`] or a [`ServiceBuilder`].
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `middleware-retry` | `.with_retry()` helper |
//! | `middleware-logging` | `.with_logging()` helper |
//! | `middleware-bearer-auth` | `.with_bearer_auth()` helper |
//! | `middleware-basic-auth` | [`BasicAuthLayer`] and `.with_basic_auth()` |
//! | `middleware-concurrency` | `.with_concurrency_limit()` helper |
//! | `middleware-follow-redirect` | `.with_follow_redirects()` helper |
//! | `middleware-core` | All of the above |
//!
//! # Available Layers
//!
//! - [`BearerAuthLayer`] - adds `Authorization: Bearer <token>`
//! - `BasicAuthLayer` - adds `Authorization: Basic <base64>`
//! - [`LoggingLayer`] - logs exchanges with `tracing`
//! - [`RetryPolicy`] - transient-failure policy for [`RetryLayer`]
//! - [`ConcurrencyLimitLayer`] - bounds in-flight requests
//! - [`FollowRedirectLayer`] - follows `3xx` responses to their `Location`

mod auth;
mod follow_redirect;
mod logging;
mod retry;

#[cfg(feature = "middleware-basic-auth")]
pub use auth::BasicAuthLayer;
pub use auth::{Authorize, BearerAuthLayer};
pub use follow_redirect::{DEFAULT_MAX_REDIRECTS, FollowRedirect, FollowRedirectLayer};
pub use logging::{LogLevel, Logging, LoggingLayer};
pub use retry::RetryPolicy;

pub use tower::limit::ConcurrencyLimitLayer;
pub use tower::retry::RetryLayer;
pub use tower::{Layer, ServiceBuilder};
