//! Client configuration types.

use std::time::Duration;

use latch_core::ContentType;

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("latch/", env!("CARGO_PKG_VERSION"));

/// Configuration shared by the transport and the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Per-invocation timeout, used when a method declares none.
    pub timeout: Duration,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Headers sent with every request; interface and method headers override them.
    pub default_headers: Vec<(String, String)>,
    /// Content type for bodies and `Accept` when a method declares none.
    pub default_content_type: String,
    /// Extract every method binding when an interface is bound, rather than
    /// on first call.
    pub eager_binding: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_headers: Vec::new(),
            default_content_type: ContentType::Json.to_string(),
            eager_binding: true,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Headers every request starts with: `User-Agent`, then the defaults.
    #[must_use]
    pub fn base_headers(&self) -> Vec<(String, String)> {
        std::iter::once(("user-agent".to_string(), self.user_agent.clone()))
            .chain(self.default_headers.iter().cloned())
            .collect()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
    user_agent: Option<String>,
    default_headers: Vec<(String, String)>,
    default_content_type: Option<String>,
    eager_binding: Option<bool>,
}

impl ClientConfigBuilder {
    /// Set the default per-invocation timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Set the `User-Agent` header.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Set the content type used when a method declares none.
    #[must_use]
    pub fn default_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.default_content_type = Some(content_type.into());
        self
    }

    /// Choose between eager (at bind time) and lazy (first call) extraction.
    #[must_use]
    pub const fn eager_binding(mut self, eager: bool) -> Self {
        self.eager_binding = Some(eager);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            default_headers: self.default_headers,
            default_content_type: self
                .default_content_type
                .unwrap_or(defaults.default_content_type),
            eager_binding: self.eager_binding.unwrap_or(defaults.eager_binding),
        }
    }
}
