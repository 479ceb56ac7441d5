//! Dynamic dispatch from method names to HTTP calls.
//!
//! A [`Dispatcher`] binds an [`InterfaceDescription`] to a transport and
//! yields a [`BoundInterface`]: a cheap, cloneable handle whose
//! [`call`](BoundInterface::call) runs the whole pipeline for one
//! invocation (cached binding, argument binding, execution, decoding).
//!
//! # Example
//!
//! ```no_run
//! use latch::prelude::*;
//!
//! #[derive(Debug, serde::Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! # async fn run() -> latch::Result<()> {
//! let api = InterfaceDescription::new("UserApi")
//!     .method(MethodDescriptor::get("get_user", "/users/{id}").path_param("id"));
//!
//! let users = Dispatcher::new(HyperClient::new(), "https://api.example.com")?.bind(&api)?;
//! let user: User = users.call("get_user", args![42]).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use latch_core::{
    Args, BindingError, CodecRegistry, HttpClient, InterfaceDescription, MethodBinding,
    MethodDescriptor, RequestBinder, ResponseDecoder,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{ClientConfig, HyperClient, Result, executor::Executor};

/// Binds interface descriptions to a shared transport.
pub struct Dispatcher<C> {
    client: Arc<C>,
    base_url: String,
    codecs: Arc<CodecRegistry>,
    config: Arc<ClientConfig>,
}

impl<C> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.base_url)
            .field("codecs", &self.codecs)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            base_url: self.base_url.clone(),
            codecs: Arc::clone(&self.codecs),
            config: Arc::clone(&self.config),
        }
    }
}

impl Dispatcher<HyperClient> {
    /// Create a dispatcher over a [`HyperClient`] built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidUrl`] if `base_url` is not an absolute URL.
    pub fn from_config(base_url: &str, config: ClientConfig) -> Result<Self> {
        let client = HyperClient::with_config(config.clone());
        Ok(Self::new(client, base_url)?.with_config(config))
    }
}

impl<C: HttpClient> Dispatcher<C> {
    /// Create a dispatcher with the default codecs and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidUrl`] if `base_url` is not an absolute URL.
    pub fn new(client: C, base_url: &str) -> Result<Self> {
        url::Url::parse(base_url)?;
        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            codecs: Arc::new(CodecRegistry::default()),
            config: Arc::new(ClientConfig::default()),
        })
    }

    /// Replace the codec registry.
    ///
    /// The registry is frozen from here on.
    #[must_use]
    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = Arc::new(codecs);
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// The shared transport.
    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Base URL every path is resolved against, without trailing `/`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Bind an interface.
    ///
    /// With eager binding (the default) every method binding is extracted
    /// now; failures are logged and replayed by the failing method's calls.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::DuplicateMethod`] if two methods share a name.
    pub fn bind(&self, interface: &InterfaceDescription) -> Result<BoundInterface<C>> {
        let mut methods = HashMap::with_capacity(interface.methods().len());
        let mut order = Vec::with_capacity(interface.methods().len());

        for descriptor in interface.methods() {
            let slot = MethodSlot {
                descriptor: descriptor.clone(),
                binding: OnceLock::new(),
            };
            if methods.insert(descriptor.name().to_string(), slot).is_some() {
                return Err(BindingError::DuplicateMethod {
                    name: descriptor.name().to_string(),
                }
                .into());
            }
            order.push(descriptor.name().to_string());
        }

        let bound = BoundInterface {
            inner: Arc::new(BoundInner {
                name: interface.name().to_string(),
                interface_headers: interface.headers().to_vec(),
                base_headers: self.config.base_headers(),
                methods,
                order,
                base_url: self.base_url.clone(),
                codecs: Arc::clone(&self.codecs),
                config: Arc::clone(&self.config),
                executor: Executor::new(Arc::clone(&self.client), self.config.timeout),
            }),
        };

        if self.config.eager_binding {
            for name in &bound.inner.order {
                // failures are cached and logged by `resolve`
                let _ = bound.resolve(name);
            }
        }
        debug!(interface = %interface.name(), methods = bound.inner.order.len(), "interface bound");

        Ok(bound)
    }
}

struct MethodSlot {
    descriptor: MethodDescriptor,
    binding: OnceLock<std::result::Result<Arc<MethodBinding>, BindingError>>,
}

struct BoundInner<C> {
    name: String,
    interface_headers: Vec<(String, String)>,
    base_headers: Vec<(String, String)>,
    methods: HashMap<String, MethodSlot>,
    order: Vec<String>,
    base_url: String,
    codecs: Arc<CodecRegistry>,
    config: Arc<ClientConfig>,
    executor: Executor<C>,
}

/// A bound interface: the live dispatch table of one [`InterfaceDescription`].
///
/// Cloning is cheap and clones share the binding cache. Safe to call from
/// many tasks at once.
pub struct BoundInterface<C> {
    inner: Arc<BoundInner<C>>,
}

impl<C> Clone for BoundInterface<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> fmt::Debug for BoundInterface<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundInterface")
            .field("name", &self.inner.name)
            .field("methods", &self.inner.order)
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl<C: HttpClient> BoundInterface<C> {
    /// Interface name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Declared method names, in declaration order.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.inner.order.iter().map(String::as_str)
    }

    /// The cached binding of a method, extracting it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::UnknownMethod`] for an undeclared name, or the
    /// (cached) extraction failure.
    pub fn binding(&self, method: &str) -> std::result::Result<Arc<MethodBinding>, BindingError> {
        self.resolve(method)
    }

    /// Invoke a method.
    ///
    /// Runs cached binding, argument binding, one HTTP exchange and response
    /// decoding; the first failure is returned as is.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Binding`] for unknown methods, invalid descriptions or arguments
    /// - [`crate::Error::Codec`] when the body cannot be encoded or decoded
    /// - [`crate::Error::Transport`] when no response was obtained
    /// - [`crate::Error::Api`] for non-2xx statuses and unusable success bodies
    pub async fn call<T: DeserializeOwned>(&self, method: &str, args: Args) -> Result<T> {
        let inner = &*self.inner;
        let binding = self.resolve(method)?;

        let request = RequestBinder::new(&inner.base_url, &inner.codecs)
            .default_content_type(&inner.config.default_content_type)
            .default_headers(&inner.base_headers)
            .bind(&binding, args)?;

        let response = inner.executor.execute(request).await?;

        ResponseDecoder::new(&inner.codecs)
            .default_content_type(&inner.config.default_content_type)
            .decode(response, &binding)
    }

    fn resolve(&self, method: &str) -> std::result::Result<Arc<MethodBinding>, BindingError> {
        let inner = &*self.inner;
        let slot = inner
            .methods
            .get(method)
            .ok_or_else(|| BindingError::UnknownMethod {
                name: method.to_string(),
            })?;

        slot.binding
            .get_or_init(|| {
                let result = MethodBinding::extract(&slot.descriptor, &inner.interface_headers);
                match &result {
                    Ok(binding) => debug!(
                        interface = %inner.name,
                        method,
                        verb = %binding.method(),
                        path = %binding.template(),
                        "method bound"
                    ),
                    Err(error) => warn!(
                        interface = %inner.name,
                        method,
                        %error,
                        "method binding failed"
                    ),
                }
                result.map(Arc::new)
            })
            .clone()
    }
}
