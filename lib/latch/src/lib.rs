//! Declarative HTTP client bindings for Rust.
//!
//! Describe an HTTP API as data (verbs, path templates, parameter roles),
//! bind it once, then call its methods by name. Bindings are validated and
//! cached per method; each call binds fresh arguments, performs one HTTP
//! exchange through a pluggable transport, and decodes the response through
//! content-type keyed codecs.
//!
//! # Example
//!
//! ```no_run
//! use latch::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! pub struct Todo {
//!     id: u64,
//!     title: String,
//! }
//!
//! #[derive(Debug, Deserialize)]
//! pub struct Problem {
//!     message: String,
//! }
//!
//! # async fn run() -> latch::Result<()> {
//! let description = InterfaceDescription::new("TodoApi")
//!     .method(
//!         MethodDescriptor::get("get_todo", "/todos/{id}")
//!             .path_param("id")
//!             .error::<Problem>(),
//!     )
//!     .method(MethodDescriptor::get("list_todos", "/todos").query_param("done"));
//!
//! let todos = Dispatcher::new(HyperClient::new(), "https://todo.example.com")?.bind(&description)?;
//!
//! let todo: Todo = todos.call("get_todo", args![1]).await?;
//! let open: Vec<Todo> = todos.call("list_todos", args![false]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Wrap a [`BoundInterface`] in your own type to expose a typed API; the
//! `todo-api` demo shows the pattern.

mod client;
mod config;
mod connector;
mod dispatcher;
mod executor;
pub mod middleware;
pub mod prelude;

pub use client::{BoxedService, HyperClient, HyperClientBuilder, ServiceFuture};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_USER_AGENT};
pub use dispatcher::{BoundInterface, Dispatcher};
pub use executor::Executor;

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use latch_core::{
    ApiError, Args, BinaryCodec, BindingError, BodyDeserializer, BodySerializer, CodecEntry,
    CodecError, CodecRegistry, CollectionFormat, ContentType, Error, ErrorBody, ErrorPayload,
    ErrorType, FilePart, FormCodec, HttpClient, InterfaceDescription, JsonCodec, Method,
    MethodBinding, MethodDescriptor, MultipartCodec, ParamRole, ParamSpec, PathTemplate, Request,
    RequestBinder, RequestBuilder, Response, ResponseDecoder, Result, ReturnKind, Segment,
    TextCodec, TransportError, TransportErrorKind, args, codec,
};

// Re-export http types for status codes and headers
pub use latch_core::{StatusCode, header};

pub use url;
