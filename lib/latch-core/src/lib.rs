//! Core types for the latch declarative HTTP client.
//!
//! This crate holds everything that does not touch the network:
//! - [`InterfaceDescription`] and [`MethodDescriptor`] - declaring an interface
//! - [`MethodBinding`] - a validated, cached method binding
//! - [`PathTemplate`] - parsed `{placeholder}` path templates
//! - [`Args`] and [`args!`] - call arguments
//! - [`RequestBinder`] - arguments to [`Request`]
//! - [`CodecRegistry`] - content-type keyed serializers and deserializers
//! - [`ResponseDecoder`] - [`Response`] to a typed result or an [`ApiError`]
//! - [`HttpClient`] - the transport seam
//! - [`Error`] and its families
//!
//! The `latch` crate adds the hyper transport, middleware and the dispatcher.

mod args;
mod binder;
mod binding;
mod client;
pub mod codec;
mod decoder;
mod error;
mod method;
mod multipart;
mod param;
mod path_template;
pub mod prelude;
mod request;
mod response;
mod text_value;

pub use args::Args;
pub use binder::RequestBinder;
pub use binding::{ErrorType, InterfaceDescription, MethodBinding, MethodDescriptor, ReturnKind};
pub use client::HttpClient;
pub use codec::{
    BinaryCodec, BodyDeserializer, BodySerializer, CodecEntry, CodecRegistry, ContentType,
    FilePart, FormCodec, JsonCodec, MultipartCodec, TextCodec,
};
pub use decoder::ResponseDecoder;
pub use error::{
    ApiError, BindingError, CodecError, Error, ErrorBody, ErrorPayload, Result, TransportError,
    TransportErrorKind,
};
pub use method::Method;
pub use param::{CollectionFormat, ParamRole, ParamSpec};
pub use path_template::{PATH_SEGMENT_ENCODE_SET, PathTemplate, Segment};
pub use request::{Request, RequestBuilder};
pub use response::Response;

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
