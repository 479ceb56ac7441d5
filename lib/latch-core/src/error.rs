//! Error types for latch.
//!
//! Every failure belongs to one of four families:
//! - [`BindingError`] - the method description or the call arguments cannot
//!   form a request (programmer or configuration error)
//! - [`CodecError`] - no codec for a content type, or a payload that cannot be
//!   encoded or decoded
//! - [`TransportError`] - the request never produced an HTTP response
//! - [`ApiError`] - the server answered, but not with what the method declared
//!
//! [`Error`] wraps all of them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use derive_more::{Display, Error, From};

// ============================================================================
// Binding Errors
// ============================================================================

/// Errors raised while extracting a [`crate::MethodBinding`] or binding call
/// arguments to it.
///
/// Binding errors are cached by the dispatcher and replayed on every call, so
/// the type is `Clone` and comparable.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum BindingError {
    /// The path template cannot be parsed.
    #[display("malformed path template '{template}': {reason}")]
    MalformedTemplate {
        /// The offending template.
        template: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A placeholder has no PATH parameter bound to it.
    #[display("placeholder '{name}' has no matching path parameter")]
    UnboundPlaceholder {
        /// Placeholder name.
        name: String,
    },

    /// A PATH parameter names a placeholder absent from the template.
    #[display("path parameter '{name}' does not appear in the path template")]
    UnknownPathParameter {
        /// Parameter name.
        name: String,
    },

    /// Two PATH parameters bind the same placeholder.
    #[display("placeholder '{name}' is bound by more than one path parameter")]
    DuplicatePathParameter {
        /// Placeholder name.
        name: String,
    },

    /// More than one parameter claims the BODY role.
    #[display("parameters '{first}' and '{second}' both claim the request body")]
    MultipleBodies {
        /// First body parameter.
        first: String,
        /// Second body parameter.
        second: String,
    },

    /// A header name is not a legal HTTP header name.
    #[display("invalid header name '{name}'")]
    InvalidHeaderName {
        /// The rejected name.
        name: String,
    },

    /// A header value is not a legal HTTP header value.
    #[display("invalid value for header '{name}'")]
    InvalidHeaderValue {
        /// Header name.
        name: String,
    },

    /// A PATH argument is absent or empty.
    #[display("path parameter '{name}' is absent")]
    NullPathValue {
        /// Parameter name.
        name: String,
    },

    /// A PATH argument is a `.` or `..` segment, which URL parsing would
    /// resolve against the template's literal segments.
    #[display("path parameter '{name}' cannot be the dot segment '{value}'")]
    DotPathSegment {
        /// Parameter name.
        name: String,
        /// The rejected value.
        value: String,
    },

    /// The request content type has no registered serializer.
    #[display("no serializer registered for content type '{content_type}'")]
    UnsupportedContentType {
        /// Request content type.
        content_type: String,
    },

    /// The call passed the wrong number of arguments.
    #[display("expected {expected} arguments, got {actual}")]
    ArgumentCount {
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
    },

    /// An argument cannot be rendered into a path, query or header value.
    #[display("argument '{name}' cannot be rendered as a {role} value")]
    UnsupportedArgument {
        /// Parameter name.
        name: String,
        /// Role the parameter was declared with.
        role: crate::ParamRole,
    },

    /// The bound interface declares no method with this name.
    #[display("unknown method '{name}'")]
    UnknownMethod {
        /// Requested method name.
        name: String,
    },

    /// The interface declares two methods with the same name.
    #[display("method '{name}' is declared more than once")]
    DuplicateMethod {
        /// Method name.
        name: String,
    },
}

// ============================================================================
// Codec Errors
// ============================================================================

/// Errors raised by the codec registry and the codecs it holds.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum CodecError {
    /// No serializer registered for the content type.
    #[display("no serializer for content type '{content_type}'")]
    NoSerializer {
        /// Requested content type.
        content_type: String,
    },

    /// No deserializer registered for the content type.
    #[display("no deserializer for content type '{content_type}'")]
    NoDeserializer {
        /// Requested content type.
        content_type: String,
    },

    /// A value could not be encoded.
    #[display("failed to encode {content_type} payload: {message}")]
    EncodeFailed {
        /// Target content type.
        content_type: String,
        /// Underlying cause.
        message: String,
    },

    /// A payload could not be decoded into the requested type.
    #[display("failed to decode {content_type} payload at '{path}': {message}")]
    DecodeFailed {
        /// Source content type.
        content_type: String,
        /// Path to the failing field (e.g. `user.address.city`), `.` for the root.
        path: String,
        /// Underlying cause.
        message: String,
    },
}

impl CodecError {
    /// Create an encoding failure.
    #[must_use]
    pub fn encode_failed(content_type: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::EncodeFailed {
            content_type: content_type.into(),
            message: message.to_string(),
        }
    }

    /// Create a decoding failure without path context.
    #[must_use]
    pub fn decode_failed(content_type: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::DecodeFailed {
            content_type: content_type.into(),
            path: ".".to_string(),
            message: message.to_string(),
        }
    }
}

// ============================================================================
// Transport Errors
// ============================================================================

/// Category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TransportErrorKind {
    /// The connection could not be established.
    #[display("connection")]
    Connect,
    /// The host name could not be resolved.
    #[display("DNS")]
    Dns,
    /// The invocation timed out.
    #[display("timeout")]
    Timeout,
    /// TLS handshake or certificate failure.
    #[display("TLS")]
    Tls,
    /// The response body could not be read.
    #[display("body")]
    Body,
    /// The transport rejected the request before sending it.
    #[display("invalid request")]
    InvalidRequest,
    /// A redirect chain was broken or exceeded its limit.
    #[display("redirect")]
    Redirect,
}

/// The request did not produce an HTTP response.
///
/// Transport errors are transient by nature; retrying is the caller's
/// decision (see the retry middleware), never the executor's.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("{kind} error: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    /// Create a transport error of the given kind.
    #[must_use]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    /// Create a DNS resolution error.
    #[must_use]
    pub fn dns(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Dns, message)
    }

    /// Create a timeout error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::new(TransportErrorKind::Timeout, "request timed out")
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Tls, message)
    }

    /// Create a body read error.
    #[must_use]
    pub fn body(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Body, message)
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::InvalidRequest, message)
    }

    /// Create a redirect error.
    #[must_use]
    pub fn redirect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Redirect, message)
    }

    /// The failure category.
    #[must_use]
    pub const fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Description of the underlying cause.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

// ============================================================================
// API Errors
// ============================================================================

/// A decoded error payload.
///
/// Implemented for every `Debug + Send + Sync + 'static` type, so any type
/// declared as a method's error type can be stored and later downcast with
/// [`ApiError::decoded`].
pub trait ErrorBody: Any + fmt::Debug + Send + Sync {
    /// Upcast for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug + Send + Sync> ErrorBody for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Body of a non-2xx response.
#[derive(Debug, Clone)]
pub enum ErrorPayload {
    /// The body decoded into the method's declared error type.
    Decoded(Arc<dyn ErrorBody>),
    /// The raw body, when no error type is declared or decoding failed.
    Raw(Bytes),
}

/// The server answered, but not with what the method declared.
#[derive(Debug, Clone, Display, Error)]
pub enum ApiError {
    /// Non-2xx status.
    #[display("HTTP error {status}")]
    Http {
        /// HTTP status code, never masked.
        status: u16,
        /// Decoded or raw error body.
        #[error(not(source))]
        payload: ErrorPayload,
    },

    /// 2xx with an empty body while the method declares a return value.
    #[display("empty response body (status {status}) for a method returning a value")]
    EmptyBodyForNonVoid {
        /// HTTP status code.
        status: u16,
    },

    /// 2xx whose content type has no registered deserializer.
    #[display("unsupported response content type '{content_type}' (status {status})")]
    UnsupportedResponseType {
        /// HTTP status code.
        status: u16,
        /// Response content type.
        content_type: String,
    },
}

impl ApiError {
    /// HTTP status code of the response.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Http { status, .. }
            | Self::EmptyBodyForNonVoid { status }
            | Self::UnsupportedResponseType { status, .. } => *status,
        }
    }

    /// The error payload downcast to the declared error type.
    ///
    /// Returns `None` for raw payloads, for non-HTTP variants, or when `E` is
    /// not the declared error type.
    #[must_use]
    pub fn decoded<E: Any>(&self) -> Option<&E> {
        match self {
            Self::Http {
                payload: ErrorPayload::Decoded(body),
                ..
            } => ErrorBody::as_any(&**body).downcast_ref::<E>(),
            _ => None,
        }
    }

    /// The raw error body, when the payload was not decoded.
    #[must_use]
    pub fn raw_body(&self) -> Option<&Bytes> {
        match self {
            Self::Http {
                payload: ErrorPayload::Raw(body),
                ..
            } => Some(body),
            _ => None,
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for latch operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Invalid method description or call arguments.
    #[display("binding error: {_0}")]
    #[from]
    Binding(BindingError),

    /// Codec lookup, encoding or decoding failure.
    #[display("codec error: {_0}")]
    #[from]
    Codec(CodecError),

    /// No HTTP response was obtained.
    #[display("transport error: {_0}")]
    #[from]
    Transport(TransportError),

    /// Unsuccessful HTTP outcome.
    #[display("API error: {_0}")]
    #[from]
    Api(ApiError),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns `true` if this is a transport timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.kind() == TransportErrorKind::Timeout)
    }

    /// Returns `true` if this is a connection or DNS failure.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Transport(e)
                if matches!(e.kind(), TransportErrorKind::Connect | TransportErrorKind::Dns)
        )
    }

    /// Returns the HTTP status code if the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api(e) => Some(e.status()),
            _ => None,
        }
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }

    /// Returns `true` if this is a 404 Not Found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns the API error, if any.
    #[must_use]
    pub const fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the binding error, if any.
    #[must_use]
    pub const fn as_binding(&self) -> Option<&BindingError> {
        match self {
            Self::Binding(e) => Some(e),
            _ => None,
        }
    }
}
