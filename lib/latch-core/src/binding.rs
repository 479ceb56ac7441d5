//! Method descriptions and their validated bindings.
//!
//! A [`MethodDescriptor`] is what callers write: verb, path template and
//! parameter roles, in declaration order. [`MethodBinding::extract`]
//! validates it once and produces the immutable [`MethodBinding`] reused by
//! every call.
//!
//! # Example
//!
//! ```
//! use latch_core::{InterfaceDescription, MethodBinding, MethodDescriptor};
//!
//! #[derive(Debug, serde::Deserialize)]
//! struct Problem { message: String }
//!
//! let api = InterfaceDescription::new("UserApi")
//!     .header("X-Api-Version", "2")
//!     .method(
//!         MethodDescriptor::get("get_user", "/users/{id}")
//!             .path_param("id")
//!             .query_param("fields")
//!             .error::<Problem>(),
//!     );
//!
//! let binding = MethodBinding::extract(&api.methods()[0], api.headers()).expect("valid");
//! assert_eq!(binding.params().len(), 2);
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::codec::typed_value;
use crate::{
    BindingError, BodyDeserializer, CodecError, CollectionFormat, ErrorBody, Method, ParamRole,
    ParamSpec, PathTemplate,
};

/// What a method returns on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnKind {
    /// Nothing: the body is ignored.
    Unit,
    /// A value decoded from the response body.
    Value,
}

type DecodeErrorBody =
    fn(&dyn BodyDeserializer, &str, Value) -> Result<Arc<dyn ErrorBody>, CodecError>;

fn decode_error_body<E>(
    deserializer: &dyn BodyDeserializer,
    content_type: &str,
    value: Value,
) -> Result<Arc<dyn ErrorBody>, CodecError>
where
    E: serde::de::DeserializeOwned + ErrorBody,
{
    let body: E = typed_value(deserializer, content_type, value)?;
    Ok(Arc::new(body))
}

/// A method's declared error type.
///
/// Non-2xx bodies are decoded into it; the result is retrieved with
/// [`crate::ApiError::decoded`].
#[derive(Clone, Copy)]
pub struct ErrorType {
    name: &'static str,
    decode: DecodeErrorBody,
}

impl ErrorType {
    /// Declare `E` as the error type.
    #[must_use]
    pub fn of<E>() -> Self
    where
        E: serde::de::DeserializeOwned + ErrorBody,
    {
        Self {
            name: std::any::type_name::<E>(),
            decode: decode_error_body::<E>,
        }
    }

    /// Type name of the declared error type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Convert a payload decoded by `deserializer` into the declared error type.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::DecodeFailed`] if the payload does not fit.
    pub fn decode(
        &self,
        deserializer: &dyn BodyDeserializer,
        content_type: &str,
        value: Value,
    ) -> Result<Arc<dyn ErrorBody>, CodecError> {
        (self.decode)(deserializer, content_type, value)
    }
}

impl fmt::Debug for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorType").field(&self.name).finish()
    }
}

impl PartialEq for ErrorType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Declarative description of one interface method.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    name: String,
    method: Method,
    path: String,
    params: Vec<ParamSpec>,
    returns: ReturnKind,
    error_type: Option<ErrorType>,
    content_type: Option<String>,
    accept: Option<String>,
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl MethodDescriptor {
    /// Describe a method.
    ///
    /// HEAD methods return [`ReturnKind::Unit`] by default, all others
    /// [`ReturnKind::Value`].
    #[must_use]
    pub fn new(name: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        let returns = if method.is_bodiless_response() {
            ReturnKind::Unit
        } else {
            ReturnKind::Value
        };
        Self {
            name: name.into(),
            method,
            path: path.into(),
            params: Vec::new(),
            returns,
            error_type: None,
            content_type: None,
            accept: None,
            headers: Vec::new(),
            timeout: None,
        }
    }

    /// Describe a GET method.
    #[must_use]
    pub fn get(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::Get, path)
    }

    /// Describe a POST method.
    #[must_use]
    pub fn post(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::Post, path)
    }

    /// Describe a PUT method.
    #[must_use]
    pub fn put(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::Put, path)
    }

    /// Describe a PATCH method.
    #[must_use]
    pub fn patch(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::Patch, path)
    }

    /// Describe a DELETE method.
    #[must_use]
    pub fn delete(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::Delete, path)
    }

    /// Describe a HEAD method.
    #[must_use]
    pub fn head(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, Method::Head, path)
    }

    /// Append a parameter.
    #[must_use]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Append a PATH parameter bound to the placeholder `name`.
    #[must_use]
    pub fn path_param(self, name: impl Into<String>) -> Self {
        self.param(ParamSpec::new(name, ParamRole::Path))
    }

    /// Append a QUERY parameter sent under the key `name`.
    #[must_use]
    pub fn query_param(self, name: impl Into<String>) -> Self {
        self.param(ParamSpec::new(name, ParamRole::Query))
    }

    /// Append a QUERY parameter whose list values use `format`.
    #[must_use]
    pub fn query_list(self, name: impl Into<String>, format: CollectionFormat) -> Self {
        self.param(ParamSpec::new(name, ParamRole::Query).with_format(format))
    }

    /// Append a HEADER parameter sent as the header `name`.
    #[must_use]
    pub fn header_param(self, name: impl Into<String>) -> Self {
        self.param(ParamSpec::new(name, ParamRole::Header))
    }

    /// Append the BODY parameter.
    #[must_use]
    pub fn body_param(self, name: impl Into<String>) -> Self {
        self.param(ParamSpec::new(name, ParamRole::Body))
    }

    /// Append a parameter that is accepted but not sent.
    #[must_use]
    pub fn ignored_param(self, name: impl Into<String>) -> Self {
        self.param(ParamSpec::new(name, ParamRole::Ignored))
    }

    /// Declare that the method returns nothing.
    #[must_use]
    pub const fn returns_unit(mut self) -> Self {
        self.returns = ReturnKind::Unit;
        self
    }

    /// Declare that the method returns a decoded body.
    #[must_use]
    pub const fn returns_value(mut self) -> Self {
        self.returns = ReturnKind::Value;
        self
    }

    /// Declare the error type decoded from non-2xx bodies.
    #[must_use]
    pub fn error<E>(mut self) -> Self
    where
        E: serde::de::DeserializeOwned + ErrorBody,
    {
        self.error_type = Some(ErrorType::of::<E>());
        self
    }

    /// Override the request body content type.
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the accepted response content type.
    #[must_use]
    pub fn accept(mut self, content_type: impl Into<String>) -> Self {
        self.accept = Some(content_type.into());
        self
    }

    /// Add a static header sent with every call.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a per-method timeout, overriding the client default.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Method name, the key of the dispatch table.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// HTTP verb.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Path template as written.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Declared parameters.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }
}

/// Declarative description of a client interface.
#[derive(Debug, Clone)]
pub struct InterfaceDescription {
    name: String,
    headers: Vec<(String, String)>,
    methods: Vec<MethodDescriptor>,
}

impl InterfaceDescription {
    /// Describe an interface.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            headers: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Add a method.
    #[must_use]
    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a static header sent by every method.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Interface name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interface-level static headers.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Declared methods, in declaration order.
    #[must_use]
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }
}

// ============================================================================
// Binding
// ============================================================================

/// Validated, immutable HTTP binding of one method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBinding {
    name: String,
    method: Method,
    template: PathTemplate,
    params: Vec<ParamSpec>,
    body_index: Option<usize>,
    returns: ReturnKind,
    error_type: Option<ErrorType>,
    content_type: Option<String>,
    accept: Option<String>,
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl MethodBinding {
    /// Validate a descriptor.
    ///
    /// `inherited_headers` (interface-level headers) come before the
    /// method's own static headers, so the method's win.
    ///
    /// # Errors
    ///
    /// Returns the first [`BindingError`] found: malformed template, unknown
    /// or duplicate path parameter, multiple bodies, invalid header name or
    /// value, unbound placeholder.
    pub fn extract(
        descriptor: &MethodDescriptor,
        inherited_headers: &[(String, String)],
    ) -> Result<Self, BindingError> {
        let template = PathTemplate::parse(&descriptor.path)?;

        let mut bound = HashSet::new();
        let mut body_index: Option<usize> = None;

        for (index, param) in descriptor.params.iter().enumerate() {
            match param.role() {
                ParamRole::Path => {
                    if !template.has_placeholder(param.name()) {
                        return Err(BindingError::UnknownPathParameter {
                            name: param.name().to_string(),
                        });
                    }
                    if !bound.insert(param.name()) {
                        return Err(BindingError::DuplicatePathParameter {
                            name: param.name().to_string(),
                        });
                    }
                }
                ParamRole::Body => {
                    if let Some(first) = body_index.and_then(|i| descriptor.params.get(i)) {
                        return Err(BindingError::MultipleBodies {
                            first: first.name().to_string(),
                            second: param.name().to_string(),
                        });
                    }
                    body_index = Some(index);
                }
                ParamRole::Header => validate_header_name(param.name())?,
                ParamRole::Query | ParamRole::Ignored => {}
            }
        }

        if let Some(name) = template.placeholders().find(|p| !bound.contains(p)) {
            return Err(BindingError::UnboundPlaceholder {
                name: name.to_string(),
            });
        }

        let headers: Vec<(String, String)> = inherited_headers
            .iter()
            .chain(&descriptor.headers)
            .cloned()
            .collect();
        for (name, value) in &headers {
            validate_header(name, value)?;
        }

        Ok(Self {
            name: descriptor.name.clone(),
            method: descriptor.method,
            template,
            params: descriptor.params.clone(),
            body_index,
            returns: descriptor.returns,
            error_type: descriptor.error_type,
            content_type: descriptor.content_type.clone(),
            accept: descriptor.accept.clone(),
            headers,
            timeout: descriptor.timeout,
        })
    }

    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// HTTP verb.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Parsed path template.
    #[must_use]
    pub const fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// Parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Position of the BODY parameter, if any.
    #[must_use]
    pub const fn body_index(&self) -> Option<usize> {
        self.body_index
    }

    /// Success return kind.
    #[must_use]
    pub const fn returns(&self) -> ReturnKind {
        self.returns
    }

    /// Declared error type, if any.
    #[must_use]
    pub const fn error_type(&self) -> Option<&ErrorType> {
        self.error_type.as_ref()
    }

    /// Request content type override.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Accepted response content type.
    #[must_use]
    pub fn accept(&self) -> Option<&str> {
        self.accept.as_deref()
    }

    /// Static headers, interface-level first.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Per-method timeout.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

pub(crate) fn validate_header_name(name: &str) -> Result<(), BindingError> {
    http::HeaderName::from_bytes(name.as_bytes())
        .map(drop)
        .map_err(|_| BindingError::InvalidHeaderName {
            name: name.to_string(),
        })
}

pub(crate) fn validate_header(name: &str, value: &str) -> Result<(), BindingError> {
    validate_header_name(name)?;
    http::HeaderValue::from_str(value)
        .map(drop)
        .map_err(|_| BindingError::InvalidHeaderValue {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;
    use crate::{FormCodec, JsonCodec};

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct Problem {
        message: String,
    }

    fn extract(descriptor: &MethodDescriptor) -> Result<MethodBinding, BindingError> {
        MethodBinding::extract(descriptor, &[])
    }

    #[test]
    fn extracts_roles_in_declaration_order() {
        let descriptor = MethodDescriptor::put("update_user", "/users/{id}")
            .path_param("id")
            .header_param("If-Match")
            .body_param("user")
            .query_param("notify")
            .ignored_param("trace");

        let binding = extract(&descriptor).expect("valid");
        let roles: Vec<_> = binding.params().iter().map(ParamSpec::role).collect();
        check!(
            roles
                == [
                    ParamRole::Path,
                    ParamRole::Header,
                    ParamRole::Body,
                    ParamRole::Query,
                    ParamRole::Ignored,
                ]
        );
        check!(binding.body_index() == Some(2));
        check!(binding.method() == Method::Put);
        check!(binding.returns() == ReturnKind::Value);
    }

    #[test]
    fn head_defaults_to_unit() {
        let binding = extract(&MethodDescriptor::head("exists", "/users/{id}").path_param("id"))
            .expect("valid");
        check!(binding.returns() == ReturnKind::Unit);
    }

    #[test]
    fn rejects_multiple_bodies() {
        let descriptor = MethodDescriptor::post("create", "/users")
            .body_param("user")
            .body_param("profile");

        let_assert!(Err(BindingError::MultipleBodies { first, second }) = extract(&descriptor));
        check!(first == "user");
        check!(second == "profile");
    }

    #[test]
    fn rejects_unbound_placeholder() {
        let descriptor = MethodDescriptor::get("get_post", "/users/{id}/posts/{post_id}")
            .path_param("id");

        let_assert!(Err(BindingError::UnboundPlaceholder { name }) = extract(&descriptor));
        check!(name == "post_id");
    }

    #[test]
    fn rejects_path_parameter_without_placeholder() {
        let descriptor = MethodDescriptor::get("get_user", "/users").path_param("id");
        let_assert!(Err(BindingError::UnknownPathParameter { name }) = extract(&descriptor));
        check!(name == "id");
    }

    #[test]
    fn rejects_duplicate_path_parameter() {
        let descriptor = MethodDescriptor::get("get_user", "/users/{id}")
            .path_param("id")
            .path_param("id");
        let_assert!(Err(BindingError::DuplicatePathParameter { .. }) = extract(&descriptor));
    }

    #[test]
    fn rejects_malformed_template() {
        let descriptor = MethodDescriptor::get("broken", "/users/{id").path_param("id");
        let_assert!(Err(BindingError::MalformedTemplate { template, .. }) = extract(&descriptor));
        check!(template == "/users/{id");
    }

    #[test]
    fn rejects_invalid_headers() {
        let descriptor = MethodDescriptor::get("list", "/users").header_param("bad header");
        let_assert!(Err(BindingError::InvalidHeaderName { name }) = extract(&descriptor));
        check!(name == "bad header");

        let descriptor = MethodDescriptor::get("list", "/users").header("X-Token", "a\nb");
        let_assert!(Err(BindingError::InvalidHeaderValue { name }) = extract(&descriptor));
        check!(name == "X-Token");
    }

    #[test]
    fn inherited_headers_come_first() {
        let descriptor = MethodDescriptor::get("list", "/users").header("X-Version", "2");
        let inherited = [("X-Version".to_string(), "1".to_string())];

        let binding = MethodBinding::extract(&descriptor, &inherited).expect("valid");
        check!(
            binding.headers()
                == [
                    ("X-Version".to_string(), "1".to_string()),
                    ("X-Version".to_string(), "2".to_string()),
                ]
        );
    }

    #[test]
    fn extraction_is_deterministic() {
        let descriptor = MethodDescriptor::get("get_user", "/users/{id}")
            .path_param("id")
            .error::<Problem>()
            .timeout(Duration::from_secs(2));

        check!(extract(&descriptor) == extract(&descriptor));
    }

    #[test]
    fn error_type_decodes_payload() {
        let binding = extract(&MethodDescriptor::get("x", "/x").error::<Problem>()).expect("valid");
        let_assert!(Some(error_type) = binding.error_type());
        check!(error_type.name().ends_with("Problem"));

        let body = error_type
            .decode(&JsonCodec, "application/json", serde_json::json!({"message": "gone"}))
            .expect("decode");
        let_assert!(Some(problem) = ErrorBody::as_any(&*body).downcast_ref::<Problem>());
        check!(problem.message == "gone");

        let_assert!(
            Err(CodecError::DecodeFailed { .. }) =
                error_type.decode(&JsonCodec, "application/json", serde_json::json!({"code": 1}))
        );
    }

    #[test]
    fn error_type_parses_form_encoded_payload() {
        #[derive(Debug, serde::Deserialize)]
        struct Throttled {
            retry_after: u32,
        }

        let error_type = ErrorType::of::<Throttled>();
        let value = FormCodec.deserialize(b"retry_after=30").expect("form");
        let body = error_type
            .decode(&FormCodec, "application/x-www-form-urlencoded", value)
            .expect("decode");
        let_assert!(Some(throttled) = ErrorBody::as_any(&*body).downcast_ref::<Throttled>());
        check!(throttled.retry_after == 30);
    }
}
