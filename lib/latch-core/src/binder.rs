//! Turning call arguments into a [`Request`].
//!
//! [`RequestBinder::bind`] is pure: it reads a cached [`MethodBinding`] and
//! the call's [`Args`] and produces a fresh request. No I/O happens here.

use std::collections::HashMap;

use serde_json::Value;

use crate::binding::validate_header;
use crate::{
    Args, BindingError, CodecRegistry, ContentType, Error, MethodBinding, ParamRole, ParamSpec,
    Request, ReturnKind,
};

/// Binds call arguments to a method binding.
#[derive(Debug, Clone, Copy)]
pub struct RequestBinder<'a> {
    base_url: &'a str,
    codecs: &'a CodecRegistry,
    default_content_type: &'a str,
    default_headers: &'a [(String, String)],
}

impl<'a> RequestBinder<'a> {
    /// Create a binder resolving paths against `base_url`.
    ///
    /// A trailing `/` on the base URL is ignored.
    #[must_use]
    pub fn new(base_url: &'a str, codecs: &'a CodecRegistry) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/'),
            codecs,
            default_content_type: ContentType::Json.as_str(),
            default_headers: &[],
        }
    }

    /// Content type used when a method declares none.
    #[must_use]
    pub const fn default_content_type(mut self, content_type: &'a str) -> Self {
        self.default_content_type = content_type;
        self
    }

    /// Headers sent with every request, before any method header.
    #[must_use]
    pub const fn default_headers(mut self, headers: &'a [(String, String)]) -> Self {
        self.default_headers = headers;
        self
    }

    /// Build the request for one call.
    ///
    /// # Errors
    ///
    /// - [`BindingError::ArgumentCount`] if `args` does not match the parameters
    /// - [`BindingError::NullPathValue`] for an absent or empty PATH argument
    /// - [`BindingError::DotPathSegment`] for a `.` or `..` PATH argument
    /// - [`BindingError::UnsupportedArgument`] for a structured PATH, QUERY or
    ///   HEADER argument
    /// - [`BindingError::UnsupportedContentType`] if the body has no serializer
    /// - [`BindingError::InvalidHeaderValue`] for an illegal header value
    /// - [`Error::Codec`] if an argument or the body cannot be encoded
    /// - [`Error::InvalidUrl`] if the resulting URL does not parse
    pub fn bind(&self, binding: &MethodBinding, args: Args) -> Result<Request, Error> {
        let values = args.into_values()?;
        let params = binding.params();
        if values.len() != params.len() {
            return Err(BindingError::ArgumentCount {
                expected: params.len(),
                actual: values.len(),
            }
            .into());
        }

        let mut path_values = HashMap::new();
        let mut query = Vec::new();
        let mut header_args = Vec::new();
        let mut body = None;

        for (param, value) in params.iter().zip(values) {
            match param.role() {
                ParamRole::Path => {
                    let rendered = match &value {
                        Value::Null => None,
                        value => Some(render(param, value)?),
                    };
                    let rendered = rendered.filter(|s| !s.is_empty()).ok_or_else(|| {
                        BindingError::NullPathValue {
                            name: param.name().to_string(),
                        }
                    })?;
                    path_values.insert(param.name(), rendered);
                }
                ParamRole::Query => match value {
                    Value::Null => {}
                    Value::Array(items) => {
                        let items = render_items(param, &items)?;
                        match param.format().separator() {
                            None => query.extend(
                                items.into_iter().map(|item| (param.name().to_string(), item)),
                            ),
                            Some(_) if items.is_empty() => {}
                            Some(separator) => {
                                query.push((param.name().to_string(), items.join(separator)));
                            }
                        }
                    }
                    value => query.push((param.name().to_string(), render(param, &value)?)),
                },
                ParamRole::Header => match value {
                    Value::Null => {}
                    Value::Array(items) => {
                        header_args.push((param.name(), render_items(param, &items)?.join(", ")));
                    }
                    value => header_args.push((param.name(), render(param, &value)?)),
                },
                ParamRole::Body => {
                    if !value.is_null() {
                        body = Some(value);
                    }
                }
                ParamRole::Ignored => {}
            }
        }

        let path = binding.template().expand(&path_values)?;
        let separator = if path.is_empty() || path.starts_with('/') {
            ""
        } else {
            "/"
        };
        let url = url::Url::parse(&format!("{}{separator}{path}", self.base_url))?;

        let static_headers = self
            .default_headers
            .iter()
            .chain(binding.headers())
            .map(|(name, value)| (name.as_str(), value.clone()));
        let mut request = Request::builder(binding.method(), url)
            .query_pairs(query)
            .headers(static_headers)
            .timeout(binding.timeout())
            .build();

        if binding.returns() == ReturnKind::Value && !request.has_header("accept") {
            let accept = binding.accept().unwrap_or(self.default_content_type);
            request.set_header("accept", accept);
        }

        if binding.body_index().is_some() {
            let content_type = binding.content_type().unwrap_or(self.default_content_type);
            let serializer = self.codecs.serializer_for(content_type).map_err(|_| {
                BindingError::UnsupportedContentType {
                    content_type: content_type.to_string(),
                }
            })?;
            if let Some(body) = body {
                request.set_body(serializer.serialize(&body)?);
                request.set_header("content-type", serializer.content_type_header(content_type));
            }
        }

        for (name, value) in header_args {
            request.set_header(name, value);
        }
        for (name, value) in request.headers() {
            validate_header(name, value)?;
        }
        Ok(request)
    }
}

fn render(param: &ParamSpec, value: &Value) -> Result<String, BindingError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(BindingError::UnsupportedArgument {
            name: param.name().to_string(),
            role: param.role(),
        }),
    }
}

fn render_items(param: &ParamSpec, items: &[Value]) -> Result<Vec<String>, BindingError> {
    items
        .iter()
        .filter(|item| !item.is_null())
        .map(|item| render(param, item))
        .collect()
}
