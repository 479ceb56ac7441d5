//! Response decoding.
//!
//! [`ResponseDecoder::decode`] consumes a [`Response`] and yields either the
//! declared success value or an [`Error`]. The status of a failed call is
//! always preserved.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::codec::{from_value, typed_value};
use crate::{
    ApiError, CodecRegistry, ContentType, Error, ErrorPayload, MethodBinding, Response, ReturnKind,
};

/// Decodes responses with a codec registry.
#[derive(Debug, Clone, Copy)]
pub struct ResponseDecoder<'a> {
    codecs: &'a CodecRegistry,
    default_content_type: &'a str,
}

impl<'a> ResponseDecoder<'a> {
    /// Create a decoder.
    #[must_use]
    pub fn new(codecs: &'a CodecRegistry) -> Self {
        Self {
            codecs,
            default_content_type: ContentType::Json.as_str(),
        }
    }

    /// Content type assumed when neither the response nor the method names one.
    #[must_use]
    pub const fn default_content_type(mut self, content_type: &'a str) -> Self {
        self.default_content_type = content_type;
        self
    }

    /// Decode a response for `binding`.
    ///
    /// - 2xx, unit method: `T` is deserialized from `null`, the body is dropped
    /// - 2xx, value method: the body is decoded with the deserializer for the
    ///   response content type
    /// - anything else: [`ApiError::Http`] with the decoded or raw payload
    ///
    /// # Errors
    ///
    /// - [`ApiError::EmptyBodyForNonVoid`] for an empty 2xx body
    /// - [`ApiError::UnsupportedResponseType`] if no deserializer matches
    /// - [`crate::CodecError::DecodeFailed`] if the body does not decode into `T`
    /// - [`ApiError::Http`] for non-2xx statuses
    pub fn decode<T: DeserializeOwned>(
        &self,
        response: Response,
        binding: &MethodBinding,
    ) -> Result<T, Error> {
        let status = response.status();
        if !response.is_success() {
            return Err(self.error_payload(response, binding).into());
        }

        match binding.returns() {
            ReturnKind::Unit => Ok(from_value("unit", Value::Null)?),
            ReturnKind::Value => {
                if response.body().is_empty() {
                    return Err(ApiError::EmptyBodyForNonVoid { status }.into());
                }
                let content_type = self.content_type(&response, binding).to_string();
                let deserializer = self.codecs.deserializer_for(&content_type).map_err(|_| {
                    ApiError::UnsupportedResponseType {
                        status,
                        content_type: content_type.clone(),
                    }
                })?;
                let value = deserializer.deserialize(response.body())?;
                Ok(typed_value(deserializer, &content_type, value)?)
            }
        }
    }

    fn content_type<'r>(&'r self, response: &'r Response, binding: &'r MethodBinding) -> &'r str {
        response
            .content_type()
            .or_else(|| binding.accept())
            .unwrap_or(self.default_content_type)
    }

    fn error_payload(&self, response: Response, binding: &MethodBinding) -> ApiError {
        let status = response.status();
        let decoded = binding.error_type().and_then(|error_type| {
            if response.body().is_empty() {
                return None;
            }
            let content_type = self.content_type(&response, binding);
            let deserializer = self.codecs.deserializer_for(content_type).ok()?;
            let value = deserializer.deserialize(response.body()).ok()?;
            error_type.decode(deserializer, content_type, value).ok()
        });

        let payload = match decoded {
            Some(body) => ErrorPayload::Decoded(body),
            None => ErrorPayload::Raw(response.into_body()),
        };
        ApiError::Http { status, payload }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert2::{check, let_assert};
    use bytes::Bytes;
    use serde::Deserialize;

    use super::*;
    use crate::{CodecError, MethodDescriptor};

    #[derive(Debug, PartialEq, Deserialize)]
    struct User {
        id: u64,
        name: String,
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Problem {
        code: String,
    }

    fn binding(descriptor: MethodDescriptor) -> MethodBinding {
        MethodBinding::extract(&descriptor, &[]).expect("valid binding")
    }

    fn response(status: u16, content_type: Option<&str>, body: &'static str) -> Response {
        let headers = content_type
            .map(|ct| HashMap::from([("Content-Type".to_string(), ct.to_string())]))
            .unwrap_or_default();
        Response::new(status, headers, body)
    }

    fn decode<T: DeserializeOwned>(response: Response, binding: &MethodBinding) -> Result<T, Error> {
        let codecs = CodecRegistry::default();
        ResponseDecoder::new(&codecs).decode(response, binding)
    }

    #[test]
    fn decodes_success_body() {
        let binding = binding(MethodDescriptor::get("get_user", "/users/1"));
        let user: User = decode(
            response(200, Some("application/json; charset=utf-8"), r#"{"id":1,"name":"Alice"}"#),
            &binding,
        )
        .expect("decode");
        check!(user == User { id: 1, name: "Alice".to_string() });
    }

    #[test]
    fn missing_content_type_falls_back_to_accept() {
        let binding = binding(MethodDescriptor::get("readme", "/readme").accept("text/plain"));
        let text: String = decode(response(200, None, "# Hello"), &binding).expect("decode");
        check!(text == "# Hello");
    }

    #[test]
    fn text_body_parses_into_numbers() {
        let binding = binding(MethodDescriptor::get("count", "/users/count").accept("text/plain"));
        let count: u64 = decode(response(200, Some("text/plain"), "42"), &binding).expect("decode");
        check!(count == 42);
    }

    #[test]
    fn unit_methods_ignore_the_body() {
        let binding = binding(MethodDescriptor::delete("remove", "/users/1").returns_unit());
        let result: Result<(), _> = decode(response(204, None, ""), &binding);
        check!(result.is_ok());

        let maybe: Option<User> = decode(response(200, Some("text/html"), "<p>ok</p>"), &binding)
            .expect("decode");
        check!(maybe.is_none());
    }

    #[test]
    fn empty_body_for_value_method() {
        let binding = binding(MethodDescriptor::get("get_user", "/users/1"));
        let_assert!(
            Err(Error::Api(ApiError::EmptyBodyForNonVoid { status: 200 })) =
                decode::<User>(response(200, Some("application/json"), ""), &binding)
        );
    }

    #[test]
    fn unknown_response_content_type() {
        let binding = binding(MethodDescriptor::get("get_user", "/users/1"));
        let_assert!(
            Err(Error::Api(ApiError::UnsupportedResponseType { status, content_type })) =
                decode::<User>(response(200, Some("application/cbor"), "\u{1}"), &binding)
        );
        check!(status == 200);
        check!(content_type == "application/cbor");
    }

    #[test]
    fn malformed_body_is_a_decode_failure() {
        let binding = binding(MethodDescriptor::get("get_user", "/users/1"));
        let_assert!(
            Err(Error::Codec(CodecError::DecodeFailed { path, .. })) =
                decode::<User>(response(200, Some("application/json"), r#"{"id":"x","name":"A"}"#), &binding)
        );
        check!(path == "id");
    }

    #[test]
    fn error_body_decoded_with_declared_type() {
        let binding = binding(MethodDescriptor::get("get_user", "/users/1").error::<Problem>());
        let_assert!(
            Err(Error::Api(error)) =
                decode::<User>(response(404, Some("application/json"), r#"{"code":"missing"}"#), &binding)
        );
        check!(error.status() == 404);
        check!(error.decoded::<Problem>() == Some(&Problem { code: "missing".to_string() }));
        check!(error.raw_body().is_none());
    }

    #[test]
    fn undecodable_error_body_stays_raw() {
        let binding = binding(MethodDescriptor::get("get_user", "/users/1").error::<Problem>());
        let_assert!(
            Err(Error::Api(error)) =
                decode::<User>(response(502, Some("text/html"), "<h1>Bad Gateway</h1>"), &binding)
        );
        check!(error.status() == 502);
        check!(error.decoded::<Problem>().is_none());
        check!(error.raw_body() == Some(&Bytes::from_static(b"<h1>Bad Gateway</h1>")));
    }

    #[test]
    fn error_without_declared_type_is_raw() {
        let binding = binding(MethodDescriptor::get("get_user", "/users/1"));
        let_assert!(
            Err(Error::Api(error)) =
                decode::<User>(response(404, Some("application/json"), r#"{"code":"missing"}"#), &binding)
        );
        check!(error.raw_body() == Some(&Bytes::from_static(br#"{"code":"missing"}"#)));
    }
}
