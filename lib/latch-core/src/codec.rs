//! Codec registry: body serializers and deserializers keyed by content type.
//!
//! Codecs work on [`serde_json::Value`], serde's self-describing data model,
//! so any `Serialize` / `DeserializeOwned` type can travel through any
//! registered codec. Typed conversion happens at the edges in
//! [`CodecRegistry::encode`] and [`CodecRegistry::decode`].
//!
//! # Example
//!
//! ```
//! use latch_core::{CodecRegistry, ContentType};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct User { name: String }
//!
//! let codecs = CodecRegistry::default();
//! let user = User { name: "Alice".to_string() };
//! let bytes = codecs.encode(ContentType::Json.as_str(), &user).expect("encode");
//! assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
//!
//! let back: User = codecs.decode(ContentType::Json.as_str(), &bytes).expect("decode");
//! assert_eq!(back, user);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::CodecError;
use crate::text_value::TextValue;

pub use crate::multipart::{FilePart, MultipartCodec};

/// Well-known content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Plain text content type (`text/plain`).
    PlainText,
    /// HTML content type (`text/html`).
    Html,
    /// XML content type (`application/xml`).
    Xml,
    /// JavaScript content type (`application/javascript`).
    JavaScript,
    /// Multipart form content type (`multipart/form-data`).
    MultipartFormData,
    /// Raw bytes (`application/octet-stream`).
    OctetStream,
    /// PDF document (`application/pdf`).
    Pdf,
    /// JPEG image (`image/jpeg`).
    Jpeg,
    /// PNG image (`image/png`).
    Png,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain",
            Self::Html => "text/html",
            Self::Xml => "application/xml",
            Self::JavaScript => "application/javascript",
            Self::MultipartFormData => "multipart/form-data",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ContentType> for String {
    fn from(content_type: ContentType) -> Self {
        content_type.as_str().to_string()
    }
}

/// Reduce a content type to its lower-cased essence.
///
/// `Application/JSON; charset=utf-8` becomes `application/json`.
#[must_use]
pub fn content_type_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

// ============================================================================
// Codec Traits
// ============================================================================

/// Turns a value into body bytes.
pub trait BodySerializer: Send + Sync {
    /// Serialize a value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EncodeFailed`] if the value has no representation
    /// in this format.
    fn serialize(&self, value: &Value) -> Result<Bytes, CodecError>;

    /// The `Content-Type` header sent with bodies from this serializer,
    /// given the declared content type.
    ///
    /// Formats that need parameters, like a multipart boundary, add them here.
    fn content_type_header(&self, content_type: &str) -> String {
        content_type.to_string()
    }
}

/// Turns body bytes into a value.
pub trait BodyDeserializer: Send + Sync {
    /// Deserialize a payload.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::DecodeFailed`] on malformed payloads.
    fn deserialize(&self, bytes: &[u8]) -> Result<Value, CodecError>;

    /// Returns `true` if every decoded scalar is a string.
    ///
    /// Typed conversion then parses numbers and booleans out of strings and
    /// accepts a lone value where a sequence is expected.
    fn textual_scalars(&self) -> bool {
        false
    }
}

// ============================================================================
// Built-in Codecs
// ============================================================================

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl BodySerializer for JsonCodec {
    fn serialize(&self, value: &Value) -> Result<Bytes, CodecError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| CodecError::encode_failed(ContentType::Json.as_str(), e))
    }
}

impl BodyDeserializer for JsonCodec {
    fn deserialize(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        serde_json::from_slice(bytes)
            .map_err(|e| CodecError::decode_failed(ContentType::Json.as_str(), e))
    }
}

/// Form URL-encoded codec backed by `serde_html_form`.
///
/// Bodies must be objects. Array fields become repeated keys
/// (`tags=a&tags=b`) and `null` fields are left out. Decoded values are
/// strings, or arrays of strings for repeated keys; typed conversion parses
/// them back into numbers, booleans and lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormCodec;

impl BodySerializer for FormCodec {
    fn serialize(&self, value: &Value) -> Result<Bytes, CodecError> {
        let content_type = ContentType::FormUrlEncoded.as_str();
        let Value::Object(fields) = value else {
            return Err(CodecError::encode_failed(
                content_type,
                "form bodies must be objects",
            ));
        };

        let mut pairs = Vec::with_capacity(fields.len());
        for (key, value) in fields {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items.iter().filter(|item| !item.is_null()) {
                        pairs.push((key.as_str(), form_scalar(content_type, key, item)?));
                    }
                }
                scalar => pairs.push((key.as_str(), form_scalar(content_type, key, scalar)?)),
            }
        }

        serde_html_form::to_string(&pairs)
            .map(|s| Bytes::from(s.into_bytes()))
            .map_err(|e| CodecError::encode_failed(content_type, e))
    }
}

/// Insert a field; a repeated key turns into an array of its values.
pub(crate) fn insert_repeated(fields: &mut Map<String, Value>, key: String, value: Value) {
    match fields.get_mut(&key) {
        Some(Value::Array(values)) => values.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(key, value);
        }
    }
}

fn form_scalar(content_type: &str, key: &str, value: &Value) -> Result<String, CodecError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(CodecError::encode_failed(
            content_type,
            format!("form field '{key}' must be a scalar or a list of scalars"),
        )),
    }
}

impl BodyDeserializer for FormCodec {
    fn deserialize(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let pairs: Vec<(String, String)> = serde_html_form::from_bytes(bytes)
            .map_err(|e| CodecError::decode_failed(ContentType::FormUrlEncoded.as_str(), e))?;

        let mut fields = Map::new();
        for (key, value) in pairs {
            insert_repeated(&mut fields, key, Value::String(value));
        }
        Ok(Value::Object(fields))
    }

    fn textual_scalars(&self) -> bool {
        true
    }
}

/// Raw text codec for `text/plain`, `text/html`, `application/xml` and
/// `application/javascript`.
///
/// Strings pass through unchanged; numbers and booleans are written in
/// their display form. Decoding yields a string, parsed back into a number
/// or boolean when the target type asks for one.
#[derive(Debug, Clone, Copy)]
pub struct TextCodec {
    content_type: ContentType,
}

impl TextCodec {
    /// Create a text codec reporting errors under the given content type.
    #[must_use]
    pub const fn new(content_type: ContentType) -> Self {
        Self { content_type }
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::new(ContentType::PlainText)
    }
}

impl BodySerializer for TextCodec {
    fn serialize(&self, value: &Value) -> Result<Bytes, CodecError> {
        match value {
            Value::String(s) => Ok(Bytes::from(s.clone())),
            Value::Number(n) => Ok(Bytes::from(n.to_string())),
            Value::Bool(b) => Ok(Bytes::from(b.to_string())),
            Value::Null => Ok(Bytes::new()),
            Value::Array(_) | Value::Object(_) => Err(CodecError::encode_failed(
                self.content_type.as_str(),
                "text bodies must be scalar values",
            )),
        }
    }
}

impl BodyDeserializer for TextCodec {
    fn deserialize(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        std::str::from_utf8(bytes)
            .map(|s| Value::String(s.to_string()))
            .map_err(|e| CodecError::decode_failed(self.content_type.as_str(), e))
    }

    fn textual_scalars(&self) -> bool {
        true
    }
}

/// Raw bytes codec for `application/octet-stream`, PDF and images.
///
/// Bodies are byte sequences (`Vec<u8>`, `[u8; N]`) or strings; decoding
/// yields the bytes, so `Vec<u8>` is the natural return type.
#[derive(Debug, Clone, Copy)]
pub struct BinaryCodec {
    content_type: ContentType,
}

impl BinaryCodec {
    /// Create a binary codec reporting errors under the given content type.
    #[must_use]
    pub const fn new(content_type: ContentType) -> Self {
        Self { content_type }
    }
}

impl Default for BinaryCodec {
    fn default() -> Self {
        Self::new(ContentType::OctetStream)
    }
}

impl BodySerializer for BinaryCodec {
    fn serialize(&self, value: &Value) -> Result<Bytes, CodecError> {
        let not_bytes = || {
            CodecError::encode_failed(
                self.content_type.as_str(),
                "binary bodies must be byte sequences or strings",
            )
        };
        match value {
            Value::String(s) => Ok(Bytes::from(s.clone())),
            Value::Null => Ok(Bytes::new()),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(not_bytes)
                })
                .collect::<Result<Vec<u8>, _>>()
                .map(Bytes::from),
            Value::Bool(_) | Value::Number(_) | Value::Object(_) => Err(not_bytes()),
        }
    }
}

impl BodyDeserializer for BinaryCodec {
    fn deserialize(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        Ok(Value::Array(bytes.iter().map(|&b| Value::from(b)).collect()))
    }
}

// ============================================================================
// Registry
// ============================================================================

/// A serializer/deserializer pair registered for one content type.
#[derive(Clone)]
pub struct CodecEntry {
    serializer: Arc<dyn BodySerializer>,
    deserializer: Arc<dyn BodyDeserializer>,
}

impl CodecEntry {
    /// The entry's serializer.
    #[must_use]
    pub fn serializer(&self) -> &dyn BodySerializer {
        self.serializer.as_ref()
    }

    /// The entry's deserializer.
    #[must_use]
    pub fn deserializer(&self) -> &dyn BodyDeserializer {
        self.deserializer.as_ref()
    }
}

/// Codecs keyed by content type essence.
///
/// Registration takes `&mut self` and happens during setup; the registry is
/// then shared behind an `Arc` and only read, so lookups need no locking.
/// Registering a content type again replaces the previous entry.
///
/// [`CodecRegistry::default`] registers a codec for every [`ContentType`]:
/// JSON, form, text, multipart and binary. [`CodecRegistry::empty`]
/// registers nothing.
#[derive(Clone)]
pub struct CodecRegistry {
    entries: HashMap<String, CodecEntry>,
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut content_types: Vec<_> = self.entries.keys().collect();
        content_types.sort();
        f.debug_struct("CodecRegistry")
            .field("content_types", &content_types)
            .finish()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register_codec(ContentType::Json, JsonCodec)
            .register_codec(ContentType::FormUrlEncoded, FormCodec)
            .register_codec(ContentType::PlainText, TextCodec::new(ContentType::PlainText))
            .register_codec(ContentType::Html, TextCodec::new(ContentType::Html))
            .register_codec(ContentType::Xml, TextCodec::new(ContentType::Xml))
            .register_codec(ContentType::JavaScript, TextCodec::new(ContentType::JavaScript))
            .register_codec(ContentType::MultipartFormData, MultipartCodec::new());
        for binary in [
            ContentType::OctetStream,
            ContentType::Pdf,
            ContentType::Jpeg,
            ContentType::Png,
        ] {
            registry.register_codec(binary, BinaryCodec::new(binary));
        }
        registry
    }
}

impl CodecRegistry {
    /// Create a registry without any codec.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a serializer and a deserializer for a content type.
    pub fn register(
        &mut self,
        content_type: impl Into<String>,
        serializer: impl BodySerializer + 'static,
        deserializer: impl BodyDeserializer + 'static,
    ) -> &mut Self {
        let entry = CodecEntry {
            serializer: Arc::new(serializer),
            deserializer: Arc::new(deserializer),
        };
        self.entries
            .insert(content_type_essence(&content_type.into()), entry);
        self
    }

    /// Register a codec implementing both directions.
    pub fn register_codec<C>(&mut self, content_type: impl Into<String>, codec: C) -> &mut Self
    where
        C: BodySerializer + BodyDeserializer + 'static,
    {
        let codec = Arc::new(codec);
        let entry = CodecEntry {
            serializer: codec.clone(),
            deserializer: codec,
        };
        self.entries
            .insert(content_type_essence(&content_type.into()), entry);
        self
    }

    /// Builder-style [`CodecRegistry::register_codec`].
    #[must_use]
    pub fn with_codec<C>(mut self, content_type: impl Into<String>, codec: C) -> Self
    where
        C: BodySerializer + BodyDeserializer + 'static,
    {
        self.register_codec(content_type, codec);
        self
    }

    /// Returns `true` if a codec is registered for the content type.
    #[must_use]
    pub fn contains(&self, content_type: &str) -> bool {
        self.entries.contains_key(&content_type_essence(content_type))
    }

    /// The entry registered for a content type.
    #[must_use]
    pub fn entry(&self, content_type: &str) -> Option<&CodecEntry> {
        self.entries.get(&content_type_essence(content_type))
    }

    /// The serializer registered for a content type.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NoSerializer`] if nothing is registered.
    pub fn serializer_for(&self, content_type: &str) -> Result<&dyn BodySerializer, CodecError> {
        self.entry(content_type)
            .map(CodecEntry::serializer)
            .ok_or_else(|| CodecError::NoSerializer {
                content_type: content_type.to_string(),
            })
    }

    /// The deserializer registered for a content type.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NoDeserializer`] if nothing is registered.
    pub fn deserializer_for(
        &self,
        content_type: &str,
    ) -> Result<&dyn BodyDeserializer, CodecError> {
        self.entry(content_type)
            .map(CodecEntry::deserializer)
            .ok_or_else(|| CodecError::NoDeserializer {
                content_type: content_type.to_string(),
            })
    }

    /// Serialize a typed value with the codec for `content_type`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NoSerializer`] or [`CodecError::EncodeFailed`].
    pub fn encode<T: serde::Serialize + ?Sized>(
        &self,
        content_type: &str,
        value: &T,
    ) -> Result<Bytes, CodecError> {
        let serializer = self.serializer_for(content_type)?;
        let value = serde_json::to_value(value)
            .map_err(|e| CodecError::encode_failed(content_type, e))?;
        serializer.serialize(&value)
    }

    /// Deserialize a payload into a typed value with the codec for `content_type`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NoDeserializer`] or [`CodecError::DecodeFailed`].
    pub fn decode<T: serde::de::DeserializeOwned>(
        &self,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<T, CodecError> {
        let deserializer = self.deserializer_for(content_type)?;
        let value = deserializer.deserialize(bytes)?;
        typed_value(deserializer, content_type, value)
    }
}

/// Convert a decoded value into a typed value with path-aware errors.
///
/// # Errors
///
/// Returns [`CodecError::DecodeFailed`] carrying the path of the failing
/// field (e.g., `user.address.city`).
pub fn from_value<T: serde::de::DeserializeOwned>(
    content_type: &str,
    value: Value,
) -> Result<T, CodecError> {
    serde_path_to_error::deserialize(value).map_err(|e| decode_failed_at(content_type, &e))
}

/// Convert a value produced by `deserializer` into a typed value.
///
/// Strict for self-describing formats such as JSON; string-tolerant when
/// [`BodyDeserializer::textual_scalars`] is set.
///
/// # Errors
///
/// Returns [`CodecError::DecodeFailed`] carrying the path of the failing field.
pub fn typed_value<T: serde::de::DeserializeOwned>(
    deserializer: &dyn BodyDeserializer,
    content_type: &str,
    value: Value,
) -> Result<T, CodecError> {
    if deserializer.textual_scalars() {
        serde_path_to_error::deserialize(TextValue(value))
            .map_err(|e| decode_failed_at(content_type, &e))
    } else {
        from_value(content_type, value)
    }
}

fn decode_failed_at(
    content_type: &str,
    error: &serde_path_to_error::Error<serde_json::Error>,
) -> CodecError {
    CodecError::DecodeFailed {
        content_type: content_type.to_string(),
        path: error.path().to_string(),
        message: error.inner().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        age: u32,
        tags: Vec<String>,
    }

    fn alice() -> User {
        User {
            name: "Alice".to_string(),
            age: 30,
            tags: vec!["admin".to_string()],
        }
    }

    #[test]
    fn content_type_as_str() {
        check!(ContentType::Json.as_str() == "application/json");
        check!(ContentType::FormUrlEncoded.as_str() == "application/x-www-form-urlencoded");
        check!(ContentType::PlainText.as_str() == "text/plain");
        check!(ContentType::Html.to_string() == "text/html");
        check!(ContentType::Xml.as_str() == "application/xml");
        check!(ContentType::MultipartFormData.as_str() == "multipart/form-data");
        check!(ContentType::OctetStream.to_string() == "application/octet-stream");
    }

    #[test]
    fn essence_strips_parameters_and_case() {
        check!(content_type_essence("Application/JSON; charset=utf-8") == "application/json");
        check!(content_type_essence(" text/plain ") == "text/plain");
        check!(content_type_essence("") == "");
    }

    #[test]
    fn json_round_trip() {
        let codecs = CodecRegistry::default();
        let bytes = codecs.encode("application/json", &alice()).expect("encode");
        // fields pass through a `Value` map, so keys come out sorted
        check!(bytes.as_ref() == br#"{"age":30,"name":"Alice","tags":["admin"]}"#);

        let back: User = codecs.decode("application/json", &bytes).expect("decode");
        check!(back == alice());
    }

    #[test]
    fn lookup_ignores_charset() {
        let codecs = CodecRegistry::default();
        check!(codecs.contains("application/json; charset=utf-8"));
        check!(codecs.deserializer_for("APPLICATION/JSON").is_ok());
    }

    #[test]
    fn missing_codecs_are_reported() {
        let codecs = CodecRegistry::empty();
        let_assert!(Err(CodecError::NoSerializer { content_type }) = codecs.serializer_for("application/cbor"));
        check!(content_type == "application/cbor");
        let_assert!(
            Err(CodecError::NoDeserializer { .. }) = codecs.deserializer_for("application/json")
        );
    }

    #[test]
    fn last_registration_wins() {
        struct Fixed;

        impl BodySerializer for Fixed {
            fn serialize(&self, _value: &Value) -> Result<Bytes, CodecError> {
                Ok(Bytes::from_static(b"fixed"))
            }
        }

        impl BodyDeserializer for Fixed {
            fn deserialize(&self, _bytes: &[u8]) -> Result<Value, CodecError> {
                Ok(json!("fixed"))
            }
        }

        let mut codecs = CodecRegistry::default();
        codecs.register("application/json", Fixed, Fixed);

        let bytes = codecs.encode("application/json", &alice()).expect("encode");
        check!(bytes.as_ref() == b"fixed");
        let decoded: String = codecs.decode("application/json", b"{}").expect("decode");
        check!(decoded == "fixed");
    }

    #[test]
    fn malformed_json_is_a_decode_failure() {
        let codecs = CodecRegistry::default();
        let_assert!(
            Err(CodecError::DecodeFailed { content_type, .. }) =
                codecs.decode::<User>("application/json", b"not json")
        );
        check!(content_type == "application/json");
    }

    #[test]
    fn type_mismatch_reports_field_path() {
        #[derive(Debug, Deserialize)]
        struct Address {
            #[allow(dead_code)]
            city: String,
        }

        #[derive(Debug, Deserialize)]
        struct Person {
            #[allow(dead_code)]
            address: Address,
        }

        let codecs = CodecRegistry::default();
        let_assert!(
            Err(CodecError::DecodeFailed { path, message, .. }) =
                codecs.decode::<Person>("application/json", br#"{"address":{"city":42}}"#)
        );
        check!(path == "address.city");
        check!(message.contains("invalid type"));
    }

    #[test]
    fn form_codec_skips_nulls_and_repeats_arrays() {
        let bytes = FormCodec
            .serialize(&json!({"name": "test", "page": null, "tags": ["a", "b"]}))
            .expect("encode");
        let body = String::from_utf8(bytes.to_vec()).expect("utf8");
        check!(body.contains("name=test"));
        check!(body.contains("tags=a"));
        check!(body.contains("tags=b"));
        check!(!body.contains("page"));
    }

    #[test]
    fn form_codec_rejects_scalars_and_nested_objects() {
        let_assert!(Err(CodecError::EncodeFailed { .. }) = FormCodec.serialize(&json!(42)));
        let_assert!(
            Err(CodecError::EncodeFailed { message, .. }) =
                FormCodec.serialize(&json!({"user": {"name": "x"}}))
        );
        check!(message.contains("'user'"));
    }

    #[test]
    fn form_codec_decodes_repeated_keys() {
        let value = FormCodec
            .deserialize(b"name=test&tag=a&tag=b&tag=c")
            .expect("decode");
        check!(value == json!({"name": "test", "tag": ["a", "b", "c"]}));
    }

    #[test]
    fn text_codec_round_trip() {
        let codecs = CodecRegistry::default();
        let bytes = codecs.encode("text/plain", "hello").expect("encode");
        check!(bytes.as_ref() == b"hello");
        let text: String = codecs.decode("text/html; charset=utf-8", b"<p>hi</p>").expect("decode");
        check!(text == "<p>hi</p>");
    }

    #[test]
    fn form_typed_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Login {
            user: String,
            attempts: u32,
            remember: bool,
            tags: Vec<String>,
            otp: Option<u32>,
        }

        let login = Login {
            user: "a b".to_string(),
            attempts: 3,
            remember: true,
            tags: vec!["x".to_string()],
            otp: None,
        };
        let codecs = CodecRegistry::default();
        let bytes = codecs
            .encode(ContentType::FormUrlEncoded.as_str(), &login)
            .expect("encode");
        check!(bytes.as_ref() == b"attempts=3&remember=true&tags=x&user=a+b");

        let back: Login = codecs
            .decode(ContentType::FormUrlEncoded.as_str(), &bytes)
            .expect("decode");
        check!(back == login);

        let back: User = codecs
            .decode(ContentType::FormUrlEncoded.as_str(), b"name=Alice&age=30&tags=admin")
            .expect("decode");
        check!(back == alice());
    }

    #[test]
    fn text_typed_round_trip() {
        let codecs = CodecRegistry::default();
        for content_type in ["text/plain", "text/html", "application/xml"] {
            let bytes = codecs.encode(content_type, &42_u32).expect("encode");
            check!(codecs.decode::<u32>(content_type, &bytes).expect("decode") == 42);

            let bytes = codecs.encode(content_type, &true).expect("encode");
            check!(codecs.decode::<bool>(content_type, &bytes).expect("decode"));

            let bytes = codecs.encode(content_type, "-1.5").expect("encode");
            check!(codecs.decode::<String>(content_type, &bytes).expect("decode") == "-1.5");
            check!(codecs.decode::<f64>(content_type, &bytes).expect("decode") == -1.5);
        }

        let_assert!(
            Err(CodecError::DecodeFailed { content_type, .. }) =
                codecs.decode::<u32>("text/plain", b"forty-two")
        );
        check!(content_type == "text/plain");
    }

    #[test]
    fn json_stays_strict_about_scalars() {
        let codecs = CodecRegistry::default();
        let_assert!(
            Err(CodecError::DecodeFailed { .. }) = codecs.decode::<u32>("application/json", br#""3""#)
        );
    }

    #[test]
    fn text_codec_rejects_structures_and_invalid_utf8() {
        let codec = TextCodec::default();
        let_assert!(Err(CodecError::EncodeFailed { .. }) = codec.serialize(&json!({"a": 1})));
        let_assert!(Err(CodecError::DecodeFailed { .. }) = codec.deserialize(&[0xff, 0xfe]));
        check!(codec.serialize(&json!(7)).expect("number").as_ref() == b"7");
    }

    #[test]
    fn binary_codec_round_trip() {
        let codecs = CodecRegistry::default();
        let png = vec![0x89_u8, b'P', b'N', b'G'];

        let bytes = codecs.encode("image/png", &png).expect("encode");
        check!(bytes.as_ref() == png.as_slice());
        let back: Vec<u8> = codecs.decode("image/png", &bytes).expect("decode");
        check!(back == png);

        let bytes = codecs.encode("application/pdf", "%PDF").expect("string body");
        check!(bytes.as_ref() == b"%PDF");
        let_assert!(
            Err(CodecError::EncodeFailed { content_type, .. }) =
                codecs.encode("application/octet-stream", &[300_u16])
        );
        check!(content_type == "application/octet-stream");
    }

    #[test]
    fn default_registry_covers_every_content_type() {
        let codecs = CodecRegistry::default();
        for content_type in [
            ContentType::Json,
            ContentType::FormUrlEncoded,
            ContentType::PlainText,
            ContentType::Html,
            ContentType::Xml,
            ContentType::JavaScript,
            ContentType::MultipartFormData,
            ContentType::OctetStream,
            ContentType::Pdf,
            ContentType::Jpeg,
            ContentType::Png,
        ] {
            check!(codecs.contains(content_type.as_str()));
        }
        let js: String = codecs
            .decode("application/javascript", b"alert(1)")
            .expect("decode");
        check!(js == "alert(1)");
    }

    #[test]
    fn content_type_header_defaults_to_the_declared_type() {
        check!(JsonCodec.content_type_header("application/json") == "application/json");
        let multipart = MultipartCodec::with_boundary("B");
        check!(
            multipart.content_type_header("multipart/form-data")
                == "multipart/form-data; boundary=B"
        );
    }

    #[test]
    fn debug_lists_content_types() {
        let debug = format!("{:?}", CodecRegistry::default());
        check!(debug.contains("application/json"));
        check!(debug.contains("text/plain"));
    }
}
