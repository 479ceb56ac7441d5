//! `multipart/form-data` codec.
//!
//! Object fields become parts: scalars are text parts, arrays repeat the
//! field name, and a [`FilePart`] becomes a binary part with its filename and
//! content type. Any other nested value travels as an `application/json`
//! part.
//!
//! # Example
//!
//! ```
//! use latch_core::codec::{BodySerializer, FilePart, MultipartCodec};
//! use serde_json::json;
//!
//! let codec = MultipartCodec::with_boundary("XyZ");
//! let avatar = FilePart::new("me.png", vec![0x89, 0x50]);
//! let value = json!({ "name": "alice", "avatar": avatar });
//!
//! let body = codec.serialize(&value).expect("encode");
//! let text = String::from_utf8_lossy(&body);
//! assert!(text.contains("name=\"avatar\"; filename=\"me.png\"\r\nContent-Type: image/png"));
//! assert_eq!(
//!     codec.content_type_header("multipart/form-data"),
//!     "multipart/form-data; boundary=XyZ"
//! );
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::CodecError;
use crate::codec::{
    BodyDeserializer, BodySerializer, ContentType, content_type_essence, insert_repeated,
};

const CONTENT_TYPE: &str = ContentType::MultipartFormData.as_str();
const TEXT_PART: &str = "text/plain; charset=utf-8";

/// A file or binary field of a multipart body.
///
/// Serializes to `{"filename", "content_type", "data"}`; that exact shape is
/// what the codec turns into a binary part, and what binary parts decode to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilePart {
    /// File name sent in `Content-Disposition`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Content type of the part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Raw bytes.
    pub data: Vec<u8>,
}

impl FilePart {
    /// A file part; the content type is guessed from the file extension.
    #[must_use]
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename);
        Self {
            filename: Some(filename),
            content_type: Some(content_type.to_string()),
            data: data.into(),
        }
    }

    /// An anonymous `application/octet-stream` part.
    #[must_use]
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: None,
            content_type: Some(ContentType::OctetStream.as_str().to_string()),
            data: data.into(),
        }
    }

    /// Override the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

fn guess_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => ContentType::Jpeg.as_str(),
        "png" => ContentType::Png.as_str(),
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => ContentType::Pdf.as_str(),
        "txt" => ContentType::PlainText.as_str(),
        "html" | "htm" => ContentType::Html.as_str(),
        "js" => ContentType::JavaScript.as_str(),
        "json" => ContentType::Json.as_str(),
        "xml" => ContentType::Xml.as_str(),
        "csv" => "text/csv",
        "zip" => "application/zip",
        _ => ContentType::OctetStream.as_str(),
    }
}

/// One encoded part.
struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Part {
    fn text(name: &str, text: String) -> Self {
        Self {
            name: name.to_string(),
            filename: None,
            content_type: Some(TEXT_PART.to_string()),
            data: Bytes::from(text),
        }
    }

    fn from_value(name: &str, value: &Value) -> Result<Option<Self>, CodecError> {
        let part = match value {
            Value::Null => return Ok(None),
            Value::String(s) => Self::text(name, s.clone()),
            Value::Number(n) => Self::text(name, n.to_string()),
            Value::Bool(b) => Self::text(name, b.to_string()),
            Value::Object(_) => match FilePart::deserialize(value) {
                Ok(file) => Self {
                    name: name.to_string(),
                    filename: file.filename,
                    content_type: file.content_type,
                    data: Bytes::from(file.data),
                },
                Err(_) => Self::json(name, value)?,
            },
            Value::Array(_) => Self::json(name, value)?,
        };
        Ok(Some(part))
    }

    fn json(name: &str, value: &Value) -> Result<Self, CodecError> {
        let data =
            serde_json::to_vec(value).map_err(|e| CodecError::encode_failed(CONTENT_TYPE, e))?;
        Ok(Self {
            name: name.to_string(),
            filename: None,
            content_type: Some(ContentType::Json.as_str().to_string()),
            data: Bytes::from(data),
        })
    }
}

/// Quotes and line breaks cannot appear in a quoted header parameter.
fn escape_param(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Multipart form-data codec.
///
/// Every body this codec writes uses the codec's boundary, which is part of
/// the `Content-Type` header (see [`BodySerializer::content_type_header`]).
/// Decoding reads the boundary from the body's first delimiter line.
/// Decoded text parts are strings, so typed conversion parses numbers and
/// booleans back out of them.
#[derive(Debug, Clone)]
pub struct MultipartCodec {
    boundary: String,
}

impl Default for MultipartCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartCodec {
    /// A codec with a boundary derived from the current time.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// A codec with a fixed boundary.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
        }
    }

    /// The part delimiter.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    fn encode(&self, parts: &[Part]) -> Result<Bytes, CodecError> {
        let delimiter = format!("--{}", self.boundary);
        let mut buf = BytesMut::new();

        for part in parts {
            if find(&part.data, delimiter.as_bytes()).is_some() {
                return Err(CodecError::encode_failed(
                    CONTENT_TYPE,
                    format!("part '{}' contains the boundary", part.name),
                ));
            }

            buf.put_slice(delimiter.as_bytes());
            buf.put_slice(b"\r\nContent-Disposition: form-data; name=\"");
            buf.put_slice(escape_param(&part.name).as_bytes());
            buf.put_slice(b"\"");
            if let Some(filename) = &part.filename {
                buf.put_slice(b"; filename=\"");
                buf.put_slice(escape_param(filename).as_bytes());
                buf.put_slice(b"\"");
            }
            buf.put_slice(b"\r\n");
            if let Some(content_type) = &part.content_type {
                buf.put_slice(b"Content-Type: ");
                buf.put_slice(content_type.as_bytes());
                buf.put_slice(b"\r\n");
            }
            buf.put_slice(b"\r\n");
            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(delimiter.as_bytes());
        buf.put_slice(b"--\r\n");
        Ok(buf.freeze())
    }
}

fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    format!("----LatchBoundary{timestamp:x}")
}

impl BodySerializer for MultipartCodec {
    fn serialize(&self, value: &Value) -> Result<Bytes, CodecError> {
        let Value::Object(fields) = value else {
            return Err(CodecError::encode_failed(
                CONTENT_TYPE,
                "multipart bodies must be objects",
            ));
        };

        let mut parts = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            match value {
                Value::Array(items) => {
                    for item in items {
                        parts.extend(Part::from_value(name, item)?);
                    }
                }
                other => parts.extend(Part::from_value(name, other)?),
            }
        }
        self.encode(&parts)
    }

    fn content_type_header(&self, content_type: &str) -> String {
        format!("{}; boundary={}", content_type_essence(content_type), self.boundary)
    }
}

// ============================================================================
// Decoding
// ============================================================================

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn malformed(message: &str) -> CodecError {
    CodecError::decode_failed(CONTENT_TYPE, message)
}

/// Headers of one part, as found in its header block.
#[derive(Debug, Default)]
struct PartHeaders {
    name: Option<String>,
    filename: Option<String>,
    content_type: Option<String>,
}

impl PartHeaders {
    fn parse(block: &str) -> Self {
        let mut headers = Self::default();
        for line in block.split("\r\n") {
            let Some((header, value)) = line.split_once(':') else {
                continue;
            };
            let header = header.trim();
            if header.eq_ignore_ascii_case("content-type") {
                headers.content_type = Some(value.trim().to_string());
            } else if header.eq_ignore_ascii_case("content-disposition") {
                for param in value.split(';').skip(1) {
                    let Some((key, raw)) = param.split_once('=') else {
                        continue;
                    };
                    let raw = raw.trim().trim_matches('"').to_string();
                    match key.trim().to_ascii_lowercase().as_str() {
                        "name" => headers.name = Some(raw),
                        "filename" => headers.filename = Some(raw),
                        _ => {}
                    }
                }
            }
        }
        headers
    }
}

fn part_value(headers: PartHeaders, data: &[u8]) -> Result<Value, CodecError> {
    let essence = headers.content_type.as_deref().map(content_type_essence);
    if headers.filename.is_none() {
        if essence.as_deref() == Some(ContentType::Json.as_str()) {
            return serde_json::from_slice(data)
                .map_err(|e| CodecError::decode_failed(CONTENT_TYPE, e));
        }
        let textual = essence.as_deref().is_none_or(|e| e.starts_with("text/"));
        if let (true, Ok(text)) = (textual, std::str::from_utf8(data)) {
            return Ok(Value::String(text.to_string()));
        }
    }

    let file = FilePart {
        filename: headers.filename,
        content_type: headers.content_type,
        data: data.to_vec(),
    };
    serde_json::to_value(file).map_err(|e| CodecError::decode_failed(CONTENT_TYPE, e))
}

fn parse_part(part: &[u8]) -> Result<(String, Value), CodecError> {
    let (block, data) = if let Some(data) = part.strip_prefix(b"\r\n") {
        (&b""[..], data)
    } else {
        let end =
            find(part, b"\r\n\r\n").ok_or_else(|| malformed("part without a header block"))?;
        let (block, rest) = part.split_at(end);
        (block, rest.strip_prefix(b"\r\n\r\n").unwrap_or(rest))
    };

    let block =
        std::str::from_utf8(block).map_err(|e| CodecError::decode_failed(CONTENT_TYPE, e))?;
    let mut headers = PartHeaders::parse(block);
    let name = headers
        .name
        .take()
        .ok_or_else(|| malformed("part without a name"))?;
    Ok((name, part_value(headers, data)?))
}

impl BodyDeserializer for MultipartCodec {
    fn deserialize(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let line_end = find(bytes, b"\r\n").ok_or_else(|| malformed("missing boundary line"))?;
        let (delimiter, rest) = bytes.split_at(line_end);
        if !delimiter.starts_with(b"--") {
            return Err(malformed("body does not start with a boundary"));
        }

        let mut fields = Map::new();
        // a closing delimiter on the first line is an empty form
        if delimiter.len() > 4 && delimiter.ends_with(b"--") {
            return Ok(Value::Object(fields));
        }

        let separator = [&b"\r\n"[..], delimiter].concat();
        let mut rest = rest.strip_prefix(b"\r\n").unwrap_or(rest);
        loop {
            let end = find(rest, &separator).ok_or_else(|| malformed("unterminated part"))?;
            let (part, tail) = rest.split_at(end);
            let (name, value) = parse_part(part)?;
            insert_repeated(&mut fields, name, value);

            let tail = tail.strip_prefix(separator.as_slice()).unwrap_or(tail);
            if tail.starts_with(b"--") {
                return Ok(Value::Object(fields));
            }
            rest = tail
                .strip_prefix(b"\r\n")
                .ok_or_else(|| malformed("boundary not followed by a line break"))?;
        }
    }

    fn textual_scalars(&self) -> bool {
        true
    }
}
