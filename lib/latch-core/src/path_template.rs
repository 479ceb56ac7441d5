//! Path templates such as `/users/{id}/posts/{post_id}`.

use std::collections::{HashMap, HashSet};
use std::fmt;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::BindingError;

/// Characters encoded in a substituted path segment.
///
/// Unreserved characters and sub-delimiters pass through; anything that
/// would change the shape of the URL (`/`, `?`, `#`, `%`, ...) is encoded.
pub const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\')
    .add(b'%');

/// One piece of a parsed path template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Text copied verbatim into the URL.
    Literal(String),
    /// A named value substituted at call time.
    Placeholder(String),
}

/// A parsed path template.
///
/// Literal text and `{name}` placeholders, in order. Placeholder names are
/// unique within a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::MalformedTemplate`] on unbalanced or nested
    /// braces, empty or invalid placeholder names, and duplicate placeholders.
    pub fn parse(template: &str) -> Result<Self, BindingError> {
        let malformed = |reason: String| BindingError::MalformedTemplate {
            template: template.to_string(),
            reason,
        };

        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        let mut literal = String::new();
        let mut placeholder: Option<String> = None;

        for (pos, ch) in template.char_indices() {
            if let Some(name) = placeholder.as_mut() {
                match ch {
                    '{' => return Err(malformed(format!("nested '{{' at offset {pos}"))),
                    '}' => {
                        let name = std::mem::take(name);
                        placeholder = None;
                        if name.is_empty() {
                            return Err(malformed(format!("empty placeholder at offset {pos}")));
                        }
                        if !seen.insert(name.clone()) {
                            return Err(malformed(format!("duplicate placeholder '{name}'")));
                        }
                        segments.push(Segment::Placeholder(name));
                    }
                    ch if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.') => {
                        name.push(ch);
                    }
                    ch => {
                        return Err(malformed(format!(
                            "invalid character {ch:?} in placeholder at offset {pos}"
                        )));
                    }
                }
                continue;
            }

            match ch {
                '{' => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    placeholder = Some(String::new());
                }
                '}' => return Err(malformed(format!("unbalanced '}}' at offset {pos}"))),
                ch => literal.push(ch),
            }
        }

        if placeholder.is_some() {
            return Err(malformed("unclosed '{'".to_string()));
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    /// The template as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed segments, in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Returns `true` if the template declares the placeholder.
    #[must_use]
    pub fn has_placeholder(&self, name: &str) -> bool {
        self.placeholders().any(|p| p == name)
    }

    /// Substitute every placeholder with its percent-encoded value.
    ///
    /// Literal segments are copied unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::UnboundPlaceholder`] if a placeholder has no
    /// value and [`BindingError::DotPathSegment`] for a `.` or `..` value.
    /// `%` is always encoded, so `%2e` style spellings cannot form a dot
    /// segment either.
    pub fn expand(&self, values: &HashMap<&str, String>) -> Result<String, BindingError> {
        let mut path = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Placeholder(name) => {
                    let value = values.get(name.as_str()).ok_or_else(|| {
                        BindingError::UnboundPlaceholder { name: name.clone() }
                    })?;
                    if matches!(value.as_str(), "." | "..") {
                        return Err(BindingError::DotPathSegment {
                            name: name.clone(),
                            value: value.clone(),
                        });
                    }
                    path.extend(utf8_percent_encode(value, PATH_SEGMENT_ENCODE_SET));
                }
            }
        }
        Ok(path)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl AsRef<str> for PathTemplate {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}
