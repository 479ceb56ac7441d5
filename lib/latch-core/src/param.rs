//! Parameter roles.
//!
//! Each declared parameter of a bound method has exactly one role deciding
//! where its argument lands in the outgoing request.

use std::fmt;

/// Where a parameter is sent in the HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamRole {
    /// Substituted into a path placeholder (e.g., `/users/{id}`).
    Path,
    /// Appended to the query string (e.g., `?limit=10`).
    Query,
    /// Sent as a request header.
    Header,
    /// Serialized as the request body.
    Body,
    /// Accepted by the method but not sent.
    Ignored,
}

impl fmt::Display for ParamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => write!(f, "path"),
            Self::Query => write!(f, "query"),
            Self::Header => write!(f, "header"),
            Self::Body => write!(f, "body"),
            Self::Ignored => write!(f, "ignored"),
        }
    }
}

/// How array values of a query parameter are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CollectionFormat {
    /// Repeated parameters: `?tags=a&tags=b&tags=c` (default)
    #[default]
    Multi,
    /// Comma-separated: `?tags=a,b,c`
    Csv,
    /// Space-separated: `?tags=a%20b%20c`
    Ssv,
    /// Pipe-separated: `?tags=a|b|c`
    Pipes,
}

impl CollectionFormat {
    /// The separator joining values, or `None` for repeated parameters.
    #[must_use]
    pub const fn separator(self) -> Option<&'static str> {
        match self {
            Self::Multi => None,
            Self::Csv => Some(","),
            Self::Ssv => Some(" "),
            Self::Pipes => Some("|"),
        }
    }
}

/// A declared parameter: its wire name and its role.
///
/// For PATH parameters the name is the placeholder name; for QUERY and
/// HEADER parameters it is the query key or header name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamSpec {
    name: String,
    role: ParamRole,
    format: CollectionFormat,
}

impl ParamSpec {
    /// Create a parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, role: ParamRole) -> Self {
        Self {
            name: name.into(),
            role,
            format: CollectionFormat::default(),
        }
    }

    /// Set the collection format used for array values.
    #[must_use]
    pub const fn with_format(mut self, format: CollectionFormat) -> Self {
        self.format = format;
        self
    }

    /// Wire name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role.
    #[must_use]
    pub const fn role(&self) -> ParamRole {
        self.role
    }

    /// Collection format for array values.
    #[must_use]
    pub const fn format(&self) -> CollectionFormat {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_role_display() {
        assert_eq!(ParamRole::Path.to_string(), "path");
        assert_eq!(ParamRole::Query.to_string(), "query");
        assert_eq!(ParamRole::Header.to_string(), "header");
        assert_eq!(ParamRole::Body.to_string(), "body");
        assert_eq!(ParamRole::Ignored.to_string(), "ignored");
    }

    #[test]
    fn collection_format_separator() {
        assert_eq!(CollectionFormat::Multi.separator(), None);
        assert_eq!(CollectionFormat::Csv.separator(), Some(","));
        assert_eq!(CollectionFormat::Ssv.separator(), Some(" "));
        assert_eq!(CollectionFormat::Pipes.separator(), Some("|"));
    }

    #[test]
    fn param_spec_construction() {
        let param = ParamSpec::new("tags", ParamRole::Query).with_format(CollectionFormat::Csv);
        assert_eq!(param.name(), "tags");
        assert_eq!(param.role(), ParamRole::Query);
        assert_eq!(param.format(), CollectionFormat::Csv);
        assert_eq!(
            ParamSpec::new("id", ParamRole::Path).format(),
            CollectionFormat::Multi
        );
    }
}
