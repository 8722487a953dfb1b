//! Error types for every stage of a path-driven edit.
//!
//! Parse errors carry line, column and byte offset information for precise
//! diagnostics. The remaining stages (selection, mutation, serialization and
//! resource limits) each have their own error type, and [`Error`] gathers all
//! of them for the operations in [`crate::ops`].

use std::fmt;

pub use crate::xpath::PathError;

/// A position in parser input. Line and column count from 1, columns in
/// characters; the byte offset counts from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub byte_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { line, column, .. } = self;
        write!(f, "{line}:{column}")
    }
}

/// Input that is not well-formed XML, or that hit a parser limit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at {location}: {message}")]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// Which input of an operation failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseContext {
    /// The document being edited or queried.
    Document,
    /// The fragment being appended.
    Fragment,
}

impl fmt::Display for ParseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Document => "document",
            Self::Fragment => "fragment",
        })
    }
}

/// A structural edit was refused because it would break a tree invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("mutation error: {message}")]
pub struct MutationError {
    /// What the edit would have violated.
    pub message: String,
}

impl MutationError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A node could not be rendered as well-formed XML.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("serialization error: {message}")]
pub struct SerializationError {
    /// Why the node is unrenderable.
    pub message: String,
}

impl SerializationError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A configured resource limit was exceeded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("resource limit exceeded: {message}")]
pub struct ResourceError {
    /// Which limit was hit and by how much.
    pub message: String,
}

impl ResourceError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Any failure of a façade operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The document or fragment is not well-formed.
    #[error("invalid XML {context}: {source}")]
    Parse {
        /// Which input was malformed.
        context: ParseContext,
        /// The underlying parser error.
        #[source]
        source: ParseError,
    },
    /// The path expression is invalid or does not select nodes.
    #[error(transparent)]
    Path(#[from] PathError),
    /// An edit would break a document invariant.
    #[error(transparent)]
    Mutation(#[from] MutationError),
    /// A node could not be rendered.
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    /// A size limit was exceeded.
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

impl Error {
    /// Wraps a parse error of the edited document.
    #[must_use]
    pub fn document(source: ParseError) -> Self {
        Self::Parse {
            context: ParseContext::Document,
            source,
        }
    }

    /// Wraps a parse error of an appended fragment.
    #[must_use]
    pub fn fragment(source: ParseError) -> Self {
        Self::Parse {
            context: ParseContext::Fragment,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_error_display_includes_position() {
        let at = SourceLocation {
            line: 3,
            column: 7,
            byte_offset: 20,
        };
        assert_eq!(at.to_string(), "3:7");
        let err = ParseError::new("unexpected end of input", at);
        assert_eq!(err.to_string(), "parse error at 3:7: unexpected end of input");
    }

    #[test]
    fn test_error_display_names_failed_input() {
        let err = Error::fragment(ParseError::new("bad", SourceLocation::default()));
        assert_eq!(err.to_string(), "invalid XML fragment: parse error at 0:0: bad");
        let err = Error::document(ParseError::new("bad", SourceLocation::default()));
        assert!(err.to_string().starts_with("invalid XML document"));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error as _;
        let err = Error::document(ParseError::new("bad", SourceLocation::default()));
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("parse error at 0:0: bad"));
    }

    #[test]
    fn test_component_errors_convert() {
        let err: Error = MutationError::new("cycle").into();
        assert_eq!(err.to_string(), "mutation error: cycle");
        let err: Error = ResourceError::new("too big").into();
        assert_eq!(err.to_string(), "resource limit exceeded: too big");
        let err: Error = SerializationError::new("bad comment").into();
        assert_eq!(err.to_string(), "serialization error: bad comment");
    }
}
