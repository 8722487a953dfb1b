//! Text to tree.
//!
//! [`parse_str`] accepts a complete document with exactly one root element;
//! [`parse_fragment`] accepts bare content such as `<a/>text<b/>`, which is
//! what an append splices in. Both are recursive descent over already
//! decoded text, and a failure simply drops the half-built arena.

pub(crate) mod chars;
mod cursor;
mod xml;

use crate::error::ParseError;
use crate::tree::{Document, Fragment};

const DEFAULT_MAX_DEPTH: u32 = 256;
const DEFAULT_MAX_ATTRIBUTES: u32 = 1024;
const DEFAULT_MAX_NAME_LENGTH: usize = 50_000;
const DEFAULT_MAX_NODES: usize = 10_000_000;

/// Whitespace handling and the limits that keep hostile input bounded.
///
/// ```
/// use xmlsplice::parser::ParseOptions;
///
/// let strict = ParseOptions::default().max_depth(32).max_nodes(10_000);
/// assert_eq!(strict.max_depth, 32);
/// assert!(!strict.no_blanks);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Discard text nodes made only of whitespace.
    pub no_blanks: bool,
    /// Deepest element nesting accepted. Default 256.
    pub max_depth: u32,
    /// Most attributes on one element. Default 1024.
    pub max_attributes: u32,
    /// Longest element or attribute name, in bytes. Default 50 000.
    pub max_name_length: usize,
    /// Most nodes one parse may create. Default ten million.
    pub max_nodes: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            no_blanks: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_attributes: DEFAULT_MAX_ATTRIBUTES,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

impl ParseOptions {
    #[must_use]
    pub fn no_blanks(self, no_blanks: bool) -> Self {
        Self { no_blanks, ..self }
    }

    #[must_use]
    pub fn max_depth(self, max_depth: u32) -> Self {
        Self { max_depth, ..self }
    }

    #[must_use]
    pub fn max_attributes(self, max_attributes: u32) -> Self {
        Self {
            max_attributes,
            ..self
        }
    }

    #[must_use]
    pub fn max_name_length(self, max_name_length: usize) -> Self {
        Self {
            max_name_length,
            ..self
        }
    }

    #[must_use]
    pub fn max_nodes(self, max_nodes: usize) -> Self {
        Self { max_nodes, ..self }
    }
}

/// [`parse_str_with_options`] with the defaults.
///
/// # Errors
///
/// Returns `ParseError` for input that is not a well-formed document.
pub fn parse_str(input: &str) -> Result<Document, ParseError> {
    parse_str_with_options(input, &ParseOptions::default())
}

/// Parses a complete document.
///
/// # Errors
///
/// Returns `ParseError` for input that is not a well-formed document or
/// that exceeds one of the limits in `options`.
pub fn parse_str_with_options(input: &str, options: &ParseOptions) -> Result<Document, ParseError> {
    xml::XmlParser::new(input, options).parse()
}

/// [`parse_fragment_with_options`] with the defaults.
///
/// # Errors
///
/// Returns `ParseError` for content that is not well-formed.
///
/// ```
/// use xmlsplice::parser::parse_fragment;
///
/// let frag = parse_fragment("<a/>between<b/>").unwrap();
/// assert_eq!(frag.top_level().count(), 3);
/// ```
pub fn parse_fragment(input: &str) -> Result<Fragment, ParseError> {
    parse_fragment_with_options(input, &ParseOptions::default())
}

/// Parses content that may have zero, one or many top-level nodes, text
/// included. A leading XML declaration is accepted and ignored.
///
/// # Errors
///
/// Returns `ParseError` for content that is not well-formed or that
/// exceeds one of the limits in `options`.
pub fn parse_fragment_with_options(
    input: &str,
    options: &ParseOptions,
) -> Result<Fragment, ParseError> {
    xml::XmlParser::new(input, options).parse_fragment()
}
