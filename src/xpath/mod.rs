//! Path selection over a [`Document`].
//!
//! Supports the location-path subset of `XPath` 1.0 needed to address nodes
//! for editing: absolute and relative paths, `//`, `.` and `..`, the
//! principal axes, name, wildcard and node-type tests, and predicates
//! built from positions, attribute and child comparisons, `and`, `or` and
//! a handful of core functions.
//!
//! # Quick Start
//!
//! ```
//! use xmlsplice::Document;
//! use xmlsplice::xpath::{select, NodeRef};
//!
//! let doc = Document::parse_str("<r><i id=\"1\"/><i id=\"2\"/></r>").unwrap();
//! let hits = select(&doc, "//i[@id='2']").unwrap();
//! assert_eq!(hits.len(), 1);
//! assert!(matches!(hits[0], NodeRef::Node(_)));
//! ```
//!
//! Relative paths are evaluated with the document node as context, so
//! `r/i` and `/r/i` select the same nodes.
//!
//! # Submodules
//!
//! - [`lexer`]: tokenizer with byte offsets.
//! - [`ast`]: parsed expression types.
//! - [`parser`]: recursive descent parser.
//! - [`eval`]: evaluator producing document-ordered node lists.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;

use std::fmt;
use std::str::FromStr;

use log::debug;

pub use eval::{Evaluator, Value};

use crate::tree::{Document, NodeId};

/// An error from compiling a path expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The expression is malformed or uses an unsupported construct.
    #[error("invalid path expression at position {position}: {message}")]
    Syntax {
        /// What went wrong.
        message: String,
        /// 0-based byte offset into the expression.
        position: usize,
    },
    /// The expression is well formed but does not select nodes.
    #[error("path expression must select nodes, but it evaluates to a {kind}")]
    NotANodeSet {
        /// The static result type (`"number"`, `"string"` or `"boolean"`).
        kind: &'static str,
    },
}

impl PathError {
    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            position,
        }
    }
}

/// A selected node: either a tree node or an attribute of an element.
///
/// Attributes are not tree nodes in [`Document`], so they are addressed by
/// their owning element and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeRef {
    /// A node in the document arena.
    Node(NodeId),
    /// The attribute `name` on element `owner`.
    Attribute {
        /// The element carrying the attribute.
        owner: NodeId,
        /// The attribute's qualified name.
        name: String,
    },
}

impl NodeRef {
    /// The tree node, if this is not an attribute.
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(*id),
            Self::Attribute { .. } => None,
        }
    }

    /// The tree node this reference lives on: itself, or an attribute's owner.
    #[must_use]
    pub fn anchor(&self) -> NodeId {
        match self {
            Self::Node(id) | Self::Attribute { owner: id, .. } => *id,
        }
    }
}

/// A compiled path expression that is known to select nodes.
///
/// # Examples
///
/// ```
/// use xmlsplice::Document;
/// use xmlsplice::xpath::Selector;
///
/// let selector: Selector = "//b".parse().unwrap();
/// let doc = Document::parse_str("<a><b/><b/></a>").unwrap();
/// assert_eq!(selector.select(&doc).len(), 2);
/// assert!("count(//b)".parse::<Selector>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    expr: ast::Expr,
}

impl Selector {
    /// Compiles `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Syntax`] if the expression does not parse and
    /// [`PathError::NotANodeSet`] if it evaluates to a number, string or
    /// boolean.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let expr = parser::parse(path)?;
        if !expr.is_node_set() {
            return Err(PathError::NotANodeSet { kind: expr.kind() });
        }
        Ok(Self {
            source: path.to_string(),
            expr,
        })
    }

    /// Selects matching nodes, deduplicated and in document order.
    #[must_use]
    pub fn select(&self, doc: &Document) -> Vec<NodeRef> {
        let nodes = Evaluator::new(doc).select(&self.expr);
        debug!(target: "xmlsplice::xpath", "'{}' selected {} node(s)", self.source, nodes.len());
        nodes
    }

    /// The expression text this selector was compiled from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The parsed expression.
    #[must_use]
    pub fn expr(&self) -> &ast::Expr {
        &self.expr
    }
}

impl FromStr for Selector {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compiles `path` and selects matching nodes from `doc`.
///
/// # Errors
///
/// See [`Selector::parse`].
pub fn select(doc: &Document, path: &str) -> Result<Vec<NodeRef>, PathError> {
    Ok(Selector::parse(path)?.select(doc))
}
