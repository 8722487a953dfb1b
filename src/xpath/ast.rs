//! Abstract syntax tree for parsed path expressions.
//!
//! The parser in [`super::parser`] produces an [`Expr`]; the evaluator in
//! [`super::eval`] walks it. Every function name and arity is validated at
//! parse time, so evaluation never sees an unknown function.

use std::fmt;

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A numeric literal such as `3` or `1.5`.
    Number(f64),

    /// A string literal such as `'abc'`.
    Literal(String),

    /// A binary boolean or comparison operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },

    /// A call to one of the supported core functions.
    Call {
        /// The function being called.
        function: Function,
        /// Argument expressions.
        args: Vec<Expr>,
    },

    /// A location path.
    Path(LocationPath),

    /// A node-set expression filtered by predicates, e.g. `(//a)[1]`.
    Filter {
        /// The node-set expression being filtered.
        expr: Box<Expr>,
        /// Predicates applied in document order.
        predicates: Vec<Expr>,
    },

    /// The `|` union of two node-set expressions.
    Union(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Returns `true` if the expression statically evaluates to a node-set.
    #[must_use]
    pub fn is_node_set(&self) -> bool {
        matches!(self, Self::Path(_) | Self::Filter { .. } | Self::Union(..))
    }

    /// Describes the static result type, for error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Literal(_) => "string",
            Self::Binary { .. } => "boolean",
            Self::Call { function, .. } => function.result_kind(),
            Self::Path(_) | Self::Filter { .. } | Self::Union(..) => "node-set",
        }
    }
}

/// Binary operators, from lowest to highest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `or`
    Or,
    /// `and`
    And,
    /// `=`
    Eq,
    /// `!=`
    Neq,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        };
        f.write_str(s)
    }
}

/// The core functions available inside predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `last()`
    Last,
    /// `position()`
    Position,
    /// `count(node-set)`
    Count,
    /// `not(value)`
    Not,
    /// `true()`
    True,
    /// `false()`
    False,
    /// `name(node-set?)`
    Name,
    /// `local-name(node-set?)`
    LocalName,
    /// `string(value?)`
    String,
    /// `normalize-space(value?)`
    NormalizeSpace,
    /// `string-length(value?)`
    StringLength,
    /// `contains(a, b)`
    Contains,
    /// `starts-with(a, b)`
    StartsWith,
}

impl Function {
    /// Looks up a function by its name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let f = match name {
            "last" => Self::Last,
            "position" => Self::Position,
            "count" => Self::Count,
            "not" => Self::Not,
            "true" => Self::True,
            "false" => Self::False,
            "name" => Self::Name,
            "local-name" => Self::LocalName,
            "string" => Self::String,
            "normalize-space" => Self::NormalizeSpace,
            "string-length" => Self::StringLength,
            "contains" => Self::Contains,
            "starts-with" => Self::StartsWith,
            _ => return None,
        };
        Some(f)
    }

    /// The function's name as written in an expression.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Last => "last",
            Self::Position => "position",
            Self::Count => "count",
            Self::Not => "not",
            Self::True => "true",
            Self::False => "false",
            Self::Name => "name",
            Self::LocalName => "local-name",
            Self::String => "string",
            Self::NormalizeSpace => "normalize-space",
            Self::StringLength => "string-length",
            Self::Contains => "contains",
            Self::StartsWith => "starts-with",
        }
    }

    /// Accepted argument counts as an inclusive range.
    #[must_use]
    pub fn arity(self) -> (usize, usize) {
        match self {
            Self::Last | Self::Position | Self::True | Self::False => (0, 0),
            Self::Count | Self::Not => (1, 1),
            Self::Name
            | Self::LocalName
            | Self::String
            | Self::NormalizeSpace
            | Self::StringLength => (0, 1),
            Self::Contains | Self::StartsWith => (2, 2),
        }
    }

    /// Whether every argument must be a node-set expression.
    #[must_use]
    pub fn takes_node_set(self) -> bool {
        matches!(self, Self::Count | Self::Name | Self::LocalName)
    }

    fn result_kind(self) -> &'static str {
        match self {
            Self::Last | Self::Position | Self::Count | Self::StringLength => "number",
            Self::Not | Self::True | Self::False | Self::Contains | Self::StartsWith => "boolean",
            Self::Name | Self::LocalName | Self::String | Self::NormalizeSpace => "string",
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A location path: a sequence of steps, optionally anchored at the
/// document node.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    /// `true` for paths starting with `/` or `//`.
    pub absolute: bool,
    /// Steps applied left to right.
    pub steps: Vec<Step>,
}

/// A single location step: `axis::node-test[predicate]*`.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// The axis to walk.
    pub axis: Axis,
    /// Which nodes on the axis to keep.
    pub node_test: NodeTest,
    /// Predicates filtering the kept nodes.
    pub predicates: Vec<Expr>,
}

impl Step {
    /// The step `//` abbreviates: `descendant-or-self::node()`.
    #[must_use]
    pub fn descendant_or_self() -> Self {
        Self {
            axis: Axis::DescendantOrSelf,
            node_test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

/// Supported axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// `child::`
    Child,
    /// `descendant::`
    Descendant,
    /// `descendant-or-self::`
    DescendantOrSelf,
    /// `self::`
    SelfAxis,
    /// `parent::`
    Parent,
    /// `ancestor::`
    Ancestor,
    /// `ancestor-or-self::`
    AncestorOrSelf,
    /// `following-sibling::`
    FollowingSibling,
    /// `preceding-sibling::`
    PrecedingSibling,
    /// `following::`
    Following,
    /// `preceding::`
    Preceding,
    /// `attribute::` or `@`
    Attribute,
}

impl Axis {
    /// Parses an axis name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let axis = match name {
            "child" => Self::Child,
            "descendant" => Self::Descendant,
            "descendant-or-self" => Self::DescendantOrSelf,
            "self" => Self::SelfAxis,
            "parent" => Self::Parent,
            "ancestor" => Self::Ancestor,
            "ancestor-or-self" => Self::AncestorOrSelf,
            "following-sibling" => Self::FollowingSibling,
            "preceding-sibling" => Self::PrecedingSibling,
            "following" => Self::Following,
            "preceding" => Self::Preceding,
            "attribute" => Self::Attribute,
            _ => return None,
        };
        Some(axis)
    }

    /// Reverse axes number their nodes nearest-first for `position()`.
    #[must_use]
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Self::Parent | Self::Ancestor | Self::AncestorOrSelf | Self::PrecedingSibling | Self::Preceding
        )
    }
}

/// Node tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// A name test; matches elements, or attributes on the attribute axis.
    Name(String),
    /// `*`
    Wildcard,
    /// `node()`
    Node,
    /// `text()`; matches text and CDATA nodes.
    Text,
    /// `comment()`
    Comment,
    /// `processing-instruction()` with an optional target literal.
    ProcessingInstruction(Option<String>),
}
