//! Node payloads.

/// A `name="value"` pair on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name as written; prefixes are not resolved.
    pub name: String,
    /// Value with references already expanded.
    pub value: String,
}

impl Attribute {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// What a node is, together with the data only that kind of node carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The single node at the top of every [`Document`](super::Document).
    Document,
    Element {
        name: String,
        /// Source order, no duplicate names.
        attributes: Vec<Attribute>,
    },
    /// Character data with references resolved.
    Text { content: String },
    /// The body of a `<![CDATA[...]]>` section, verbatim.
    CData { content: String },
    /// The text between `<!--` and `-->`.
    Comment { content: String },
    ProcessingInstruction {
        target: String,
        /// `None` when nothing follows the target.
        data: Option<String>,
    },
}

impl NodeKind {
    /// An element with no attributes.
    #[must_use]
    pub fn element(name: impl Into<String>) -> Self {
        Self::Element {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }

    /// Document and element nodes; nothing else takes children.
    #[must_use]
    pub fn can_have_children(&self) -> bool {
        matches!(self, Self::Document | Self::Element { .. })
    }

    /// Lowercase name of the kind, for messages.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Element { .. } => "element",
            Self::Text { .. } => "text",
            Self::CData { .. } => "cdata",
            Self::Comment { .. } => "comment",
            Self::ProcessingInstruction { .. } => "processing instruction",
        }
    }
}
