//! The document tree.
//!
//! Nodes are stored in an arena owned by [`Document`] and addressed by
//! [`NodeId`]. Each slot holds the node's payload and its five structural
//! links, so navigation in any direction is a single lookup.
//!
//! Detaching a node never frees its slot. A `NodeId` taken from a selection
//! therefore stays readable after edits elsewhere in the tree; whether it is
//! still part of the document is answered by [`Document::is_attached`].

mod edit;
mod node;
mod walk;

pub use node::{Attribute, NodeKind};
pub use walk::DocumentOrder;

use std::num::NonZeroU32;

use crate::error::{ParseError, SourceLocation};

/// Handle to a node in a [`Document`].
///
/// Only meaningful for the document that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Slot `index` is stored as `index + 1`, keeping `Option<NodeId>` at
    /// four bytes.
    fn from_slot(index: usize) -> Self {
        u32::try_from(index + 1)
            .ok()
            .and_then(NonZeroU32::new)
            .map_or_else(|| panic!("node arena overflow at slot {index}"), Self)
    }

    fn slot(self) -> usize {
        self.0.get() as usize - 1
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Links {
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

#[derive(Debug, Clone)]
struct Slot {
    kind: NodeKind,
    links: Links,
}

/// A parsed (or built) XML document.
///
/// ```
/// use xmlsplice::Document;
///
/// let doc = Document::parse_str("<root><leaf/></root>").unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.node_name(root), Some("root"));
/// assert_eq!(doc.children(root).count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    /// `version` from the XML declaration; `None` if there was none.
    pub version: Option<String>,
    /// `encoding` from the XML declaration.
    pub encoding: Option<String>,
    /// `standalone` from the XML declaration.
    pub standalone: Option<bool>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document holding nothing but its document node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                kind: NodeKind::Document,
                links: Links::default(),
            }],
            version: None,
            encoding: None,
            standalone: None,
        }
    }

    /// Parses a complete document. A leading byte order mark is skipped.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the input is not well-formed XML.
    pub fn parse_str(input: &str) -> Result<Self, ParseError> {
        crate::parser::parse_str(input.strip_prefix('\u{FEFF}').unwrap_or(input))
    }

    /// Decodes `input` (BOM, then the declared encoding, then UTF-8) and
    /// parses the result.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` for undecodable bytes as well as for malformed
    /// XML.
    ///
    /// ```
    /// use xmlsplice::Document;
    ///
    /// let doc = Document::parse_bytes(b"\xEF\xBB\xBF<root/>").unwrap();
    /// assert!(doc.root_element().is_some());
    /// ```
    pub fn parse_bytes(input: &[u8]) -> Result<Self, ParseError> {
        match crate::encoding::decode_to_utf8(input) {
            Ok(text) => crate::parser::parse_str(&text),
            Err(e) => Err(ParseError::new(e.to_string(), SourceLocation::default())),
        }
    }

    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.slot()]
    }

    fn links(&self, id: NodeId) -> &Links {
        &self.slot(id).links
    }

    fn links_mut(&mut self, id: NodeId) -> &mut Links {
        &mut self.slots[id.slot()].links
    }

    /// The document node, parent of the root element and of any prolog or
    /// epilogue comments and PIs.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::from_slot(0)
    }

    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .find(|&id| self.node_kind(id).is_element())
    }

    #[must_use]
    pub fn node_kind(&self, id: NodeId) -> &NodeKind {
        &self.slot(id).kind
    }

    /// Element name or PI target.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        match self.node_kind(id) {
            NodeKind::Element { name, .. } => Some(name),
            NodeKind::ProcessingInstruction { target, .. } => Some(target),
            _ => None,
        }
    }

    /// The literal content of a text, CDATA, comment or PI node.
    #[must_use]
    pub fn node_text(&self, id: NodeId) -> Option<&str> {
        match self.node_kind(id) {
            NodeKind::Text { content }
            | NodeKind::CData { content }
            | NodeKind::Comment { content } => Some(content),
            NodeKind::ProcessingInstruction { data, .. } => data.as_deref(),
            NodeKind::Document | NodeKind::Element { .. } => None,
        }
    }

    /// The string-value: all descendant text and CDATA for documents and
    /// elements, the node's own text otherwise.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        if !self.node_kind(id).can_have_children() {
            return self.node_text(id).unwrap_or_default().to_string();
        }
        let mut out = String::new();
        for d in self.descendants(id) {
            if let NodeKind::Text { content } | NodeKind::CData { content } = self.node_kind(d) {
                out.push_str(content);
            }
        }
        out
    }

    /// Attributes of an element; empty for every other kind.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        if let NodeKind::Element { attributes, .. } = self.node_kind(id) {
            attributes
        } else {
            &[]
        }
    }

    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find_map(|a| (a.name == name).then_some(a.value.as_str()))
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.links(id).parent
    }

    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.links(id).first_child
    }

    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.links(id).last_child
    }

    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.links(id).next_sibling
    }

    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.links(id).prev_sibling
    }

    /// Slots in the arena, detached nodes included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.slots.len()
    }
}

/// Parsed content with any number of top-level nodes, as used for the
/// payload of an append.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    doc: Document,
}

impl Fragment {
    pub(crate) fn from_document(doc: Document) -> Self {
        Self { doc }
    }

    /// Parses fragment content. A leading byte order mark is skipped.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the content is not well-formed.
    ///
    /// ```
    /// use xmlsplice::tree::Fragment;
    ///
    /// let frag = Fragment::parse_str("<a/>text<b/>").unwrap();
    /// assert_eq!(frag.top_level().count(), 3);
    /// ```
    pub fn parse_str(input: &str) -> Result<Self, ParseError> {
        crate::parser::parse_fragment(input.strip_prefix('\u{FEFF}').unwrap_or(input))
    }

    /// The holding document; the fragment's nodes are children of its
    /// document node.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn top_level(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.doc.children(self.doc.root())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doc.first_child(self.doc.root()).is_none()
    }

    /// Nodes added to a document by one copy of the fragment.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.doc.descendants(self.doc.root()).count()
    }
}

/// `true` if `s` consists only of XML whitespace (or is empty).
pub(crate) fn is_xml_whitespace(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
}
