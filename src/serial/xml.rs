//! XML serializer.
//!
//! Renders a `Document`, or a single selected node, back into XML text.
//! Without indentation the output reproduces stored text exactly, so a
//! parsed document serializes back to its source modulo the normalizations
//! the parser applies (entity expansion, attribute quoting, empty-element
//! form).

use std::fmt::Write as _;

use crate::error::SerializationError;
use crate::parser::chars::{is_xml_char, is_xml_name};
use crate::tree::{is_xml_whitespace, Document, NodeId, NodeKind};
use crate::xpath::NodeRef;

/// When to write the `<?xml ...?>` declaration for a whole document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeclarationPolicy {
    /// Always write a declaration.
    Always,
    /// Write a declaration only if the parsed source had one.
    #[default]
    Preserve,
    /// Never write a declaration.
    Never,
}

/// Options controlling XML serialization output.
///
/// # Examples
///
/// ```
/// use xmlsplice::Document;
/// use xmlsplice::serial::{serialize_with_options, SerializeOptions};
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// let xml = serialize_with_options(&doc, &SerializeOptions::default().indent(true));
/// assert!(xml.contains("  <child>"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Declaration policy for whole-document output.
    /// Defaults to [`DeclarationPolicy::Preserve`].
    pub declaration: DeclarationPolicy,
    /// Whether to produce indented (pretty-printed) output.
    /// Defaults to `false`.
    pub indent: bool,
    /// The indentation string used for each level when `indent` is `true`.
    /// Defaults to two spaces.
    pub indent_str: String,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            declaration: DeclarationPolicy::default(),
            indent: false,
            indent_str: "  ".to_string(),
        }
    }
}

impl SerializeOptions {
    /// Sets the declaration policy.
    #[must_use]
    pub fn declaration(mut self, policy: DeclarationPolicy) -> Self {
        self.declaration = policy;
        self
    }

    /// Enables or disables indented output.
    ///
    /// Only elements whose children are all elements, comments, PIs or
    /// whitespace are indented; mixed content is written as stored.
    #[must_use]
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the indentation string used for each nesting level.
    #[must_use]
    pub fn indent_str(mut self, s: &str) -> Self {
        self.indent_str = s.to_string();
        self
    }
}

/// Serializes a document to an XML string with default options.
///
/// # Examples
///
/// ```
/// use xmlsplice::Document;
/// use xmlsplice::serial::serialize;
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// assert_eq!(serialize(&doc), "<root><child>Hello</child></root>");
/// ```
#[must_use]
pub fn serialize(doc: &Document) -> String {
    serialize_with_options(doc, &SerializeOptions::default())
}

/// Serializes a document to an XML string with the given options.
///
/// Nodes built through the tree API that cannot be represented in XML
/// (for example a comment containing `--`) are written as stored; use
/// [`try_serialize`] to reject them instead.
#[must_use]
pub fn serialize_with_options(doc: &Document, options: &SerializeOptions) -> String {
    let mut writer = Writer::new(doc, options);
    writer.document();
    writer.out
}

/// Serializes a document, first checking that every attached node can be
/// represented in well-formed XML.
///
/// # Errors
///
/// Returns `SerializationError` naming the first unrenderable node.
pub fn try_serialize(doc: &Document, options: &SerializeOptions) -> Result<String, SerializationError> {
    check_subtree(doc, doc.root())?;
    Ok(serialize_with_options(doc, options))
}

/// Serializes one selected node.
///
/// A tree node renders as its markup (the whole document for the document
/// node); an attribute renders as ` name="value"`, the way it appears
/// inside a start tag.
///
/// # Errors
///
/// Returns `SerializationError` if the node is detached from the document,
/// the attribute does not exist, or the subtree contains a node that
/// cannot be represented in XML.
///
/// # Examples
///
/// ```
/// use xmlsplice::Document;
/// use xmlsplice::serial::{serialize_node, SerializeOptions};
/// use xmlsplice::xpath::select;
///
/// let doc = Document::parse_str("<r><a k=\"v\">x</a></r>").unwrap();
/// let opts = SerializeOptions::default();
/// let hits = select(&doc, "//a | //a/@k").unwrap();
/// assert_eq!(serialize_node(&doc, &hits[0], &opts).unwrap(), "<a k=\"v\">x</a>");
/// assert_eq!(serialize_node(&doc, &hits[1], &opts).unwrap(), " k=\"v\"");
/// ```
pub fn serialize_node(
    doc: &Document,
    node: &NodeRef,
    options: &SerializeOptions,
) -> Result<String, SerializationError> {
    if !doc.is_attached(node.anchor()) {
        return Err(SerializationError::new("cannot serialize a detached node"));
    }
    match node {
        NodeRef::Attribute { owner, name } => {
            let value = doc.attribute(*owner, name).ok_or_else(|| {
                SerializationError::new(format!("attribute '{name}' no longer exists"))
            })?;
            check_attribute(name, value)?;
            let mut out = String::with_capacity(name.len() + value.len() + 4);
            write_attribute(&mut out, name, value);
            Ok(out)
        }
        NodeRef::Node(id) => {
            if matches!(doc.node_kind(*id), NodeKind::Document) {
                return try_serialize(doc, options);
            }
            check_subtree(doc, *id)?;
            let mut writer = Writer::new(doc, options);
            writer.subtree(*id, 0, false);
            Ok(writer.out)
        }
    }
}

// --- Validation ---

fn check_subtree(doc: &Document, id: NodeId) -> Result<(), SerializationError> {
    check_node(doc, id)?;
    for d in doc.descendants(id) {
        check_node(doc, d)?;
    }
    Ok(())
}

fn check_node(doc: &Document, id: NodeId) -> Result<(), SerializationError> {
    match doc.node_kind(id) {
        NodeKind::Document => Ok(()),
        NodeKind::Element { name, attributes } => {
            if !is_xml_name(name) {
                return Err(SerializationError::new(format!("invalid element name '{name}'")));
            }
            for attr in attributes {
                check_attribute(&attr.name, &attr.value)?;
            }
            Ok(())
        }
        NodeKind::Text { content } => check_chars(content, "text"),
        NodeKind::CData { content } => {
            if content.contains("]]>") {
                return Err(SerializationError::new("CDATA section contains ']]>'"));
            }
            check_chars(content, "CDATA section")
        }
        NodeKind::Comment { content } => {
            if content.contains("--") || content.ends_with('-') {
                return Err(SerializationError::new(
                    "comment contains '--' or ends with '-'",
                ));
            }
            check_chars(content, "comment")
        }
        NodeKind::ProcessingInstruction { target, data } => {
            if !is_xml_name(target) || target.eq_ignore_ascii_case("xml") {
                return Err(SerializationError::new(format!(
                    "invalid processing instruction target '{target}'"
                )));
            }
            let data = data.as_deref().unwrap_or_default();
            if data.contains("?>") {
                return Err(SerializationError::new(
                    "processing instruction data contains '?>'",
                ));
            }
            check_chars(data, "processing instruction")
        }
    }
}

fn check_attribute(name: &str, value: &str) -> Result<(), SerializationError> {
    if !is_xml_name(name) {
        return Err(SerializationError::new(format!("invalid attribute name '{name}'")));
    }
    check_chars(value, "attribute value")
}

fn check_chars(s: &str, what: &str) -> Result<(), SerializationError> {
    match s.chars().find(|&c| !is_xml_char(c)) {
        Some(c) => Err(SerializationError::new(format!(
            "{what} contains U+{:04X}, which XML cannot represent",
            c as u32
        ))),
        None => Ok(()),
    }
}

// --- Writer ---

enum Task {
    Open {
        id: NodeId,
        depth: usize,
        in_block: bool,
    },
    Close {
        id: NodeId,
        depth: usize,
        block: bool,
        in_block: bool,
    },
}

struct Writer<'a> {
    doc: &'a Document,
    options: &'a SerializeOptions,
    out: String,
}

impl<'a> Writer<'a> {
    fn new(doc: &'a Document, options: &'a SerializeOptions) -> Self {
        Self {
            doc,
            options,
            out: String::new(),
        }
    }

    fn document(&mut self) {
        let doc = self.doc;
        let declare = match self.options.declaration {
            DeclarationPolicy::Always => true,
            DeclarationPolicy::Preserve => doc.version.is_some(),
            DeclarationPolicy::Never => false,
        };
        if declare {
            self.declaration();
        }

        let indent = self.options.indent;
        for child in doc.children(doc.root()) {
            if indent && is_blank_text(doc, child) {
                continue;
            }
            self.subtree(child, 0, indent);
        }
    }

    fn declaration(&mut self) {
        let doc = self.doc;
        let version = doc.version.as_deref().unwrap_or("1.0");
        let encoding = doc.encoding.as_deref().unwrap_or("UTF-8");
        let _ = write!(self.out, "<?xml version=\"{version}\" encoding=\"{encoding}\"");
        if let Some(standalone) = doc.standalone {
            self.out.push_str(if standalone {
                " standalone=\"yes\""
            } else {
                " standalone=\"no\""
            });
        }
        self.out.push_str("?>");
        // Prolog whitespace kept by the parser already separates the
        // declaration from what follows.
        let spaced = !self.options.indent
            && doc.first_child(doc.root()).is_some_and(|c| is_blank_text(doc, c));
        if !spaced {
            self.out.push('\n');
        }
    }

    /// Writes `id` and its descendants. `in_block` means the parent is
    /// indented element-only content, so this node gets its own line.
    fn subtree(&mut self, id: NodeId, depth: usize, in_block: bool) {
        let mut stack = vec![Task::Open {
            id,
            depth,
            in_block,
        }];
        while let Some(task) = stack.pop() {
            match task {
                Task::Open {
                    id,
                    depth,
                    in_block,
                } => self.open(id, depth, in_block, &mut stack),
                Task::Close {
                    id,
                    depth,
                    block,
                    in_block,
                } => self.close(id, depth, block, in_block),
            }
        }
    }

    fn open(&mut self, id: NodeId, depth: usize, in_block: bool, stack: &mut Vec<Task>) {
        let doc = self.doc;
        match doc.node_kind(id) {
            NodeKind::Element { name, attributes } => {
                self.line_start(depth, in_block);
                self.out.push('<');
                self.out.push_str(name);
                for attr in attributes {
                    write_attribute(&mut self.out, &attr.name, &attr.value);
                }

                if doc.first_child(id).is_none() {
                    self.out.push_str("/>");
                    self.line_end(in_block);
                    return;
                }

                self.out.push('>');
                let block = self.options.indent && is_element_only(doc, id);
                if block {
                    self.out.push('\n');
                }
                stack.push(Task::Close {
                    id,
                    depth,
                    block,
                    in_block,
                });
                let children: Vec<NodeId> = doc
                    .children(id)
                    .filter(|&c| !(block && is_blank_text(doc, c)))
                    .collect();
                stack.extend(children.into_iter().rev().map(|c| Task::Open {
                    id: c,
                    depth: depth + 1,
                    in_block: block,
                }));
            }
            NodeKind::Text { content } => {
                if in_block {
                    // Only reachable for top-level text with indentation on.
                    self.line_start(depth, in_block);
                    write_escaped_text(&mut self.out, content);
                    self.line_end(in_block);
                } else {
                    write_escaped_text(&mut self.out, content);
                }
            }
            NodeKind::CData { content } => {
                self.out.push_str("<![CDATA[");
                self.out.push_str(content);
                self.out.push_str("]]>");
            }
            NodeKind::Comment { content } => {
                self.line_start(depth, in_block);
                self.out.push_str("<!--");
                self.out.push_str(content);
                self.out.push_str("-->");
                self.line_end(in_block);
            }
            NodeKind::ProcessingInstruction { target, data } => {
                self.line_start(depth, in_block);
                self.out.push_str("<?");
                self.out.push_str(target);
                if let Some(d) = data {
                    self.out.push(' ');
                    self.out.push_str(d);
                }
                self.out.push_str("?>");
                self.line_end(in_block);
            }
            NodeKind::Document => {
                // A nested document node never occurs in a well-formed arena.
            }
        }
    }

    fn close(&mut self, id: NodeId, depth: usize, block: bool, in_block: bool) {
        if block {
            self.indent(depth);
        }
        let doc = self.doc;
        if let Some(name) = doc.node_name(id) {
            self.out.push_str("</");
            self.out.push_str(name);
            self.out.push('>');
        }
        self.line_end(in_block);
    }

    fn line_start(&mut self, depth: usize, in_block: bool) {
        if in_block {
            self.indent(depth);
        }
    }

    fn line_end(&mut self, in_block: bool) {
        if in_block {
            self.out.push('\n');
        }
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str(&self.options.indent_str);
        }
    }
}

/// Returns `true` if the element contains at least one element and
/// otherwise only comments, PIs and whitespace, so indenting it does not
/// change its text.
fn is_element_only(doc: &Document, id: NodeId) -> bool {
    let mut has_element_child = false;
    for child in doc.children(id) {
        match doc.node_kind(child) {
            NodeKind::Element { .. } => has_element_child = true,
            NodeKind::Text { content } if !is_xml_whitespace(content) => return false,
            NodeKind::CData { .. } => return false,
            _ => {}
        }
    }
    has_element_child
}

fn is_blank_text(doc: &Document, id: NodeId) -> bool {
    matches!(doc.node_kind(id), NodeKind::Text { content } if is_xml_whitespace(content))
}

fn write_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    write_escaped_attr(out, value);
    out.push('"');
}

fn write_char_ref(out: &mut String, ch: char) {
    let _ = write!(out, "&#{};", ch as u32);
}

/// Escapes character data: `&`, `<` and `>` become entity references and a
/// carriage return becomes `&#13;` so it survives end-of-line handling.
fn write_escaped_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            '\t' | '\n' => out.push(ch),
            c if (c as u32) < 0x20 => write_char_ref(out, c),
            _ => out.push(ch),
        }
    }
}

/// Escapes an attribute value for a double-quoted attribute. Whitespace
/// controls are written as character references so attribute-value
/// normalization leaves them intact on reparse.
fn write_escaped_attr(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' | '\n' | '\r' => write_char_ref(out, ch),
            c if (c as u32) < 0x20 => write_char_ref(out, c),
            _ => out.push(ch),
        }
    }
}
