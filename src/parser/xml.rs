//! Recursive descent over the document and content productions of
//! XML 1.0 (Fifth Edition), building nodes into a [`Document`] arena.
//!
//! See <https://www.w3.org/TR/xml/> for the grammar.

use crate::error::ParseError;
use crate::tree::{is_xml_whitespace, Attribute, Document, Fragment, NodeId, NodeKind};

use super::cursor::{Cursor, Limits};
use super::ParseOptions;

/// What the cursor is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Markup {
    StartTag,
    EndTag,
    Comment,
    CData,
    Pi,
    XmlDecl,
    /// `<!` followed by anything other than a comment or CDATA section.
    Declaration,
    Text,
    Eof,
}

pub(crate) struct XmlParser<'a> {
    cur: Cursor<'a>,
    doc: Document,
    options: &'a ParseOptions,
    /// Nodes created so far, checked against `max_nodes`.
    created: usize,
}

impl<'a> XmlParser<'a> {
    pub fn new(input: &'a str, options: &'a ParseOptions) -> Self {
        let limits = Limits {
            max_depth: options.max_depth,
            max_name_length: options.max_name_length,
        };
        Self {
            cur: Cursor::new(input, limits),
            doc: Document::new(),
            options,
            created: 0,
        }
    }

    /// `document ::= prolog element Misc*`
    pub fn parse(mut self) -> Result<Document, ParseError> {
        let root = self.doc.root();
        self.leading_declaration()?;
        self.misc(root)?;
        if self.cur.starts_with("<!DOCTYPE") {
            self.skip_doctype()?;
            self.misc(root)?;
        }

        if self.classify() != Markup::StartTag {
            return Err(self.cur.error("missing root element"));
        }
        self.element(root)?;
        self.misc(root)?;

        if !self.cur.is_eof() {
            return Err(self.cur.error("content after document element"));
        }
        Ok(self.doc)
    }

    /// Content with any number of top-level nodes, including none.
    pub fn parse_fragment(mut self) -> Result<Fragment, ParseError> {
        let root = self.doc.root();
        // A leading declaration is accepted and discarded.
        self.leading_declaration()?;
        loop {
            match self.classify() {
                Markup::Eof => break,
                Markup::EndTag => {
                    return Err(self.cur.error("unexpected end tag at fragment top level"))
                }
                markup => self.content_item(root, markup)?,
            }
        }
        // Nothing but whitespace: an empty fragment.
        let blank: Vec<NodeId> = self.doc.children(root).collect();
        if blank.iter().all(|&c| {
            matches!(self.doc.node_kind(c), NodeKind::Text { content } if is_xml_whitespace(content))
        }) {
            for c in blank {
                self.doc.detach(c);
            }
        }
        Ok(Fragment::from_document(self.doc))
    }

    fn classify(&self) -> Markup {
        let cur = &self.cur;
        match cur.peek() {
            None => Markup::Eof,
            Some(b'<') => {
                if cur.starts_with("</") {
                    Markup::EndTag
                } else if cur.starts_with("<!--") {
                    Markup::Comment
                } else if cur.starts_with("<![CDATA[") {
                    Markup::CData
                } else if cur.starts_with("<!") {
                    Markup::Declaration
                } else if ["<?xml ", "<?xml\t", "<?xml\r", "<?xml\n"]
                    .iter()
                    .any(|p| cur.starts_with(p))
                {
                    Markup::XmlDecl
                } else if cur.starts_with("<?") {
                    Markup::Pi
                } else {
                    Markup::StartTag
                }
            }
            Some(_) => Markup::Text,
        }
    }

    // -- Prolog and epilogue --

    fn leading_declaration(&mut self) -> Result<(), ParseError> {
        if self.classify() == Markup::XmlDecl {
            self.xml_declaration()?;
            // The serializer writes its own line break here.
            self.cur.skip_space();
        }
        Ok(())
    }

    /// `Misc*`: comments, PIs and whitespace around the root element.
    fn misc(&mut self, parent: NodeId) -> Result<(), ParseError> {
        loop {
            let space = self.cur.take_space();
            if !space.is_empty() && !self.options.no_blanks {
                let content = space.replace("\r\n", "\n").replace('\r', "\n");
                self.push_node(parent, NodeKind::Text { content })?;
            }
            match self.classify() {
                Markup::Comment => {
                    let content = self.comment()?;
                    self.push_node(parent, NodeKind::Comment { content })?;
                }
                Markup::Pi => {
                    let kind = self.processing_instruction()?;
                    self.push_node(parent, kind)?;
                }
                Markup::XmlDecl => {
                    return Err(self
                        .cur
                        .error("XML declaration must be at the start of the document"))
                }
                _ => return Ok(()),
            }
        }
    }

    /// `[23] XMLDecl`. Only the pseudo-attributes are checked; the text has
    /// already been decoded by the time it gets here.
    fn xml_declaration(&mut self) -> Result<(), ParseError> {
        self.cur.expect("<?xml")?;
        self.cur.require_space("version")?;

        let version = self.pseudo_attribute("version")?;
        let valid_version = version
            .strip_prefix("1.")
            .is_some_and(|minor| !minor.is_empty() && minor.bytes().all(|b| b.is_ascii_digit()));
        if !valid_version {
            return Err(self.cur.error(format!("unsupported XML version '{version}'")));
        }
        self.doc.version = Some(version.to_string());

        let mut spaced = self.cur.skip_space();
        if spaced && self.cur.starts_with("encoding") {
            let name = self.pseudo_attribute("encoding")?;
            let valid_name = name.bytes().next().is_some_and(|b| b.is_ascii_alphabetic())
                && name
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));
            if !valid_name {
                return Err(self.cur.error(format!("invalid encoding name '{name}'")));
            }
            self.doc.encoding = Some(name.to_string());
            spaced = self.cur.skip_space();
        }
        if spaced && self.cur.starts_with("standalone") {
            self.doc.standalone = match self.pseudo_attribute("standalone")? {
                "yes" => Some(true),
                "no" => Some(false),
                other => {
                    return Err(self
                        .cur
                        .error(format!("standalone must be 'yes' or 'no', found '{other}'")))
                }
            };
            self.cur.skip_space();
        }
        self.cur.expect("?>")
    }

    fn pseudo_attribute(&mut self, name: &str) -> Result<&'a str, ParseError> {
        self.cur.expect(name)?;
        self.cur.skip_space();
        self.cur.expect("=")?;
        self.cur.skip_space();
        self.cur.literal()
    }

    /// Consumes a document type declaration without keeping it. The internal
    /// subset is skipped by bracket matching; brackets inside literals and
    /// comments do not count.
    fn skip_doctype(&mut self) -> Result<(), ParseError> {
        self.cur.expect("<!DOCTYPE")?;
        self.cur.require_space("the document type name")?;
        self.cur.name()?;

        let mut open = 0u32;
        loop {
            match self.cur.peek() {
                None => return Err(self.cur.error("unexpected end of input in DOCTYPE")),
                Some(b'"' | b'\'') => {
                    self.cur.literal()?;
                }
                Some(b'<') if self.cur.starts_with("<!--") => {
                    self.comment()?;
                }
                Some(b'[') => {
                    open += 1;
                    self.cur.eat("[");
                }
                Some(b']') => {
                    open = open
                        .checked_sub(1)
                        .ok_or_else(|| self.cur.error("unbalanced ']' in DOCTYPE"))?;
                    self.cur.eat("]");
                }
                Some(b'>') if open == 0 => {
                    self.cur.eat(">");
                    return Ok(());
                }
                Some(_) => {
                    self.cur.next_char()?;
                }
            }
        }
    }

    // -- Elements --

    /// `[39] element`, recursing into content.
    fn element(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        self.cur.enter()?;
        self.cur.expect("<")?;
        let name = self.cur.name()?;
        let attributes = self.attributes(&name)?;
        let empty = self.cur.eat("/>");
        if !empty {
            self.cur.expect(">")?;
        }

        let element = self.push_node(
            parent,
            NodeKind::Element {
                name: name.clone(),
                attributes,
            },
        )?;

        if !empty {
            loop {
                match self.classify() {
                    Markup::Eof => {
                        return Err(self.cur.error("unexpected end of input in element content"))
                    }
                    Markup::EndTag => break,
                    markup => self.content_item(element, markup)?,
                }
            }
            self.end_tag(&name)?;
        }

        self.cur.leave();
        Ok(element)
    }

    /// The attribute list of a start tag, up to but not including `>` or `/>`.
    fn attributes(&mut self, element: &str) -> Result<Vec<Attribute>, ParseError> {
        let mut attributes: Vec<Attribute> = Vec::new();
        loop {
            let spaced = self.cur.skip_space();
            if self.cur.starts_with(">") || self.cur.starts_with("/>") {
                return Ok(attributes);
            }
            if self.cur.is_eof() {
                return Err(self.cur.error("unexpected end of input in start tag"));
            }
            self.cur.check_char()?;
            if !spaced {
                return Err(self.cur.error("whitespace required between attributes"));
            }

            let name = self.cur.name()?;
            self.cur.skip_space();
            self.cur.expect("=")?;
            self.cur.skip_space();
            let value = self.cur.attribute_value()?;

            // attribute names are unique per element
            if attributes.iter().any(|a| a.name == name) {
                return Err(self.cur.error(format!("duplicate attribute: '{name}'")));
            }
            if attributes.len() >= self.options.max_attributes as usize {
                return Err(self.cur.error(format!(
                    "too many attributes on <{element}> (maximum {})",
                    self.options.max_attributes
                )));
            }
            attributes.push(Attribute { name, value });
        }
    }

    fn end_tag(&mut self, name: &str) -> Result<(), ParseError> {
        self.cur.expect("</")?;
        let found = self.cur.name()?;
        if found != name {
            return Err(self.cur.error(format!(
                "mismatched end tag: expected </{name}>, found </{found}>"
            )));
        }
        self.cur.skip_space();
        self.cur.expect(">")
    }

    // -- Content --

    /// One item of `[43] content`. End tags and end of input are the
    /// caller's business.
    fn content_item(&mut self, parent: NodeId, markup: Markup) -> Result<(), ParseError> {
        let kind = match markup {
            Markup::StartTag => {
                self.element(parent)?;
                return Ok(());
            }
            Markup::Text => return self.char_data(parent),
            Markup::Comment => NodeKind::Comment {
                content: self.comment()?,
            },
            Markup::CData => {
                self.cur.expect("<![CDATA[")?;
                NodeKind::CData {
                    content: self.cur.text_until("]]>", "CDATA section")?,
                }
            }
            Markup::Pi => self.processing_instruction()?,
            Markup::XmlDecl => return Err(self.cur.error("XML declaration not allowed here")),
            Markup::Declaration => {
                return Err(self.cur.error("unexpected markup declaration in content"))
            }
            Markup::EndTag | Markup::Eof => return Err(self.cur.error("expected content")),
        };
        self.push_node(parent, kind)?;
        Ok(())
    }

    /// `[14] CharData` with references resolved, up to the next `<`.
    fn char_data(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let mut text = String::new();
        while let Some(b) = self.cur.peek() {
            match b {
                b'<' => break,
                b'&' => text.push(self.cur.reference()?),
                b']' if self.cur.starts_with("]]>") => {
                    return Err(self.cur.error("']]>' not allowed in character data"));
                }
                _ => text.push(self.cur.next_char()?),
            }
        }

        if !(self.options.no_blanks && is_xml_whitespace(&text)) {
            self.push_node(parent, NodeKind::Text { content: text })?;
        }
        Ok(())
    }

    /// `[15] Comment`
    fn comment(&mut self) -> Result<String, ParseError> {
        self.cur.expect("<!--")?;
        let mut content = String::new();
        loop {
            if self.cur.eat("-->") {
                return Ok(content);
            }
            if self.cur.starts_with("--") {
                return Err(self.cur.error("'--' not allowed inside comments"));
            }
            if self.cur.is_eof() {
                return Err(self.cur.error("unexpected end of input in comment"));
            }
            content.push(self.cur.next_char()?);
        }
    }

    /// `[16] PI`
    fn processing_instruction(&mut self) -> Result<NodeKind, ParseError> {
        self.cur.expect("<?")?;
        let target = self.cur.name()?;
        if target.eq_ignore_ascii_case("xml") {
            return Err(self.cur.error(format!("PI target '{target}' is reserved")));
        }
        let data = if self.cur.eat("?>") {
            None
        } else {
            self.cur.require_space("processing instruction data")?;
            Some(self.cur.text_until("?>", "processing instruction")?).filter(|d| !d.is_empty())
        };
        Ok(NodeKind::ProcessingInstruction { target, data })
    }

    /// Creates a node as the last child of `parent`, counting it against
    /// `max_nodes`.
    fn push_node(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, ParseError> {
        self.created += 1;
        if self.created > self.options.max_nodes {
            return Err(self
                .cur
                .error(format!("node limit exceeded ({})", self.options.max_nodes)));
        }
        let id = self.doc.create_node(kind);
        self.doc.link_last(parent, id);
        Ok(id)
    }
}
