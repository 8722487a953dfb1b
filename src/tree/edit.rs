//! Structural edits.

use crate::error::MutationError;

use super::{is_xml_whitespace, Document, Links, NodeId, NodeKind, Slot};

impl Document {
    /// Allocates a node that is not yet linked anywhere.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::from_slot(self.slots.len());
        self.slots.push(Slot {
            kind,
            links: Links::default(),
        });
        id
    }

    /// Links the unattached node `child` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns `MutationError`, leaving the tree untouched, if `parent`
    /// cannot take children, `child` already has a parent or contains
    /// `parent`, or the edit would break the one-root-element rule at the
    /// document level.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), MutationError> {
        self.check_child(parent, child)?;
        self.link_last(parent, child);
        Ok(())
    }

    fn check_child(&self, parent: NodeId, child: NodeId) -> Result<(), MutationError> {
        let parent_kind = self.node_kind(parent);
        if !parent_kind.can_have_children() {
            return Err(MutationError::new(format!(
                "a {} node cannot have children",
                parent_kind.label()
            )));
        }
        if self.parent(child).is_some() {
            return Err(MutationError::new("node is already linked into the tree"));
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(MutationError::new("a node cannot be moved below itself"));
        }

        let child_kind = self.node_kind(child);
        let problem = match child_kind {
            NodeKind::Document => Some("the document node cannot be a child"),
            _ if parent != self.root() => None,
            NodeKind::Element { .. } if self.root_element().is_some() => {
                Some("document already has a root element")
            }
            NodeKind::CData { .. } => Some("CDATA is not allowed outside the root element"),
            NodeKind::Text { content } if !is_xml_whitespace(content) => {
                Some("text is not allowed outside the root element")
            }
            _ => None,
        };
        problem.map_or(Ok(()), |msg| Err(MutationError::new(msg)))
    }

    /// [`append_child`](Self::append_child) without the checks, for callers
    /// that build well-formed trees by construction.
    pub(crate) fn link_last(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.parent(child).is_none(), "{child:?} is already linked");
        let prev = self.last_child(parent);
        match prev {
            Some(last) => self.links_mut(last).next_sibling = Some(child),
            None => self.links_mut(parent).first_child = Some(child),
        }
        self.links_mut(parent).last_child = Some(child);
        let links = self.links_mut(child);
        links.parent = Some(parent);
        links.prev_sibling = prev;
        links.next_sibling = None;
    }

    /// Unlinks `id` (with its subtree) from its parent. The node stays in
    /// the arena; detaching an unlinked node does nothing.
    pub fn detach(&mut self, id: NodeId) {
        let Links {
            parent: Some(parent),
            prev_sibling: prev,
            next_sibling: next,
            ..
        } = *self.links(id)
        else {
            return;
        };

        match prev {
            Some(p) => self.links_mut(p).next_sibling = next,
            None => self.links_mut(parent).first_child = next,
        }
        match next {
            Some(n) => self.links_mut(n).prev_sibling = prev,
            None => self.links_mut(parent).last_child = prev,
        }

        let links = self.links_mut(id);
        links.parent = None;
        links.prev_sibling = None;
        links.next_sibling = None;
    }

    /// Removes the attribute `name` from element `id`, returning its value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let NodeKind::Element { attributes, .. } = &mut self.slots[id.slot()].kind else {
            return None;
        };
        let index = attributes.iter().position(|a| a.name == name)?;
        Some(attributes.remove(index).value)
    }

    /// Copies the subtree at `node` in `source` into this arena and returns
    /// the unlinked copy. `source` may be any document, including a clone of
    /// this one.
    pub fn import_subtree(&mut self, source: &Document, node: NodeId) -> NodeId {
        let top = self.create_node(source.node_kind(node).clone());
        let mut pending = vec![(node, top)];
        while let Some((from, to)) = pending.pop() {
            for child in source.children(from) {
                let copy = self.create_node(source.node_kind(child).clone());
                self.link_last(to, copy);
                pending.push((child, copy));
            }
        }
        top
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::tree::{Document, NodeId, NodeKind};
    use pretty_assertions::assert_eq;

    fn with_root() -> (Document, NodeId) {
        let mut doc = Document::new();
        let r = doc.create_node(NodeKind::element("r"));
        doc.append_child(doc.root(), r).unwrap();
        (doc, r)
    }

    fn texts(doc: &mut Document, parent: NodeId, items: &[&str]) -> Vec<NodeId> {
        items
            .iter()
            .map(|s| {
                let t = doc.create_node(NodeKind::text(*s));
                doc.append_child(parent, t).unwrap();
                t
            })
            .collect()
    }

    #[test]
    fn test_append_links_siblings() {
        let (mut doc, r) = with_root();
        let ids = texts(&mut doc, r, &["A", "B", "C"]);
        assert_eq!(doc.children(r).collect::<Vec<_>>(), ids);
        assert_eq!(doc.first_child(r), Some(ids[0]));
        assert_eq!(doc.last_child(r), Some(ids[2]));
        assert_eq!(doc.prev_sibling(ids[0]), None);
        assert_eq!(doc.next_sibling(ids[2]), None);
        assert_eq!(doc.prev_sibling(ids[2]), Some(ids[1]));
        assert_eq!(doc.text_content(r), "ABC");
        assert_eq!(doc.root_element(), Some(r));
    }

    #[test]
    fn test_append_rejections() {
        let (mut doc, r) = with_root();
        let t = texts(&mut doc, r, &["t"])[0];

        let second = doc.create_node(NodeKind::element("s"));
        let err = doc.append_child(doc.root(), second).unwrap_err();
        assert_eq!(err.message, "document already has a root element");
        assert_eq!(doc.parent(second), None);

        let err = doc.append_child(t, second).unwrap_err();
        assert_eq!(err.message, "a text node cannot have children");

        assert!(doc.append_child(r, t).is_err());

        let word = doc.create_node(NodeKind::text("word"));
        assert!(doc.append_child(doc.root(), word).is_err());
        let blank = doc.create_node(NodeKind::text("\n"));
        assert!(doc.append_child(doc.root(), blank).is_ok());
    }

    #[test]
    fn test_append_rejects_cycles() {
        let mut doc = Document::parse_str("<a><b><c/></b></a>").unwrap();
        let b = doc.first_child(doc.root_element().unwrap()).unwrap();
        let c = doc.first_child(b).unwrap();
        doc.detach(b);
        assert!(doc.append_child(c, b).is_err());
        assert!(doc.append_child(b, b).is_err());
        assert_eq!(doc.parent(c), Some(b));
    }

    #[test]
    fn test_detach_first_middle_last() {
        let (mut doc, r) = with_root();
        let ids = texts(&mut doc, r, &["A", "B", "C"]);

        doc.detach(ids[1]);
        assert_eq!(doc.children(r).collect::<Vec<_>>(), vec![ids[0], ids[2]]);
        assert_eq!(doc.next_sibling(ids[0]), Some(ids[2]));
        assert_eq!(doc.prev_sibling(ids[2]), Some(ids[0]));
        assert_eq!(doc.parent(ids[1]), None);

        doc.detach(ids[0]);
        assert_eq!(doc.first_child(r), Some(ids[2]));
        assert_eq!(doc.prev_sibling(ids[2]), None);

        doc.detach(ids[2]);
        assert_eq!((doc.first_child(r), doc.last_child(r)), (None, None));
        assert!(!doc.is_attached(ids[2]));

        // Already detached: nothing happens.
        doc.detach(ids[2]);
        assert_eq!(doc.node_text(ids[2]), Some("C"));
    }

    #[test]
    fn test_detached_subtree_keeps_its_children() {
        let mut doc = Document::parse_str("<a><b><c/></b></a>").unwrap();
        let b = doc.first_child(doc.root_element().unwrap()).unwrap();
        let c = doc.first_child(b).unwrap();
        doc.detach(b);
        assert_eq!(doc.parent(c), Some(b));
        assert!(!doc.is_attached(c));
    }

    #[test]
    fn test_remove_attribute() {
        let mut doc = Document::parse_str("<a x=\"1\" y=\"2\" z=\"3\"/>").unwrap();
        let a = doc.root_element().unwrap();
        assert_eq!(doc.remove_attribute(a, "y"), Some("2".to_string()));
        assert_eq!(doc.remove_attribute(a, "y"), None);
        let names: Vec<&str> = doc.attributes(a).iter().map(|at| at.name.as_str()).collect();
        assert_eq!(names, vec!["x", "z"]);
        assert_eq!(doc.remove_attribute(doc.root(), "x"), None);
    }

    #[test]
    fn test_import_subtree_copies_deeply() {
        let src = Document::parse_str("<a x=\"1\"><b>t</b><!--c--></a>").unwrap();
        let mut dst = Document::parse_str("<root/>").unwrap();
        let root = dst.root_element().unwrap();
        let copy = dst.import_subtree(&src, src.root_element().unwrap());
        assert_eq!(dst.parent(copy), None);
        dst.append_child(root, copy).unwrap();

        assert_eq!(dst.attribute(copy, "x"), Some("1"));
        assert_eq!(dst.descendants(copy).count(), 3);
        assert_eq!(dst.text_content(root), "t");
        let kids: Vec<&str> = dst.children(copy).map(|c| dst.node_kind(c).label()).collect();
        assert_eq!(kids, vec!["element", "comment"]);
    }
}
