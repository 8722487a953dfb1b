//! Batch tree edits driven by a selection.
//!
//! Both operations validate every target before touching the document, so
//! a rejected batch leaves the tree exactly as it was.

use log::{debug, trace};

use crate::error::MutationError;
use crate::tree::{Document, Fragment, NodeId, NodeKind};
use crate::xpath::NodeRef;

/// Appends a deep copy of every top-level node of `fragment` as the last
/// children of each target, in target order.
///
/// Returns the number of nodes inserted.
///
/// # Errors
///
/// Returns `MutationError` if any target is an attribute, is not an
/// element, or is detached from the document. No target is modified in
/// that case.
///
/// # Examples
///
/// ```
/// use xmlsplice::{Document, serial};
/// use xmlsplice::mutate::append_children;
/// use xmlsplice::tree::Fragment;
/// use xmlsplice::xpath::select;
///
/// let mut doc = Document::parse_str("<r><a/><a/></r>").unwrap();
/// let targets = select(&doc, "//a").unwrap();
/// let frag = Fragment::parse_str("<b/>").unwrap();
/// assert_eq!(append_children(&mut doc, &targets, &frag).unwrap(), 2);
/// assert_eq!(serial::serialize(&doc), "<r><a><b/></a><a><b/></a></r>");
/// ```
pub fn append_children(
    doc: &mut Document,
    targets: &[NodeRef],
    fragment: &Fragment,
) -> Result<usize, MutationError> {
    let elements = targets
        .iter()
        .map(|target| append_target(doc, target))
        .collect::<Result<Vec<_>, _>>()?;

    let source = fragment.document();
    let mut inserted = 0;
    for element in elements {
        for top in fragment.top_level() {
            let copy = doc.import_subtree(source, top);
            doc.link_last(element, copy);
            inserted += 1;
        }
        trace!(target: "xmlsplice::mutate", "appended fragment under node {element:?}");
    }
    debug!(
        target: "xmlsplice::mutate",
        "appended {inserted} node(s) across {} target(s)",
        targets.len()
    );
    Ok(inserted)
}

fn append_target(doc: &Document, target: &NodeRef) -> Result<NodeId, MutationError> {
    let NodeRef::Node(id) = target else {
        return Err(MutationError::new("cannot append children to an attribute"));
    };
    let kind = doc.node_kind(*id);
    if !kind.is_element() {
        return Err(MutationError::new(format!(
            "cannot append children to a {} node",
            kind.label()
        )));
    }
    if !doc.is_attached(*id) {
        return Err(MutationError::new("cannot append children to a detached node"));
    }
    Ok(*id)
}

/// Removes every target from the document: nodes are detached together
/// with their subtrees, attribute references are removed from their owner.
///
/// Targets are processed in reverse document order, so removing an
/// ancestor first never strands a descendant that is also targeted; a
/// target already removed along with an ancestor is skipped. Returns the
/// number of targets actually removed.
///
/// # Errors
///
/// Returns `MutationError` if any target is the document node or the root
/// element, or is detached before the call. Nothing is removed in that
/// case.
pub fn delete_nodes(doc: &mut Document, targets: &[NodeRef]) -> Result<usize, MutationError> {
    let root_element = doc.root_element();
    for target in targets {
        let anchor = target.anchor();
        if let NodeRef::Node(id) = target {
            if matches!(doc.node_kind(*id), NodeKind::Document) {
                return Err(MutationError::new("cannot delete the document node"));
            }
            if Some(*id) == root_element {
                return Err(MutationError::new("cannot delete the root element"));
            }
        }
        if !doc.is_attached(anchor) {
            return Err(MutationError::new("cannot delete a detached node"));
        }
    }

    let order = doc.document_order();
    let mut ordered: Vec<&NodeRef> = targets.iter().collect();
    ordered.sort_by_key(|target| {
        let rank = order.rank(target.anchor()).unwrap_or(0);
        let attribute = matches!(target, NodeRef::Attribute { .. });
        std::cmp::Reverse((rank, attribute))
    });

    let mut removed = 0;
    for target in ordered {
        match target {
            NodeRef::Node(id) => {
                if !doc.is_attached(*id) {
                    trace!(target: "xmlsplice::mutate", "node {id:?} already removed with an ancestor");
                    continue;
                }
                doc.detach(*id);
            }
            NodeRef::Attribute { owner, name } => {
                if !doc.is_attached(*owner) || doc.remove_attribute(*owner, name).is_none() {
                    continue;
                }
            }
        }
        removed += 1;
    }
    debug!(
        target: "xmlsplice::mutate",
        "removed {removed} of {} target(s)",
        targets.len()
    );
    Ok(removed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::serial::serialize;
    use crate::xpath::select;
    use pretty_assertions::assert_eq;

    fn frag(s: &str) -> Fragment {
        Fragment::parse_str(s).unwrap()
    }

    #[test]
    fn test_append_to_each_target_in_order() {
        let mut doc = Document::parse_str("<r><a/><b/><a>t</a></r>").unwrap();
        let targets = select(&doc, "//a").unwrap();
        let n = append_children(&mut doc, &targets, &frag("<x/>y")).unwrap();
        assert_eq!(n, 4);
        assert_eq!(serialize(&doc), "<r><a><x/>y</a><b/><a>t<x/>y</a></r>");
    }

    #[test]
    fn test_append_copies_are_independent() {
        let mut doc = Document::parse_str("<r><a/><a/></r>").unwrap();
        let targets = select(&doc, "//a").unwrap();
        append_children(&mut doc, &targets, &frag("<x/>")).unwrap();
        let xs = select(&doc, "//x").unwrap();
        assert_eq!(xs.len(), 2);
        assert_ne!(xs[0], xs[1]);
    }

    #[test]
    fn test_append_nested_targets() {
        let mut doc = Document::parse_str("<a><a/></a>").unwrap();
        let targets = select(&doc, "//a").unwrap();
        append_children(&mut doc, &targets, &frag("<n/>")).unwrap();
        assert_eq!(serialize(&doc), "<a><a><n/></a><n/></a>");
    }

    #[test]
    fn test_append_rejects_attribute_and_touches_nothing() {
        let mut doc = Document::parse_str("<r a=\"1\"><b/></r>").unwrap();
        let targets = select(&doc, "//b | //@a").unwrap();
        let err = append_children(&mut doc, &targets, &frag("<x/>")).unwrap_err();
        assert!(err.to_string().contains("attribute"));
        assert_eq!(serialize(&doc), "<r a=\"1\"><b/></r>");
    }

    #[test]
    fn test_append_rejects_text_target() {
        let mut doc = Document::parse_str("<r>t</r>").unwrap();
        let targets = select(&doc, "//text()").unwrap();
        let err = append_children(&mut doc, &targets, &frag("<x/>")).unwrap_err();
        assert_eq!(err.to_string(), "mutation error: cannot append children to a text node");
    }

    #[test]
    fn test_append_empty_fragment() {
        let mut doc = Document::parse_str("<r><a/></r>").unwrap();
        let targets = select(&doc, "//a").unwrap();
        assert_eq!(append_children(&mut doc, &targets, &frag("")).unwrap(), 0);
        assert_eq!(serialize(&doc), "<r><a/></r>");
    }

    #[test]
    fn test_delete_nodes_and_subtrees() {
        let mut doc = Document::parse_str("<r><a><b/></a><c/><a/></r>").unwrap();
        let targets = select(&doc, "//a").unwrap();
        assert_eq!(delete_nodes(&mut doc, &targets).unwrap(), 2);
        assert_eq!(serialize(&doc), "<r><c/></r>");
    }

    #[test]
    fn test_delete_ancestor_and_descendant() {
        let mut doc = Document::parse_str("<r><a><a/></a></r>").unwrap();
        let targets = select(&doc, "//a").unwrap();
        assert_eq!(delete_nodes(&mut doc, &targets).unwrap(), 2);
        assert_eq!(serialize(&doc), "<r/>");
    }

    #[test]
    fn test_delete_attributes() {
        let mut doc = Document::parse_str("<r a=\"1\" b=\"2\"><c a=\"3\"/></r>").unwrap();
        let targets = select(&doc, "//@a").unwrap();
        assert_eq!(delete_nodes(&mut doc, &targets).unwrap(), 2);
        assert_eq!(serialize(&doc), "<r b=\"2\"><c/></r>");
    }

    #[test]
    fn test_delete_attribute_and_owner() {
        let mut doc = Document::parse_str("<r><c a=\"3\"/></r>").unwrap();
        let targets = select(&doc, "//c | //c/@a").unwrap();
        assert_eq!(delete_nodes(&mut doc, &targets).unwrap(), 2);
        assert_eq!(serialize(&doc), "<r/>");
    }

    #[test]
    fn test_delete_refuses_root_element() {
        let mut doc = Document::parse_str("<r><a/></r>").unwrap();
        let targets = select(&doc, "//*").unwrap();
        let err = delete_nodes(&mut doc, &targets).unwrap_err();
        assert!(err.to_string().contains("root element"));
        assert_eq!(serialize(&doc), "<r><a/></r>");
    }

    #[test]
    fn test_delete_refuses_document_node() {
        let mut doc = Document::parse_str("<r/>").unwrap();
        let targets = select(&doc, "/").unwrap();
        assert!(delete_nodes(&mut doc, &targets).is_err());
    }

    #[test]
    fn test_delete_keeps_surrounding_whitespace() {
        let mut doc = Document::parse_str("<r>\n  <a/>\n  <b/>\n</r>").unwrap();
        let targets = select(&doc, "//a").unwrap();
        delete_nodes(&mut doc, &targets).unwrap();
        assert_eq!(serialize(&doc), "<r>\n  \n  <b/>\n</r>");
    }
}
