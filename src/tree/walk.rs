//! Traversal and document order.

use std::iter;

use super::{Document, NodeId};

impl Document {
    /// Children of `id`, first to last.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        iter::successors(self.first_child(id), |&c| self.next_sibling(c))
    }

    /// `id` itself, then its parent, up to the document node.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        iter::successors(Some(id), |&n| self.parent(n))
    }

    /// Everything below `id` in pre-order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        iter::successors(self.first_child(id), move |&n| self.preorder_next(n, id))
    }

    /// The pre-order successor of `node` without leaving the subtree of
    /// `scope`.
    fn preorder_next(&self, node: NodeId, scope: NodeId) -> Option<NodeId> {
        if let Some(child) = self.first_child(node) {
            return Some(child);
        }
        let mut at = node;
        while at != scope {
            if let Some(next) = self.next_sibling(at) {
                return Some(next);
            }
            at = self.parent(at)?;
        }
        None
    }

    /// `true` if `ancestor` lies strictly above `node`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).skip(1).any(|a| a == ancestor)
    }

    /// `true` while `id` can be reached from the document node.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.ancestors(id).last() == Some(self.root())
    }

    /// Ranks every attached node by its pre-order position. The table is a
    /// snapshot: edits made afterwards are not reflected.
    #[must_use]
    pub fn document_order(&self) -> DocumentOrder {
        let mut ranks = vec![None; self.node_count()];
        let root = self.root();
        for (rank, id) in iter::once(root).chain(self.descendants(root)).enumerate() {
            ranks[id.slot()] = Some(rank);
        }
        DocumentOrder { ranks }
    }
}

/// Pre-order ranks, from [`Document::document_order`].
#[derive(Debug, Clone)]
pub struct DocumentOrder {
    ranks: Vec<Option<usize>>,
}

impl DocumentOrder {
    /// The node's position in document order; `None` for nodes that were
    /// detached (or created) when the table was built.
    #[must_use]
    pub fn rank(&self, id: NodeId) -> Option<usize> {
        self.ranks.get(id.slot()).copied().flatten()
    }
}
