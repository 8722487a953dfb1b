//! Path expression evaluator.
//!
//! Evaluation is infallible once an expression has parsed: the parser has
//! already rejected unknown functions and non-node-set operands where node
//! sets are required. Every node-set the evaluator produces is free of
//! duplicates and sorted in document order, with an element's attributes
//! ordered after the element and before its children.

use std::collections::HashSet;

use super::ast::{Axis, BinaryOp, Expr, Function, LocationPath, NodeTest, Step};
use super::NodeRef;
use crate::tree::{Document, DocumentOrder, NodeId, NodeKind};

/// The value of a predicate sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A node-set in document order.
    Nodes(Vec<NodeRef>),
    /// A boolean.
    Boolean(bool),
    /// An IEEE 754 double.
    Number(f64),
    /// A string.
    String(String),
}

/// Evaluation context: the context node and its proximity position.
#[derive(Debug, Clone)]
struct Context {
    node: NodeRef,
    position: usize,
    size: usize,
}

/// Evaluates parsed expressions against one document.
///
/// Construction computes the document order of every attached node, so an
/// evaluator should be reused for several expressions on an unchanged
/// document and discarded once the document is mutated.
pub struct Evaluator<'a> {
    doc: &'a Document,
    order: DocumentOrder,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator for `doc`.
    #[must_use]
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            order: doc.document_order(),
        }
    }

    /// Evaluates `expr` with the document node as context.
    #[must_use]
    pub fn evaluate(&self, expr: &Expr) -> Value {
        self.eval(expr, &self.root_context())
    }

    /// Evaluates a node-set expression with the document node as context.
    ///
    /// Expressions that are not node-sets yield an empty result; callers
    /// check [`Expr::is_node_set`] first.
    #[must_use]
    pub fn select(&self, expr: &Expr) -> Vec<NodeRef> {
        self.eval_nodes(expr, &self.root_context())
    }

    fn root_context(&self) -> Context {
        Context {
            node: NodeRef::Node(self.doc.root()),
            position: 1,
            size: 1,
        }
    }

    fn eval(&self, expr: &Expr, ctx: &Context) -> Value {
        match expr {
            Expr::Number(n) => Value::Number(*n),
            Expr::Literal(s) => Value::String(s.clone()),
            Expr::Binary { op, left, right } => Value::Boolean(self.eval_binary(*op, left, right, ctx)),
            Expr::Call { function, args } => self.eval_call(*function, args, ctx),
            Expr::Path(_) | Expr::Filter { .. } | Expr::Union(..) => {
                Value::Nodes(self.eval_nodes(expr, ctx))
            }
        }
    }

    fn eval_nodes(&self, expr: &Expr, ctx: &Context) -> Vec<NodeRef> {
        match expr {
            Expr::Path(path) => self.eval_path(path, ctx),
            Expr::Filter { expr, predicates } => {
                let mut nodes = self.eval_nodes(expr, ctx);
                for predicate in predicates {
                    nodes = self.apply_predicate(nodes, predicate);
                }
                nodes
            }
            Expr::Union(left, right) => {
                let mut nodes = self.eval_nodes(left, ctx);
                nodes.extend(self.eval_nodes(right, ctx));
                self.normalize(nodes)
            }
            _ => Vec::new(),
        }
    }

    // --- Location paths ---

    fn eval_path(&self, path: &LocationPath, ctx: &Context) -> Vec<NodeRef> {
        let start = if path.absolute {
            NodeRef::Node(self.doc.root())
        } else {
            ctx.node.clone()
        };
        let mut current = vec![start];
        for step in &path.steps {
            let mut next = Vec::new();
            for node in &current {
                next.extend(self.eval_step(step, node));
            }
            current = self.normalize(next);
            if current.is_empty() {
                break;
            }
        }
        current
    }

    fn eval_step(&self, step: &Step, node: &NodeRef) -> Vec<NodeRef> {
        let mut candidates: Vec<NodeRef> = self
            .axis_nodes(step.axis, node)
            .into_iter()
            .filter(|n| self.node_test(step.axis, &step.node_test, n))
            .collect();
        for predicate in &step.predicates {
            candidates = self.apply_predicate(candidates, predicate);
        }
        candidates
    }

    #[allow(clippy::cast_precision_loss)]
    fn apply_predicate(&self, nodes: Vec<NodeRef>, predicate: &Expr) -> Vec<NodeRef> {
        let size = nodes.len();
        nodes
            .into_iter()
            .enumerate()
            .filter_map(|(i, node)| {
                let ctx = Context {
                    node,
                    position: i + 1,
                    size,
                };
                let keep = match self.eval(predicate, &ctx) {
                    Value::Number(n) => n == ctx.position as f64,
                    other => to_boolean(&other),
                };
                keep.then_some(ctx.node)
            })
            .collect()
    }

    /// Nodes on `axis` from `node`, in axis order (nearest first for
    /// reverse axes).
    fn axis_nodes(&self, axis: Axis, node: &NodeRef) -> Vec<NodeRef> {
        let doc = self.doc;
        let id = match node {
            NodeRef::Node(id) => *id,
            NodeRef::Attribute { owner, .. } => return self.attribute_axis_nodes(axis, node, *owner),
        };
        match axis {
            Axis::Child => wrap(doc.children(id)),
            Axis::Descendant => wrap(doc.descendants(id)),
            Axis::DescendantOrSelf => wrap(std::iter::once(id).chain(doc.descendants(id))),
            Axis::SelfAxis => vec![node.clone()],
            Axis::Parent => wrap(doc.parent(id).into_iter()),
            Axis::Ancestor => wrap(doc.ancestors(id).skip(1)),
            Axis::AncestorOrSelf => wrap(doc.ancestors(id)),
            Axis::FollowingSibling => {
                wrap(std::iter::successors(doc.next_sibling(id), |&s| doc.next_sibling(s)))
            }
            Axis::PrecedingSibling => {
                wrap(std::iter::successors(doc.prev_sibling(id), |&s| doc.prev_sibling(s)))
            }
            Axis::Following => self.following(id),
            Axis::Preceding => self.preceding(id),
            Axis::Attribute => doc
                .attributes(id)
                .iter()
                .map(|a| NodeRef::Attribute {
                    owner: id,
                    name: a.name.clone(),
                })
                .collect(),
        }
    }

    fn attribute_axis_nodes(&self, axis: Axis, node: &NodeRef, owner: NodeId) -> Vec<NodeRef> {
        match axis {
            Axis::SelfAxis | Axis::DescendantOrSelf => vec![node.clone()],
            Axis::Parent => vec![NodeRef::Node(owner)],
            Axis::Ancestor => self.doc.ancestors(owner).map(NodeRef::Node).collect(),
            Axis::AncestorOrSelf => std::iter::once(node.clone())
                .chain(self.doc.ancestors(owner).map(NodeRef::Node))
                .collect(),
            Axis::Following => self
                .doc
                .descendants(owner)
                .map(NodeRef::Node)
                .chain(self.following(owner))
                .collect(),
            Axis::Preceding => self.preceding(owner),
            _ => Vec::new(),
        }
    }

    fn following(&self, id: NodeId) -> Vec<NodeRef> {
        let doc = self.doc;
        let mut out = Vec::new();
        for ancestor in doc.ancestors(id) {
            let mut sibling = doc.next_sibling(ancestor);
            while let Some(s) = sibling {
                out.push(NodeRef::Node(s));
                out.extend(doc.descendants(s).map(NodeRef::Node));
                sibling = doc.next_sibling(s);
            }
        }
        out
    }

    fn preceding(&self, id: NodeId) -> Vec<NodeRef> {
        let doc = self.doc;
        let mut out = Vec::new();
        for ancestor in doc.ancestors(id) {
            let mut sibling = doc.prev_sibling(ancestor);
            while let Some(s) = sibling {
                let subtree: Vec<NodeId> = doc.descendants(s).collect();
                out.extend(subtree.into_iter().rev().map(NodeRef::Node));
                out.push(NodeRef::Node(s));
                sibling = doc.prev_sibling(s);
            }
        }
        out
    }

    fn node_test(&self, axis: Axis, test: &NodeTest, node: &NodeRef) -> bool {
        let id = match node {
            NodeRef::Attribute { name, .. } => {
                return match test {
                    NodeTest::Node => true,
                    NodeTest::Wildcard => axis == Axis::Attribute,
                    NodeTest::Name(wanted) => axis == Axis::Attribute && name == wanted,
                    _ => false,
                };
            }
            NodeRef::Node(id) => *id,
        };
        let kind = self.doc.node_kind(id);
        match test {
            NodeTest::Node => true,
            NodeTest::Wildcard => kind.is_element(),
            NodeTest::Name(wanted) => {
                matches!(kind, NodeKind::Element { name, .. } if name == wanted)
            }
            NodeTest::Text => matches!(kind, NodeKind::Text { .. } | NodeKind::CData { .. }),
            NodeTest::Comment => matches!(kind, NodeKind::Comment { .. }),
            NodeTest::ProcessingInstruction(wanted) => match kind {
                NodeKind::ProcessingInstruction { target, .. } => {
                    wanted.as_ref().map_or(true, |w| w == target)
                }
                _ => false,
            },
        }
    }

    /// Removes duplicates and sorts into document order.
    fn normalize(&self, nodes: Vec<NodeRef>) -> Vec<NodeRef> {
        let mut seen = HashSet::with_capacity(nodes.len());
        let mut unique: Vec<NodeRef> = nodes.into_iter().filter(|n| seen.insert(n.clone())).collect();
        unique.sort_by_cached_key(|n| self.order_key(n));
        unique
    }

    fn order_key(&self, node: &NodeRef) -> (usize, usize) {
        match node {
            NodeRef::Node(id) => (self.order.rank(*id).unwrap_or(usize::MAX), 0),
            NodeRef::Attribute { owner, name } => {
                let index = self
                    .doc
                    .attributes(*owner)
                    .iter()
                    .position(|a| &a.name == name)
                    .unwrap_or(0);
                (self.order.rank(*owner).unwrap_or(usize::MAX), index + 1)
            }
        }
    }

    // --- Operators ---

    fn eval_binary(&self, op: BinaryOp, left: &Expr, right: &Expr, ctx: &Context) -> bool {
        match op {
            BinaryOp::Or => {
                let l = self.eval(left, ctx);
                to_boolean(&l) || {
                    let r = self.eval(right, ctx);
                    to_boolean(&r)
                }
            }
            BinaryOp::And => {
                let l = self.eval(left, ctx);
                to_boolean(&l) && {
                    let r = self.eval(right, ctx);
                    to_boolean(&r)
                }
            }
            _ => {
                let l = self.eval(left, ctx);
                let r = self.eval(right, ctx);
                self.compare(op, &l, &r)
            }
        }
    }

    fn compare(&self, op: BinaryOp, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Nodes(nodes), Value::Boolean(_)) => {
                compare_atomic(op, &Value::Boolean(!nodes.is_empty()), right)
            }
            (Value::Boolean(_), Value::Nodes(nodes)) => {
                compare_atomic(op, left, &Value::Boolean(!nodes.is_empty()))
            }
            (Value::Nodes(a), Value::Nodes(b)) => {
                let b: Vec<String> = b.iter().map(|n| self.string_value(n)).collect();
                a.iter().any(|x| {
                    let x = Value::String(self.string_value(x));
                    b.iter().any(|y| compare_atomic(op, &x, &Value::String(y.clone())))
                })
            }
            (Value::Nodes(a), other) => a
                .iter()
                .any(|x| compare_atomic(op, &Value::String(self.string_value(x)), other)),
            (other, Value::Nodes(b)) => b
                .iter()
                .any(|y| compare_atomic(op, other, &Value::String(self.string_value(y)))),
            _ => compare_atomic(op, left, right),
        }
    }

    // --- Functions ---

    #[allow(clippy::cast_precision_loss)]
    fn eval_call(&self, function: Function, args: &[Expr], ctx: &Context) -> Value {
        match function {
            Function::Last => Value::Number(ctx.size as f64),
            Function::Position => Value::Number(ctx.position as f64),
            Function::True => Value::Boolean(true),
            Function::False => Value::Boolean(false),
            Function::Not => {
                let v = self.arg(args, 0, ctx);
                Value::Boolean(!to_boolean(&v))
            }
            Function::Count => {
                let n = args.first().map_or(0, |a| self.eval_nodes(a, ctx).len());
                Value::Number(n as f64)
            }
            Function::Name | Function::LocalName => {
                let target = match args.first() {
                    Some(arg) => self.eval_nodes(arg, ctx).into_iter().next(),
                    None => Some(ctx.node.clone()),
                };
                let name = target.map(|n| self.node_name(&n)).unwrap_or_default();
                if function == Function::LocalName {
                    let local = name.rsplit(':').next().unwrap_or_default();
                    Value::String(local.to_string())
                } else {
                    Value::String(name)
                }
            }
            Function::String => Value::String(self.string_arg(args, ctx)),
            Function::NormalizeSpace => {
                let s = self.string_arg(args, ctx);
                let words: Vec<&str> = s
                    .split(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
                    .filter(|w| !w.is_empty())
                    .collect();
                Value::String(words.join(" "))
            }
            Function::StringLength => {
                Value::Number(self.string_arg(args, ctx).chars().count() as f64)
            }
            Function::Contains | Function::StartsWith => {
                let haystack = self.arg(args, 0, ctx);
                let needle = self.arg(args, 1, ctx);
                let haystack = self.string_of(&haystack);
                let needle = self.string_of(&needle);
                Value::Boolean(if function == Function::Contains {
                    haystack.contains(needle.as_str())
                } else {
                    haystack.starts_with(needle.as_str())
                })
            }
        }
    }

    fn arg(&self, args: &[Expr], index: usize, ctx: &Context) -> Value {
        args.get(index)
            .map_or(Value::Boolean(false), |a| self.eval(a, ctx))
    }

    /// The single optional argument as a string, defaulting to the context
    /// node's string-value.
    fn string_arg(&self, args: &[Expr], ctx: &Context) -> String {
        match args.first() {
            Some(arg) => {
                let v = self.eval(arg, ctx);
                self.string_of(&v)
            }
            None => self.string_value(&ctx.node),
        }
    }

    // --- Conversions ---

    fn string_value(&self, node: &NodeRef) -> String {
        match node {
            NodeRef::Node(id) => self.doc.text_content(*id),
            NodeRef::Attribute { owner, name } => {
                self.doc.attribute(*owner, name).unwrap_or_default().to_string()
            }
        }
    }

    fn node_name(&self, node: &NodeRef) -> String {
        match node {
            NodeRef::Node(id) => self.doc.node_name(*id).unwrap_or_default().to_string(),
            NodeRef::Attribute { name, .. } => name.clone(),
        }
    }

    fn string_of(&self, value: &Value) -> String {
        match value {
            Value::Nodes(nodes) => nodes
                .first()
                .map(|n| self.string_value(n))
                .unwrap_or_default(),
            atomic => atomic_string(atomic),
        }
    }
}

fn wrap(ids: impl Iterator<Item = NodeId>) -> Vec<NodeRef> {
    ids.map(NodeRef::Node).collect()
}

fn compare_atomic(op: BinaryOp, left: &Value, right: &Value) -> bool {
    match op {
        BinaryOp::Eq | BinaryOp::Neq => {
            let equal = match (left, right) {
                (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
                    to_boolean(left) == to_boolean(right)
                }
                (Value::Number(_), _) | (_, Value::Number(_)) => {
                    atomic_number(left) == atomic_number(right)
                }
                _ => atomic_string(left) == atomic_string(right),
            };
            equal == (op == BinaryOp::Eq)
        }
        BinaryOp::Lt => atomic_number(left) < atomic_number(right),
        BinaryOp::Lte => atomic_number(left) <= atomic_number(right),
        BinaryOp::Gt => atomic_number(left) > atomic_number(right),
        BinaryOp::Gte => atomic_number(left) >= atomic_number(right),
        BinaryOp::Or | BinaryOp::And => false,
    }
}

fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Boolean(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::Nodes(nodes) => !nodes.is_empty(),
    }
}

fn atomic_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Boolean(b) => f64::from(u8::from(*b)),
        Value::String(s) => parse_number(s),
        Value::Nodes(_) => f64::NAN,
    }
}

fn atomic_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::Nodes(_) => String::new(),
    }
}

/// Parses the `Number` production with optional surrounding whitespace
/// and a leading minus sign. Anything else is NaN.
fn parse_number(s: &str) -> f64 {
    let s = s.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
    let digits = s.strip_prefix('-').unwrap_or(s);
    let valid = !digits.is_empty()
        && digits.bytes().any(|b| b.is_ascii_digit())
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && digits.bytes().filter(|&b| b == b'.').count() <= 1;
    if valid {
        s.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let s = if n > 0.0 { "Infinity" } else { "-Infinity" };
        s.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}
