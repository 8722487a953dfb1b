//! The three composed operations: append, delete and collect at a path.
//!
//! Each call runs a short pipeline over call-local state only:
//!
//! ```text
//! Parsing -> Selecting -> Mutating | Collecting -> Serializing -> Done
//! ```
//!
//! Failures while parsing or selecting end the call; with
//! [`FailureMode::ReturnOriginal`] an append or delete turns them into a
//! [`Status::Recovered`] outcome carrying the untouched input.
//!
//! # Examples
//!
//! ```
//! use xmlsplice::ops::{append_children_at_path, OperationOptions, Status};
//!
//! let opts = OperationOptions::default();
//! let out = append_children_at_path("<root><item/></root>", "/root", "<child/>", &opts).unwrap();
//! assert_eq!(out.document, "<root><item/><child/></root>");
//! assert_eq!(out.status, Status::Applied { matched: 1, affected: 1 });
//! ```

use log::{debug, warn};

use crate::error::{Error, ResourceError};
use crate::mutate;
use crate::parser::{self, ParseOptions};
use crate::serial::{self, DeclarationPolicy, SerializeOptions};
use crate::tree::Document;
use crate::xpath::{NodeRef, Selector};

/// Path used by [`collect_nodes_at_path`] when none is given: every element.
pub const DEFAULT_COLLECT_PATH: &str = "//*";

/// Default cap on the size of a single input text (64 MiB).
pub const DEFAULT_MAX_INPUT_BYTES: usize = 64 * 1024 * 1024;

/// Default cap on the arena size an append may grow a document to.
pub const DEFAULT_MAX_RESULT_NODES: usize = 10_000_000;

/// What append and delete do when the call cannot complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// Return the error to the caller.
    #[default]
    Abort,
    /// Return the original document with [`Status::Recovered`].
    ReturnOriginal,
}

/// Options shared by the façade operations.
///
/// ```
/// use xmlsplice::ops::{FailureMode, OperationOptions};
/// use xmlsplice::serial::DeclarationPolicy;
///
/// let opts = OperationOptions::default()
///     .failure_mode(FailureMode::ReturnOriginal)
///     .declaration(DeclarationPolicy::Never)
///     .max_input_bytes(1 << 20);
/// assert_eq!(opts.max_input_bytes, 1 << 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOptions {
    /// Options for parsing the document and the fragment.
    pub parse: ParseOptions,
    /// Hard or soft failure for append and delete.
    pub failure_mode: FailureMode,
    /// Declaration policy for re-serialized documents.
    pub declaration: DeclarationPolicy,
    /// Indent each collected node.
    pub collect_indent: bool,
    /// Largest accepted document or fragment text, in bytes.
    pub max_input_bytes: usize,
    /// Largest arena an append may produce, in nodes.
    pub max_result_nodes: usize,
}

impl Default for OperationOptions {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            failure_mode: FailureMode::default(),
            declaration: DeclarationPolicy::default(),
            collect_indent: false,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_result_nodes: DEFAULT_MAX_RESULT_NODES,
        }
    }
}

impl OperationOptions {
    /// Sets the parse options.
    #[must_use]
    pub fn parse(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }

    /// Sets the failure mode.
    #[must_use]
    pub fn failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Sets the declaration policy.
    #[must_use]
    pub fn declaration(mut self, policy: DeclarationPolicy) -> Self {
        self.declaration = policy;
        self
    }

    /// Enables indentation of collected nodes.
    #[must_use]
    pub fn collect_indent(mut self, yes: bool) -> Self {
        self.collect_indent = yes;
        self
    }

    /// Sets the input size limit.
    #[must_use]
    pub fn max_input_bytes(mut self, max: usize) -> Self {
        self.max_input_bytes = max;
        self
    }

    /// Sets the result arena size limit.
    #[must_use]
    pub fn max_result_nodes(mut self, max: usize) -> Self {
        self.max_result_nodes = max;
        self
    }

    fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions::default().declaration(self.declaration)
    }
}

/// How an append or delete call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The path matched and the edit was applied.
    Applied {
        /// Number of nodes the path selected.
        matched: usize,
        /// Number of nodes inserted (append) or removed (delete).
        affected: usize,
    },
    /// The path selected nothing; the document is the input, unchanged.
    NoMatch,
    /// The call failed and the input was returned as is.
    Recovered(Error),
}

/// Result of an append or delete: a status and the document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// How the call ended.
    pub status: Status,
    /// The edited document, or the original text for `NoMatch` and
    /// `Recovered`.
    pub document: String,
}

impl Outcome {
    fn unchanged(status: Status, doc_text: &str) -> Self {
        Self {
            status,
            document: doc_text.to_string(),
        }
    }

    /// `true` if the edit was applied.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self.status, Status::Applied { .. })
    }

    /// `true` if the path selected nothing.
    #[must_use]
    pub fn is_no_match(&self) -> bool {
        self.status == Status::NoMatch
    }
}

/// Parses `doc_text`, selects `path`, appends a copy of `fragment_text`
/// under every match and returns the re-serialized document.
///
/// The fragment is only parsed once the path has matched something, so a
/// call that selects nothing returns the input even when the fragment is
/// malformed. A bad fragment still fails before any target is touched.
///
/// # Errors
///
/// With [`FailureMode::Abort`], returns the parse, path, mutation,
/// serialization or resource error that stopped the call.
pub fn append_children_at_path(
    doc_text: &str,
    path: &str,
    fragment_text: &str,
    options: &OperationOptions,
) -> Result<Outcome, Error> {
    recover(doc_text, options, "append", || {
        let mut doc = parse_document(doc_text, options)?;
        let targets = select(&doc, path)?;
        if targets.is_empty() {
            return Ok(Outcome::unchanged(Status::NoMatch, doc_text));
        }

        check_input_size(fragment_text, "fragment", options)?;
        let fragment =
            parser::parse_fragment_with_options(fragment_text, &options.parse).map_err(Error::fragment)?;
        debug!(
            target: "xmlsplice::ops",
            "parsed fragment with {} top-level node(s)",
            fragment.top_level().count()
        );

        let projected = doc
            .node_count()
            .saturating_add(targets.len().saturating_mul(fragment.node_count()));
        if projected > options.max_result_nodes {
            return Err(ResourceError::new(format!(
                "appending to {} target(s) would grow the document to {projected} nodes (limit {})",
                targets.len(),
                options.max_result_nodes
            ))
            .into());
        }

        let affected = mutate::append_children(&mut doc, &targets, &fragment)?;
        let document = serialize_document(&doc, options)?;
        Ok(Outcome {
            status: Status::Applied {
                matched: targets.len(),
                affected,
            },
            document,
        })
    })
}

/// Parses `doc_text`, removes every node `path` selects (in reverse
/// document order) and returns the re-serialized document.
///
/// # Errors
///
/// With [`FailureMode::Abort`], returns the parse, path, mutation,
/// serialization or resource error that stopped the call.
///
/// # Examples
///
/// ```
/// use xmlsplice::ops::{delete_nodes_at_path, OperationOptions};
///
/// let out = delete_nodes_at_path("<root><a/><b/></root>", "//a", &OperationOptions::default()).unwrap();
/// assert_eq!(out.document, "<root><b/></root>");
/// ```
pub fn delete_nodes_at_path(
    doc_text: &str,
    path: &str,
    options: &OperationOptions,
) -> Result<Outcome, Error> {
    recover(doc_text, options, "delete", || {
        let mut doc = parse_document(doc_text, options)?;
        let targets = select(&doc, path)?;
        if targets.is_empty() {
            return Ok(Outcome::unchanged(Status::NoMatch, doc_text));
        }

        let affected = mutate::delete_nodes(&mut doc, &targets)?;
        let document = serialize_document(&doc, options)?;
        Ok(Outcome {
            status: Status::Applied {
                matched: targets.len(),
                affected,
            },
            document,
        })
    })
}

/// Parses `doc_text` and serializes every node `path` selects, in document
/// order. `path` defaults to [`DEFAULT_COLLECT_PATH`].
///
/// A node that cannot be serialized, or renders to nothing (an empty text
/// node), yields `None` in its slot instead of failing the call.
///
/// # Errors
///
/// Always fails hard, regardless of [`OperationOptions::failure_mode`], on
/// an invalid document, an invalid path, or a path that does not select
/// nodes.
///
/// # Examples
///
/// ```
/// use xmlsplice::ops::{collect_nodes_at_path, OperationOptions};
///
/// let items = collect_nodes_at_path("<root><a/><b/></root>", None, &OperationOptions::default()).unwrap();
/// assert_eq!(
///     items,
///     vec![Some("<root><a/><b/></root>".to_string()), Some("<a/>".to_string()), Some("<b/>".to_string())]
/// );
/// ```
pub fn collect_nodes_at_path(
    doc_text: &str,
    path: Option<&str>,
    options: &OperationOptions,
) -> Result<Vec<Option<String>>, Error> {
    let doc = parse_document(doc_text, options)?;
    let targets = select(&doc, path.unwrap_or(DEFAULT_COLLECT_PATH))?;

    Ok(collect_nodes(&doc, &targets, options))
}

/// Serializes each target on its own. A target that fails to serialize or
/// renders empty becomes `None`; the others are unaffected.
pub(crate) fn collect_nodes(
    doc: &Document,
    targets: &[NodeRef],
    options: &OperationOptions,
) -> Vec<Option<String>> {
    let serialize_options = options.serialize_options().indent(options.collect_indent);
    let items: Vec<Option<String>> = targets
        .iter()
        .enumerate()
        .map(|(i, target)| match serial::serialize_node(doc, target, &serialize_options) {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => {
                warn!(target: "xmlsplice::ops", "collected node {i} rendered empty; recording null");
                None
            }
            Err(e) => {
                warn!(target: "xmlsplice::ops", "collected node {i} could not be serialized: {e}");
                None
            }
        })
        .collect();
    debug!(
        target: "xmlsplice::ops",
        "collected {} node(s), {} null",
        items.len(),
        items.iter().filter(|i| i.is_none()).count()
    );
    items
}

/// Runs one append or delete pipeline and applies the failure mode.
fn recover(
    doc_text: &str,
    options: &OperationOptions,
    operation: &str,
    run: impl FnOnce() -> Result<Outcome, Error>,
) -> Result<Outcome, Error> {
    match run() {
        Ok(outcome) => {
            debug!(target: "xmlsplice::ops", "{operation} finished: {:?}", outcome.status);
            Ok(outcome)
        }
        Err(err) => match options.failure_mode {
            FailureMode::Abort => Err(err),
            FailureMode::ReturnOriginal => {
                warn!(target: "xmlsplice::ops", "{operation} failed, returning original document: {err}");
                Ok(Outcome::unchanged(Status::Recovered(err), doc_text))
            }
        },
    }
}

fn check_input_size(text: &str, what: &str, options: &OperationOptions) -> Result<(), Error> {
    if text.len() > options.max_input_bytes {
        return Err(ResourceError::new(format!(
            "{what} of {} bytes exceeds the {} byte limit",
            text.len(),
            options.max_input_bytes
        ))
        .into());
    }
    Ok(())
}

fn parse_document(doc_text: &str, options: &OperationOptions) -> Result<Document, Error> {
    check_input_size(doc_text, "document", options)?;
    let text = doc_text.strip_prefix('\u{FEFF}').unwrap_or(doc_text);
    let mut doc = parser::parse_str_with_options(text, &options.parse).map_err(Error::document)?;
    // Output is always UTF-8 text, whatever the source declared.
    doc.encoding = Some("UTF-8".to_string());
    debug!(target: "xmlsplice::ops", "parsed document: {} node(s)", doc.node_count());
    Ok(doc)
}

fn select(doc: &Document, path: &str) -> Result<Vec<NodeRef>, Error> {
    let selector = Selector::parse(path)?;
    Ok(selector.select(doc))
}

fn serialize_document(doc: &Document, options: &OperationOptions) -> Result<String, Error> {
    let text = serial::try_serialize(doc, &options.serialize_options())?;
    debug!(target: "xmlsplice::ops", "serialized {} byte(s)", text.len());
    Ok(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ParseContext;
    use crate::tree::NodeKind;
    use crate::xpath::PathError;
    use pretty_assertions::assert_eq;

    fn opts() -> OperationOptions {
        OperationOptions::default()
    }

    fn soft() -> OperationOptions {
        OperationOptions::default().failure_mode(FailureMode::ReturnOriginal)
    }

    #[test]
    fn test_append_scenario() {
        let out = append_children_at_path("<root><item/></root>", "/root", "<child/>", &opts()).unwrap();
        assert_eq!(out.document, "<root><item/><child/></root>");
        assert!(out.is_applied());
    }

    #[test]
    fn test_append_no_match_returns_input_verbatim() {
        let input = "<root>  <a x='1'/></root>";
        let out = append_children_at_path(input, "//nonexistent", "<c/>", &opts()).unwrap();
        assert_eq!(out.document, input);
        assert!(out.is_no_match());
    }

    #[test]
    fn test_append_bad_fragment_fails_before_mutation() {
        let err = append_children_at_path("<r/>", "/r", "<open>", &opts()).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                context: ParseContext::Fragment,
                ..
            }
        ));
    }

    #[test]
    fn test_append_bad_fragment_ignored_without_match() {
        let out = append_children_at_path("<root/>", "//nonexistent", "<open>", &opts()).unwrap();
        assert_eq!(out.document, "<root/>");
        assert!(out.is_no_match());
    }

    #[test]
    fn test_append_path_error_reported_before_fragment_error() {
        let err = append_children_at_path("<root/>", "//a[", "<open>", &opts()).unwrap_err();
        assert!(matches!(err, Error::Path(PathError::Syntax { .. })));
    }

    #[test]
    fn test_append_multi_node_fragment() {
        let out = append_children_at_path("<r><a/><a/></r>", "//a", "<x/><y/>", &opts()).unwrap();
        assert_eq!(out.document, "<r><a><x/><y/></a><a><x/><y/></a></r>");
        assert_eq!(out.status, Status::Applied { matched: 2, affected: 4 });
    }

    #[test]
    fn test_append_resource_limit() {
        let options = opts().max_result_nodes(5);
        let err = append_children_at_path("<r><a/><a/><a/></r>", "//a", "<x/>", &options).unwrap_err();
        assert!(matches!(err, Error::Resource(_)));
    }

    #[test]
    fn test_soft_failure_returns_original() {
        let input = "<r><a/></r>";
        let out = append_children_at_path(input, "//a[", "<x/>", &soft()).unwrap();
        assert_eq!(out.document, input);
        assert!(matches!(out.status, Status::Recovered(Error::Path(PathError::Syntax { .. }))));

        let out = delete_nodes_at_path("<r>", "//a", &soft()).unwrap();
        assert_eq!(out.document, "<r>");
        assert!(matches!(out.status, Status::Recovered(Error::Parse { .. })));
    }

    #[test]
    fn test_delete_scenario() {
        let out = delete_nodes_at_path("<root><a/><b/></root>", "//a", &opts()).unwrap();
        assert_eq!(out.document, "<root><b/></root>");
        assert_eq!(out.status, Status::Applied { matched: 1, affected: 1 });
    }

    #[test]
    fn test_delete_root_element_is_refused() {
        let err = delete_nodes_at_path("<root/>", "/root", &opts()).unwrap_err();
        assert!(matches!(err, Error::Mutation(_)));
    }

    #[test]
    fn test_collect_scenario() {
        let items = collect_nodes_at_path("<root><a/><b/></root>", None, &opts()).unwrap();
        assert_eq!(
            items,
            vec![
                Some("<root><a/><b/></root>".to_string()),
                Some("<a/>".to_string()),
                Some("<b/>".to_string()),
            ]
        );
    }

    #[test]
    fn test_collect_ignores_soft_mode() {
        let err = collect_nodes_at_path("<r/>", Some("count(//r)"), &soft()).unwrap_err();
        assert_eq!(err, Error::Path(PathError::NotANodeSet { kind: "number" }));
    }

    #[test]
    fn test_collect_attributes_and_text() {
        let items =
            collect_nodes_at_path("<r k=\"v\">t</r>", Some("//@k | //text()"), &opts()).unwrap();
        assert_eq!(items, vec![Some(" k=\"v\"".to_string()), Some("t".to_string())]);
    }

    #[test]
    fn test_collect_indent() {
        let options = opts().collect_indent(true);
        let items = collect_nodes_at_path("<r><a><b/></a></r>", Some("//a"), &options).unwrap();
        assert_eq!(items, vec![Some("<a>\n  <b/>\n</a>".to_string())]);
    }

    #[test]
    fn test_collect_isolates_unserializable_node() {
        let mut doc = Document::new();
        let r = doc.create_node(NodeKind::element("r"));
        doc.append_child(doc.root(), r).unwrap();
        let a = doc.create_node(NodeKind::element("a"));
        let bad = doc.create_node(NodeKind::Comment {
            content: "a--b".to_string(),
        });
        let b = doc.create_node(NodeKind::element("b"));
        for id in [a, bad, b] {
            doc.append_child(r, id).unwrap();
        }

        let targets = [NodeRef::Node(a), NodeRef::Node(bad), NodeRef::Node(b)];
        let items = collect_nodes(&doc, &targets, &opts());
        assert_eq!(
            items,
            vec![Some("<a/>".to_string()), None, Some("<b/>".to_string())]
        );
    }

    #[test]
    fn test_collect_detached_target_is_null() {
        let mut doc = Document::parse_str("<r><a/><b/></r>").unwrap();
        let r = doc.root_element().unwrap();
        let a = doc.first_child(r).unwrap();
        let b = doc.last_child(r).unwrap();
        doc.detach(a);
        let items = collect_nodes(&doc, &[NodeRef::Node(a), NodeRef::Node(b)], &opts());
        assert_eq!(items, vec![None, Some("<b/>".to_string())]);
    }

    #[test]
    fn test_encoding_forced_to_utf8() {
        let input = "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<r><a/></r>";
        let out = delete_nodes_at_path(input, "//a", &opts()).unwrap();
        assert_eq!(out.document, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<r/>");
    }

    #[test]
    fn test_input_size_limit() {
        let options = opts().max_input_bytes(4);
        let err = collect_nodes_at_path("<root/>", None, &options).unwrap_err();
        assert!(matches!(err, Error::Resource(_)));
    }

    #[test]
    fn test_public_types_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Outcome>();
        assert_send_sync::<OperationOptions>();
        assert_send_sync::<Error>();
        assert_send_sync::<Document>();
    }
}
