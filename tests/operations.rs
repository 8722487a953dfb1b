//! End-to-end tests for the append, delete and collect operations.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use xmlsplice::error::ParseContext;
use xmlsplice::serial::DeclarationPolicy;
use xmlsplice::xpath::PathError;
use xmlsplice::{
    append_children_at_path, collect_nodes_at_path, delete_nodes_at_path, Error, FailureMode,
    OperationOptions, Status,
};

fn opts() -> OperationOptions {
    OperationOptions::default()
}

fn collect(doc: &str, path: Option<&str>) -> Vec<Option<String>> {
    collect_nodes_at_path(doc, path, &opts()).unwrap()
}

// ---------------------------------------------------------------------------
// Append
// ---------------------------------------------------------------------------

#[test]
fn test_append_child_to_root() {
    let out = append_children_at_path("<root><item/></root>", "/root", "<child/>", &opts()).unwrap();
    assert_eq!(out.document, "<root><item/><child/></root>");
    assert_eq!(out.status, Status::Applied { matched: 1, affected: 1 });
}

#[test]
fn test_append_under_every_match() {
    let doc = "<list><group/><group><x/></group></list>";
    let out = append_children_at_path(doc, "//group", "<entry n=\"1\">v</entry>", &opts()).unwrap();
    assert_eq!(
        out.document,
        "<list><group><entry n=\"1\">v</entry></group><group><x/><entry n=\"1\">v</entry></group></list>"
    );
    assert_eq!(out.status, Status::Applied { matched: 2, affected: 2 });
}

#[test]
fn test_append_multi_node_fragment_keeps_order() {
    let out = append_children_at_path("<r/>", "/r", "<a/>text<!--c--><b/>", &opts()).unwrap();
    assert_eq!(out.document, "<r><a/>text<!--c--><b/></r>");
    assert_eq!(out.status, Status::Applied { matched: 1, affected: 4 });
}

#[test]
fn test_append_zero_matches_is_noop() {
    let doc = "<root>\n  <a  x='1'/>\n</root>";
    let out = append_children_at_path(doc, "//nonexistent", "<f/>", &opts()).unwrap();
    assert_eq!(out.document, doc);
    assert_eq!(out.status, Status::NoMatch);
    assert!(out.is_no_match());
}

#[test]
fn test_append_bad_fragment_fails_when_path_matches() {
    let err = append_children_at_path("<r><a/></r>", "//a", "<open>", &opts()).unwrap_err();
    assert!(matches!(
        err,
        Error::Parse {
            context: ParseContext::Fragment,
            ..
        }
    ));

    let soft = opts().failure_mode(FailureMode::ReturnOriginal);
    let out = append_children_at_path("<r><a/></r>", "//a", "<open>", &soft).unwrap();
    assert_eq!(out.document, "<r><a/></r>");
    assert!(matches!(out.status, Status::Recovered(Error::Parse { .. })));
}

#[test]
fn test_append_zero_matches_never_reads_fragment() {
    let out = append_children_at_path("<root/>", "//nonexistent", "<open>", &opts()).unwrap();
    assert_eq!(out.document, "<root/>");
    assert_eq!(out.status, Status::NoMatch);

    let err = append_children_at_path("<root/>", "//a[", "<open>", &opts()).unwrap_err();
    assert!(matches!(err, Error::Path(PathError::Syntax { .. })));
}

#[test]
fn test_append_whitespace_fragment_appends_nothing() {
    let out = append_children_at_path("<r/>", "/r", "  \n", &opts()).unwrap();
    assert_eq!(out.document, "<r/>");
    assert_eq!(out.status, Status::Applied { matched: 1, affected: 0 });
}

#[test]
fn test_append_to_attribute_is_refused() {
    let err = append_children_at_path("<r a=\"1\"/>", "/r/@a", "<x/>", &opts()).unwrap_err();
    assert!(matches!(err, Error::Mutation(_)));
}

#[test]
fn test_append_preserves_declaration() {
    let doc = "<?xml version=\"1.0\"?><r/>";
    let out = append_children_at_path(doc, "/r", "<c/>", &opts()).unwrap();
    assert_eq!(out.document, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<r><c/></r>");
}

#[test]
fn test_append_declaration_policies() {
    let always = opts().declaration(DeclarationPolicy::Always);
    let out = append_children_at_path("<r/>", "/r", "<c/>", &always).unwrap();
    assert_eq!(out.document, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<r><c/></r>");

    let never = opts().declaration(DeclarationPolicy::Never);
    let out = append_children_at_path("<?xml version=\"1.0\"?><r/>", "/r", "<c/>", &never).unwrap();
    assert_eq!(out.document, "<r><c/></r>");
}

#[test]
fn test_append_result_node_limit() {
    let limited = opts().max_result_nodes(10);
    let doc = "<r><a/><a/><a/><a/></r>";
    let err = append_children_at_path(doc, "//a", "<x><y/></x>", &limited).unwrap_err();
    assert!(matches!(err, Error::Resource(_)));
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[test]
fn test_delete_single_match() {
    let out = delete_nodes_at_path("<root><a/><b/></root>", "//a", &opts()).unwrap();
    assert_eq!(out.document, "<root><b/></root>");
    assert_eq!(out.status, Status::Applied { matched: 1, affected: 1 });
}

#[test]
fn test_delete_union_leaves_empty_parent() {
    let out = delete_nodes_at_path("<a><b/><c/></a>", "//b|//c", &opts()).unwrap();
    assert_eq!(out.document, "<a/>");
}

#[test]
fn test_delete_nested_matches() {
    let doc = "<r><s><s><s/></s></s><t/></r>";
    let out = delete_nodes_at_path(doc, "//s", &opts()).unwrap();
    assert_eq!(out.document, "<r><t/></r>");
    assert_eq!(out.status, Status::Applied { matched: 3, affected: 3 });
}

#[test]
fn test_delete_is_idempotent() {
    let doc = "<r><a id=\"1\"/><b><a id=\"2\"/></b></r>";
    let once = delete_nodes_at_path(doc, "//a", &opts()).unwrap();
    let twice = delete_nodes_at_path(&once.document, "//a", &opts()).unwrap();
    assert_eq!(once.document, twice.document);
    assert_eq!(twice.status, Status::NoMatch);
}

#[test]
fn test_delete_does_not_prune_empty_ancestors() {
    let out = delete_nodes_at_path("<r><w><only/></w></r>", "//only", &opts()).unwrap();
    assert_eq!(out.document, "<r><w/></r>");
}

#[test]
fn test_delete_attributes_and_text() {
    let doc = "<r keep=\"1\" drop=\"2\">hello<c/></r>";
    let out = delete_nodes_at_path(doc, "/r/@drop | /r/text()", &opts()).unwrap();
    assert_eq!(out.document, "<r keep=\"1\"><c/></r>");
}

#[test]
fn test_delete_positional() {
    let doc = "<r><i>1</i><i>2</i><i>3</i></r>";
    let out = delete_nodes_at_path(doc, "/r/i[2]", &opts()).unwrap();
    assert_eq!(out.document, "<r><i>1</i><i>3</i></r>");
}

#[test]
fn test_delete_root_element_is_refused() {
    let err = delete_nodes_at_path("<r><a/></r>", "/r", &opts()).unwrap_err();
    assert!(matches!(err, Error::Mutation(_)));
}

// ---------------------------------------------------------------------------
// Collect
// ---------------------------------------------------------------------------

#[test]
fn test_collect_default_path_includes_root() {
    assert_eq!(
        collect("<root><a/><b/></root>", None),
        vec![
            Some("<root><a/><b/></root>".to_string()),
            Some("<a/>".to_string()),
            Some("<b/>".to_string()),
        ]
    );
}

#[test]
fn test_collect_order_independent_of_path_form() {
    let doc = "<r><a><b/></a><c/></r>";
    let by_wildcard = collect(doc, Some("//*"));
    let by_steps = collect(doc, Some("/r/c | /r/a/b | /r | /r/a"));
    assert_eq!(by_wildcard, by_steps);
}

#[test]
fn test_collect_text_attributes_and_comments() {
    let doc = "<r k=\"v\"><!--note-->body</r>";
    assert_eq!(
        collect(doc, Some("/r/@k | //comment() | //text()")),
        vec![
            Some(" k=\"v\"".to_string()),
            Some("<!--note-->".to_string()),
            Some("body".to_string()),
        ]
    );
}

#[test]
fn test_collect_no_match_is_empty() {
    assert!(collect("<r/>", Some("//missing")).is_empty());
}

#[test]
fn test_collect_escapes_text() {
    assert_eq!(
        collect("<r>a &amp; b &lt; c</r>", Some("//text()")),
        vec![Some("a &amp; b &lt; c".to_string())]
    );
}

#[test]
fn test_collect_with_indent() {
    let indented = opts().collect_indent(true);
    let items = collect_nodes_at_path("<r><a><b/></a></r>", Some("/r/a"), &indented).unwrap();
    assert_eq!(items, vec![Some("<a>\n  <b/>\n</a>".to_string())]);
}

#[test]
fn test_collect_errors_are_hard_even_in_soft_mode() {
    let soft = opts().failure_mode(FailureMode::ReturnOriginal);
    assert!(collect_nodes_at_path("<r>", None, &soft).is_err());
    assert!(matches!(
        collect_nodes_at_path("<r/>", Some("count(//r)"), &soft),
        Err(Error::Path(PathError::NotANodeSet { .. }))
    ));
}

// ---------------------------------------------------------------------------
// Failure modes
// ---------------------------------------------------------------------------

#[test]
fn test_invalid_path_is_syntax_error() {
    let err = delete_nodes_at_path("<r/>", "//a[", &opts()).unwrap_err();
    assert!(matches!(err, Error::Path(PathError::Syntax { position: 4, .. })));
}

#[test]
fn test_malformed_document_is_parse_error() {
    let err = delete_nodes_at_path("<r><a></r>", "//a", &opts()).unwrap_err();
    assert!(matches!(
        err,
        Error::Parse {
            context: ParseContext::Document,
            ..
        }
    ));
    assert!(err.to_string().starts_with("invalid XML document: parse error at 1:"));
}

#[test]
fn test_soft_mode_returns_original_document() {
    let soft = opts().failure_mode(FailureMode::ReturnOriginal);
    let doc = "<r><a/></r>";

    let out = delete_nodes_at_path(doc, "//a[", &soft).unwrap();
    assert_eq!(out.document, doc);
    assert!(matches!(out.status, Status::Recovered(Error::Path(_))));

    let out = append_children_at_path(doc, "//a", "<unclosed>", &soft).unwrap();
    assert_eq!(out.document, doc);
    assert!(matches!(out.status, Status::Recovered(Error::Parse { .. })));
}

#[test]
fn test_input_size_limit() {
    let small = opts().max_input_bytes(8);
    let err = delete_nodes_at_path("<root><a/></root>", "//a", &small).unwrap_err();
    assert!(matches!(err, Error::Resource(_)));
}

#[test]
fn test_bom_is_ignored() {
    let out = delete_nodes_at_path("\u{FEFF}<r><a/></r>", "//a", &opts()).unwrap();
    assert_eq!(out.document, "<r/>");
}

#[test]
fn test_concurrent_calls_are_independent() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                let doc = format!("<r n=\"{i}\"><a/></r>");
                append_children_at_path(&doc, "/r/a", &format!("<v>{i}</v>"), &OperationOptions::default())
                    .unwrap()
                    .document
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), format!("<r n=\"{i}\"><a><v>{i}</v></a></r>"));
    }
}
