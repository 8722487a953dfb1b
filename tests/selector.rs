//! Path selection against realistic documents.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use xmlsplice::xpath::{select, NodeRef, PathError, Selector};
use xmlsplice::Document;

const CATALOG: &str = r#"<catalog>
  <book id="bk101" lang="en">
    <author>Gambardella, Matthew</author>
    <title>XML Developer's Guide</title>
    <price>44.95</price>
  </book>
  <book id="bk102" lang="fr">
    <author>Ralls, Kim</author>
    <title>Midnight Rain</title>
    <price>5.95</price>
  </book>
  <!-- discontinued -->
  <magazine id="mg201">
    <title>Monthly</title>
  </magazine>
  <book id="bk103">
    <author>Corets, Eva</author>
    <title>Maeve Ascendant</title>
    <price>5.95</price>
  </book>
</catalog>"#;

/// The `id` attribute (or name) of each selected element.
fn ids(doc: &Document, path: &str) -> Vec<String> {
    select(doc, path)
        .unwrap()
        .iter()
        .map(|r| {
            let id = r.node().unwrap();
            doc.attribute(id, "id")
                .or_else(|| doc.node_name(id))
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

fn catalog() -> Document {
    Document::parse_str(CATALOG).unwrap()
}

#[test]
fn test_absolute_and_relative_steps_agree() {
    let doc = catalog();
    assert_eq!(ids(&doc, "/catalog/book"), ids(&doc, "catalog/book"));
    assert_eq!(ids(&doc, "/catalog/book"), vec!["bk101", "bk102", "bk103"]);
}

#[test]
fn test_wildcards() {
    let doc = catalog();
    assert_eq!(ids(&doc, "/catalog/*"), vec!["bk101", "bk102", "mg201", "bk103"]);
    assert_eq!(select(&doc, "//*").unwrap().len(), 15);
}

#[test]
fn test_positional_predicates() {
    let doc = catalog();
    assert_eq!(ids(&doc, "/catalog/book[1]"), vec!["bk101"]);
    assert_eq!(ids(&doc, "/catalog/book[last()]"), vec!["bk103"]);
    assert_eq!(ids(&doc, "/catalog/*[3]"), vec!["mg201"]);
    assert_eq!(ids(&doc, "/catalog/book[9]"), Vec::<String>::new());
    // `[1]` applies per parent step, not to the whole result.
    assert_eq!(ids(&doc, "//title[1]").len(), 4);
    assert_eq!(ids(&doc, "(//title)[1]").len(), 1);
}

#[test]
fn test_attribute_predicates() {
    let doc = catalog();
    assert_eq!(ids(&doc, "//book[@lang]"), vec!["bk101", "bk102"]);
    assert_eq!(ids(&doc, "//book[@lang='fr']"), vec!["bk102"]);
    assert_eq!(ids(&doc, "//book[not(@lang)]"), vec!["bk103"]);
}

#[test]
fn test_child_value_predicates() {
    let doc = catalog();
    assert_eq!(ids(&doc, "//book[price < 10]"), vec!["bk102", "bk103"]);
    assert_eq!(ids(&doc, "//book[price = 5.95 and @lang]"), vec!["bk102"]);
    assert_eq!(ids(&doc, "//*[title='Monthly']"), vec!["mg201"]);
}

#[test]
fn test_parent_and_ancestor_steps() {
    let doc = catalog();
    assert_eq!(ids(&doc, "//title[.='Midnight Rain']/.."), vec!["bk102"]);
    assert_eq!(ids(&doc, "//price/ancestor::catalog"), vec!["catalog"]);
    assert_eq!(
        ids(&doc, "//book[@id='bk102']/following-sibling::*"),
        vec!["mg201", "bk103"]
    );
}

#[test]
fn test_node_type_tests() {
    let doc = catalog();
    assert_eq!(select(&doc, "//comment()").unwrap().len(), 1);
    let authors = select(&doc, "//author/text()").unwrap();
    assert_eq!(authors.len(), 3);
    assert_eq!(doc.node_text(authors[1].node().unwrap()), Some("Ralls, Kim"));
}

#[test]
fn test_attribute_selection_in_document_order() {
    let doc = catalog();
    let hits = select(&doc, "//@lang | //@id").unwrap();
    let names: Vec<&str> = hits
        .iter()
        .map(|r| match r {
            NodeRef::Attribute { name, .. } => name.as_str(),
            NodeRef::Node(_) => "",
        })
        .collect();
    assert_eq!(names, vec!["id", "lang", "id", "lang", "id", "id"]);
}

#[test]
fn test_union_deduplicates() {
    let doc = catalog();
    assert_eq!(ids(&doc, "//book | /catalog/book | //book[2]").len(), 3);
}

#[test]
fn test_no_match_is_empty_not_error() {
    let doc = catalog();
    assert!(select(&doc, "//dvd").unwrap().is_empty());
    assert!(select(&doc, "/book").unwrap().is_empty());
}

#[test]
fn test_syntax_errors_carry_position() {
    let cases = [
        ("", 0),
        ("//book[", 7),
        ("/catalog/", 9),
        ("//book[@id=']", 11),
        ("//book]", 6),
    ];
    for (path, expected) in cases {
        match Selector::parse(path) {
            Err(PathError::Syntax { position, .. }) => {
                assert_eq!(position, expected, "position for {path:?}");
            }
            other => panic!("expected a syntax error for {path:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_unsupported_constructs_are_rejected() {
    for path in ["$var", "//a + 1", "namespace::*", "foo()", "//a[id('x')]"] {
        assert!(Selector::parse(path).is_err(), "{path} should be rejected");
    }
}

#[test]
fn test_negative_number_literals() {
    let doc = Document::parse_str("<r><a n=\"-1\"/><a n=\"2\"/><a n=\"-0.5\"/></r>").unwrap();
    assert_eq!(select(&doc, "//a[@n = -1]").unwrap().len(), 1);
    assert_eq!(select(&doc, "//a[@n < -.25]").unwrap().len(), 2);
    assert_eq!(select(&doc, "//a[@n > -1]").unwrap().len(), 2);
}

#[test]
fn test_non_node_set_expressions_are_rejected() {
    for (path, kind) in [("count(//book)", "number"), ("'x'", "string"), ("1 = 1", "boolean")] {
        assert_eq!(Selector::parse(path), Err(PathError::NotANodeSet { kind }));
    }
}
