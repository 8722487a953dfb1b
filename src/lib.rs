//! # xmlsplice
//!
//! Select nodes in an XML document with a path expression, then append a
//! fragment under them, delete them, or serialize them one by one.
//!
//! ## Quick Start
//!
//! ```
//! use xmlsplice::{append_children_at_path, collect_nodes_at_path, delete_nodes_at_path};
//! use xmlsplice::OperationOptions;
//!
//! let opts = OperationOptions::default();
//!
//! let out = append_children_at_path("<root><item/></root>", "/root", "<child/>", &opts).unwrap();
//! assert_eq!(out.document, "<root><item/><child/></root>");
//!
//! let out = delete_nodes_at_path(&out.document, "//item", &opts).unwrap();
//! assert_eq!(out.document, "<root><child/></root>");
//!
//! let items = collect_nodes_at_path(&out.document, Some("//child"), &opts).unwrap();
//! assert_eq!(items, vec![Some("<child/>".to_string())]);
//! ```
//!
//! The lower layers are public too: [`parser`] builds a [`Document`],
//! [`xpath`] selects from it, [`mutate`] edits it and [`serial`] writes it
//! back out.

pub mod encoding;
pub mod error;
pub mod mutate;
pub mod ops;
pub mod parser;
pub mod serial;
pub mod tree;
pub mod xpath;

pub use error::Error;
pub use ops::{
    append_children_at_path, collect_nodes_at_path, delete_nodes_at_path, FailureMode,
    OperationOptions, Outcome, Status,
};
pub use tree::{Attribute, Document, NodeId};
