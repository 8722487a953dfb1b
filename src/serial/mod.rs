//! XML serialization.
//!
//! This module turns a `Document` tree, or one node selected from it, back
//! into XML text. It handles escaping, the XML declaration policy and
//! optional indentation.

pub mod xml;

pub use xml::{
    serialize, serialize_node, serialize_with_options, try_serialize, DeclarationPolicy,
    SerializeOptions,
};
