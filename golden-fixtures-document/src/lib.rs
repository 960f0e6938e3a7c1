//! Format-preserving YAML documents for golden-fixtures.
//!
//! This crate is the storage layer behind golden files: it loads a YAML
//! mapping, exposes its top-level keys, applies edits in memory and writes
//! the result back without disturbing the parts that were not edited.
//!
//! ## Core Types
//!
//! - [`GoldenDocument`] - Ordered top-level mapping bound to one file
//! - [`LoadOptions`] - Missing-file policy and tag registry for a load
//! - [`TypeRegistry`] - Custom `!tag` constructors and representers
//!
//! ## Example
//!
//! ```
//! use golden_fixtures_document::{GoldenDocument, TypeRegistry, Value};
//!
//! let text = "# expected output\ninput: abc\noutput: ABC\n";
//! let mut doc = GoldenDocument::parse("case.yml", text, TypeRegistry::new()).unwrap();
//! assert_eq!(doc.serialize().unwrap(), text);
//!
//! doc.set("output", Value::String("abd".into()));
//! assert_eq!(
//!     doc.serialize().unwrap(),
//!     "# expected output\ninput: abc\noutput: abd\n"
//! );
//! ```

mod document;
mod errors;
mod persist;
mod registry;
mod segment;

pub use document::{GoldenDocument, LoadOptions};
pub use errors::{DocumentError, DocumentResult};
pub use persist::write_atomic;
pub use registry::{
    add_constructor, add_multi_constructor, add_representer, global_registry, register_class,
    Constructor, MultiConstructor, Representer, TypeRegistry,
};

pub use serde_yaml::{Mapping, Value};
