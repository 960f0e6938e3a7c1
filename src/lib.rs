//! Golden tests backed by YAML files that can rewrite themselves.
//!
//! A golden test keeps its inputs and expected outputs in a YAML file next
//! to the test code. The test reads inputs with [`GoldenFixture::input`]
//! and checks results with `==` against [`GoldenFixture::output`]:
//!
//! ```yaml
//! # find_words/basic.yml
//! input: the quick brown fox
//! output:
//! - the
//! - quick
//! - brown
//! - fox
//! ```
//!
//! Run the suite with `UPDATE_GOLDENS=1` and every output compared during a
//! test is written back to its file with the value it was compared
//! against. Keys that were not compared, comments and key order are left
//! alone, and each file is rewritten at most once per test.
//!
//! ## Core Types
//!
//! - [`GoldenFixture`] - One golden file, opened for one test
//! - [`GoldenOutput`] - Expected output, recording comparisons in update mode
//! - [`GoldenFactory`] - Opens any number of golden files for one test
//! - [`Settings`] - Update mode and warnings, read once per test session
//!
//! ## Declaring tests
//!
//! [`golden_test!`] runs a body once per golden file matching a glob:
//!
//! ```ignore
//! use golden_fixtures::golden_test;
//!
//! golden_test! {
//!     ["find_words/*.yml"]
//!     fn test_find_words(golden) {
//!         let input: String = golden.input("input")?;
//!         assert!(golden.output("output")? == find_words(&input));
//!     }
//! }
//! ```
//!
//! ## Custom tags
//!
//! Values tagged `!Name` in golden files are handled by the process-wide
//! [`TypeRegistry`]; see [`register_class`], [`add_constructor`],
//! [`add_multi_constructor`] and [`add_representer`].

mod capture;
pub mod discovery;
mod errors;
pub mod factory;
pub mod fixture;
pub mod formatter;
pub mod harness;
mod macros;
pub mod output;
pub mod settings;

#[cfg(test)]
mod tests;

pub use capture::{EXCEPTION_KEY, LOGS_KEY};
pub use discovery::{caller_dir, collect, GoldenCase};
pub use errors::{BoxError, GoldenError, GoldenResult};
pub use factory::GoldenFactory;
pub use fixture::{FixtureState, FlushOutcome, GoldenFixture, PendingAction};
pub use harness::{run_cases, run_cases_in, CaseOutcome, CaseReport, HarnessResult, TestSite};
pub use output::{Absent, GoldenOutput};
pub use settings::{Settings, SETTINGS_FILE, UPDATE_ENV, UPDATE_FLAG};

pub use golden_fixtures_document::{
    add_constructor, add_multi_constructor, add_representer, global_registry, register_class,
    DocumentError, GoldenDocument, TypeRegistry, Value,
};
