//! Opening golden fixtures on demand.
//!
//! Tests that are not parameterized over files use a [`GoldenFactory`] to
//! open any number of golden files; every fixture it hands out is flushed
//! by [`GoldenFactory::teardown`].

use golden_fixtures_document::TypeRegistry;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

use crate::errors::GoldenResult;
use crate::fixture::GoldenFixture;
use crate::settings::Settings;

#[derive(Debug)]
pub struct GoldenFactory {
    base_dir: PathBuf,
    settings: Settings,
    registry: TypeRegistry,
    fixtures: RefCell<Vec<Rc<GoldenFixture>>>,
}

impl GoldenFactory {
    /// Factory resolving relative paths against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, settings: Settings) -> Self {
        Self::with_registry(base_dir, settings, golden_fixtures_document::global_registry())
    }

    pub fn with_registry(
        base_dir: impl Into<PathBuf>,
        settings: Settings,
        registry: TypeRegistry,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            settings,
            registry,
            fixtures: RefCell::new(Vec::new()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Open a golden file. Relative paths are resolved against the base
    /// directory.
    pub fn open(&self, path: impl AsRef<Path>) -> GoldenResult<Rc<GoldenFixture>> {
        let path = self.base_dir.join(path);
        let fixture = Rc::new(GoldenFixture::open_with(
            path,
            &self.settings,
            self.registry.clone(),
        )?);
        self.fixtures.borrow_mut().push(Rc::clone(&fixture));
        Ok(fixture)
    }

    /// Number of fixtures opened so far.
    pub fn opened(&self) -> usize {
        self.fixtures.borrow().len()
    }

    /// Flush every fixture handed out, in opening order.
    ///
    /// All fixtures are flushed even if one fails; the first error is
    /// returned.
    pub fn teardown(&self) -> GoldenResult<()> {
        let fixtures = self.fixtures.borrow();
        debug!(count = fixtures.len(), "Tearing down golden fixtures");

        let mut first_error = None;
        for fixture in fixtures.iter() {
            if let Err(e) = fixture.flush() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{FixtureState, FlushOutcome};
    use std::fs;

    #[test]
    fn test_open_relative_and_teardown() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yml"), "input: x\noutput: X\n").unwrap();

        let factory = GoldenFactory::new(dir.path(), Settings::with_update(true));
        let golden = factory.open("a.yml").unwrap();
        assert_eq!(golden.path(), dir.path().join("a.yml"));

        let input: String = golden.input("input").unwrap();
        assert!(golden.output("output").unwrap() == input.repeat(2));
        assert_eq!(factory.opened(), 1);

        factory.teardown().unwrap();
        assert_eq!(golden.state(), FixtureState::Flushed);
        assert_eq!(
            fs::read_to_string(dir.path().join("a.yml")).unwrap(),
            "input: x\noutput: xx\n"
        );
    }

    #[test]
    fn test_open_missing_file_in_update_mode_creates_it() {
        let dir = tempfile::tempdir().unwrap();
        let factory = GoldenFactory::new(dir.path(), Settings::with_update(true));

        let golden = factory.open("new/case.yml").unwrap();
        assert!(golden.output("output").unwrap() == 42);
        factory.teardown().unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("new/case.yml")).unwrap(),
            "output: 42\n"
        );
    }

    #[test]
    fn test_open_missing_file_in_normal_mode_fails() {
        let dir = tempfile::tempdir().unwrap();
        let factory = GoldenFactory::new(dir.path(), Settings::default());

        assert!(factory.open("nope.yml").unwrap_err().is_not_found());
        assert_eq!(factory.opened(), 0);
    }

    #[test]
    fn test_teardown_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yml"), "output: 1\n").unwrap();

        let factory = GoldenFactory::new(dir.path(), Settings::with_update(true));
        let golden = factory.open("a.yml").unwrap();
        let _ = golden.output("output").unwrap() == 2;

        factory.teardown().unwrap();
        factory.teardown().unwrap();
        assert_eq!(golden.flush().unwrap(), FlushOutcome::AlreadyFlushed);
        assert_eq!(fs::read_to_string(dir.path().join("a.yml")).unwrap(), "output: 2\n");
    }
}
