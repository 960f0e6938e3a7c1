//! The per-test golden fixture.
//!
//! A [`GoldenFixture`] owns one loaded golden document for the duration of
//! one test. Inputs are plain reads. Outputs are plain reads in normal
//! mode; in update mode they are [`GoldenOutput`] proxies whose `==`
//! records the compared value as the key's new content. [`flush`] applies
//! those pending changes and rewrites the file at most once.
//!
//! [`flush`]: GoldenFixture::flush

use golden_fixtures_document::{
    global_registry, DocumentError, GoldenDocument, LoadOptions, TypeRegistry, Value,
};
use serde::de::DeserializeOwned;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::errors::{GoldenError, GoldenResult};
use crate::output::GoldenOutput;
use crate::settings::Settings;

/// Lifecycle of a fixture. There is no way back to `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureState {
    /// Loaded, nothing read yet.
    Open,
    /// At least one key was read or compared.
    InUse,
    /// Teardown ran; later comparisons are ignored.
    Flushed,
}

/// What teardown will do with a touched output key.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    /// The key was accessed as an output but not compared yet.
    NoOp,
    /// Store this value.
    Set(Value),
    /// Remove the key.
    Delete,
}

/// Result of [`GoldenFixture::flush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Normal mode, or nothing was touched. No I/O happened.
    Skipped,
    /// The golden file was rewritten.
    Written,
    /// An earlier flush already ran.
    AlreadyFlushed,
}

/// Golden file access for one test.
#[derive(Debug)]
pub struct GoldenFixture {
    path: PathBuf,
    update_mode: bool,
    warn_unused_fields: bool,
    registry: TypeRegistry,
    document: RefCell<GoldenDocument>,
    touched: RefCell<BTreeMap<String, PendingAction>>,
    used: RefCell<BTreeSet<String>>,
    state: Cell<FixtureState>,
}

impl GoldenFixture {
    /// Open the golden file at `path` using the process-wide tag registry.
    pub fn open(path: impl Into<PathBuf>, settings: &Settings) -> GoldenResult<Self> {
        Self::open_with(path, settings, global_registry())
    }

    /// Open the golden file at `path` with an explicit tag registry.
    ///
    /// In update mode a missing file opens as an empty document, which is
    /// created on flush if any output was touched.
    pub fn open_with(
        path: impl Into<PathBuf>,
        settings: &Settings,
        registry: TypeRegistry,
    ) -> GoldenResult<Self> {
        let path = path.into();
        let options = LoadOptions::new(settings.update_goldens, registry.clone());
        let document = GoldenDocument::load(&path, &options)?;

        debug!(
            path = %path.display(),
            update = settings.update_goldens,
            keys = document.len(),
            "Opened golden fixture"
        );

        Ok(Self {
            path,
            update_mode: settings.update_goldens,
            warn_unused_fields: settings.warn_unused_fields,
            registry,
            document: RefCell::new(document),
            touched: RefCell::new(BTreeMap::new()),
            used: RefCell::new(BTreeSet::new()),
            state: Cell::new(FixtureState::Open),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn update_mode(&self) -> bool {
        self.update_mode
    }

    pub fn state(&self) -> FixtureState {
        self.state.get()
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Output keys touched so far and what flush will do with them.
    pub fn touched(&self) -> BTreeMap<String, PendingAction> {
        self.touched.borrow().clone()
    }

    /// Every key read as an input or accessed as an output.
    pub fn used_keys(&self) -> BTreeSet<String> {
        self.used.borrow().clone()
    }

    /// Read the raw value of an input key.
    pub fn input_value(&self, key: &str) -> GoldenResult<Value> {
        self.mark_used(key);
        Ok(self.document.borrow().get(key)?.clone())
    }

    /// Read an input key and deserialize it.
    pub fn input<T: DeserializeOwned>(&self, key: &str) -> GoldenResult<T> {
        let value = self.input_value(key)?;
        self.decode(key, value)
    }

    /// Like [`input`](Self::input), but a missing key is `None`.
    pub fn get_input<T: DeserializeOwned>(&self, key: &str) -> GoldenResult<Option<T>> {
        self.mark_used(key);
        let value = self.document.borrow().try_get(key).cloned();
        value.map(|value| self.decode(key, value)).transpose()
    }

    /// Expected output stored under `key`.
    ///
    /// Fails if the key is missing in normal mode. In update mode the key
    /// is marked as touched and a pending proxy is returned.
    pub fn output(&self, key: &str) -> GoldenResult<GoldenOutput<'_>> {
        self.mark_used(key);
        let current = self.document.borrow().try_get(key).cloned();

        if self.update_mode {
            self.record(key, PendingAction::NoOp);
            return Ok(GoldenOutput::pending(self, key, current, false));
        }

        match current {
            Some(value) => Ok(GoldenOutput::literal(&self.path, key, Some(value))),
            None => Err(DocumentError::KeyMissing {
                path: self.path.clone(),
                key: key.to_string(),
            }
            .into()),
        }
    }

    /// Expected output stored under `key`, where absence is a valid state.
    ///
    /// Comparing the result with `None` in update mode deletes the key
    /// instead of storing a null, like [`Absent`](crate::Absent) does.
    pub fn get_output(&self, key: &str) -> GoldenOutput<'_> {
        self.mark_used(key);
        let current = self.document.borrow().try_get(key).cloned();

        if self.update_mode {
            self.record(key, PendingAction::NoOp);
            GoldenOutput::pending(self, key, current, true)
        } else {
            GoldenOutput::literal(&self.path, key, current)
        }
    }

    /// Apply pending output changes and rewrite the golden file.
    ///
    /// Runs at most once. Nothing is written in normal mode or when no
    /// output was touched. A touched key is rewritten even if its value did
    /// not change, so formatting normalization shows up in review.
    pub fn flush(&self) -> GoldenResult<FlushOutcome> {
        if self.state.get() == FixtureState::Flushed {
            return Ok(FlushOutcome::AlreadyFlushed);
        }
        self.state.set(FixtureState::Flushed);

        let touched = self.touched.borrow();
        if !self.update_mode || touched.is_empty() {
            debug!(path = %self.path.display(), "Golden file left untouched");
            return Ok(FlushOutcome::Skipped);
        }

        let mut document = self.document.borrow_mut();
        for (key, action) in touched.iter() {
            match action {
                PendingAction::NoOp => {}
                PendingAction::Set(value) => document.set(key, value.clone()),
                PendingAction::Delete => {
                    document.delete(key);
                }
            }
        }

        if self.warn_unused_fields {
            let used = self.used.borrow();
            let unused: Vec<&str> = document.keys().filter(|key| !used.contains(*key)).collect();
            if !unused.is_empty() {
                warn!(
                    path = %self.path.display(),
                    fields = ?unused,
                    "Unused field(s) in golden file"
                );
            }
        }

        document.save().map_err(|source| GoldenError::FlushIo {
            path: self.path.clone(),
            source,
        })?;

        info!(
            path = %self.path.display(),
            keys = touched.len(),
            "Updated golden file"
        );
        Ok(FlushOutcome::Written)
    }

    /// Record what teardown should do with `key`. The last comparison wins.
    pub(crate) fn record(&self, key: &str, action: PendingAction) {
        if self.state.get() == FixtureState::Flushed {
            warn!(
                path = %self.path.display(),
                key,
                "Comparison to a golden output after teardown is ignored"
            );
            return;
        }

        let mut touched = self.touched.borrow_mut();
        if action == PendingAction::NoOp {
            touched.entry(key.to_string()).or_insert(PendingAction::NoOp);
            return;
        }
        if let (Some(PendingAction::Set(previous)), PendingAction::Set(next)) =
            (touched.get(key), &action)
        {
            if previous != next {
                warn!(
                    path = %self.path.display(),
                    key,
                    previous = ?previous,
                    next = ?next,
                    "Golden output compared against conflicting values, keeping the last"
                );
            }
        }
        touched.insert(key.to_string(), action);
    }

    fn mark_used(&self, key: &str) {
        self.used.borrow_mut().insert(key.to_string());
        if self.state.get() == FixtureState::Open {
            self.state.set(FixtureState::InUse);
        }
    }

    fn decode<T: DeserializeOwned>(&self, key: &str, value: Value) -> GoldenResult<T> {
        serde_yaml::from_value(value).map_err(|source| GoldenError::Decode {
            path: self.path.clone(),
            key: key.to_string(),
            source,
        })
    }
}

impl Drop for GoldenFixture {
    fn drop(&mut self) {
        if self.state.get() == FixtureState::Flushed {
            return;
        }
        if let Err(e) = self.flush() {
            if std::thread::panicking() {
                error!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to flush golden file while unwinding"
                );
            } else {
                panic!("{}", e);
            }
        }
    }
}
