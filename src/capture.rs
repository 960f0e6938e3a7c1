//! Golden checks for errors and log output.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::fixture::GoldenFixture;
use crate::output::Absent;

/// Output key used by [`GoldenFixture::may_fail`].
pub const EXCEPTION_KEY: &str = "exception";

/// Output key used by [`GoldenFixture::capture_logs`].
pub const LOGS_KEY: &str = "logs";

impl GoldenFixture {
    /// Run `f` and check its error against the `exception` output.
    ///
    /// See [`may_fail_as`](Self::may_fail_as).
    pub fn may_fail<T, E, F>(&self, f: F) -> Option<T>
    where
        E: fmt::Display,
        F: FnOnce() -> Result<T, E>,
    {
        self.may_fail_as(EXCEPTION_KEY, f)
    }

    /// Run `f` and check its error against the output `key`.
    ///
    /// An error is expected as `{ShortTypeName: message}`; success expects
    /// the key to be absent. Panics if the golden value disagrees, except in
    /// update mode, where the new value is only recorded.
    pub fn may_fail_as<T, E, F>(&self, key: &str, f: F) -> Option<T>
    where
        E: fmt::Display,
        F: FnOnce() -> Result<T, E>,
    {
        match f() {
            Ok(value) => {
                let golden = self.get_output(key);
                if !(golden == Absent) && !self.update_mode() {
                    panic!("expected {:?} to fail, it succeeded; golden: {:?}", key, golden);
                }
                Some(value)
            }
            Err(e) => {
                let mut expected = BTreeMap::new();
                expected.insert(short_type_name::<E>(), e.to_string());
                let golden = self.get_output(key);
                if !(golden == expected) && !self.update_mode() {
                    panic!(
                        "unexpected error for {:?}: {:?}; golden: {:?}",
                        key, expected, golden
                    );
                }
                None
            }
        }
    }

    /// Run `f`, capturing `tracing` events at `level` or more severe, and
    /// check them against the `logs` output.
    pub fn capture_logs<R>(&self, level: Level, f: impl FnOnce() -> R) -> R {
        self.capture_logs_as(LOGS_KEY, level, &[], f)
    }

    /// Like [`capture_logs`](Self::capture_logs), with an explicit output
    /// key and an optional list of target prefixes to keep.
    ///
    /// Lines are formatted as `LEVEL:message`. No captured line expects the
    /// key to be absent. Panics if the golden value disagrees, except in
    /// update mode.
    pub fn capture_logs_as<R>(
        &self,
        key: &str,
        level: Level,
        targets: &[&str],
        f: impl FnOnce() -> R,
    ) -> R {
        let layer = CaptureLayer::new(level, targets);
        let lines = layer.lines();
        let subscriber = tracing_subscriber::registry().with(layer);
        let result = tracing::subscriber::with_default(subscriber, f);

        let lines = std::mem::take(&mut *lines.lock());
        let golden = self.get_output(key);
        let matched = if lines.is_empty() {
            golden == Absent
        } else {
            golden == lines
        };
        if !matched && !self.update_mode() {
            panic!("unexpected logs for {:?}: {:?}; golden: {:?}", key, lines, golden);
        }
        result
    }
}

/// Last path segment of `E`'s type name, without generic arguments.
pub(crate) fn short_type_name<E: ?Sized>() -> String {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// Collects formatted events into a shared buffer.
struct CaptureLayer {
    level: Level,
    targets: Vec<String>,
    lines: Arc<Mutex<Vec<String>>>,
}

impl CaptureLayer {
    fn new(level: Level, targets: &[&str]) -> Self {
        Self {
            level,
            targets: targets.iter().map(|t| t.to_string()).collect(),
            lines: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn lines(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.lines)
    }

    fn wants(&self, level: &Level, target: &str) -> bool {
        if *level > self.level {
            return false;
        }
        self.targets.is_empty() || self.targets.iter().any(|t| target.starts_with(t.as_str()))
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if !self.wants(meta.level(), meta.target()) {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.lines
            .lock()
            .push(format!("{}:{}", meta.level(), visitor.message));
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
}
