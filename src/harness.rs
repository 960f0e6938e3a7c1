//! Running test bodies against golden fixtures.
//!
//! libtest cannot add tests at runtime, so a parameterized golden test is
//! one `#[test]` that runs every matched case in turn. Each case is
//! isolated: it gets its own fixture, a panic in its body is caught, and
//! its fixture is flushed whatever the body did. Failures are reported
//! together once every case has run.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::discovery::{self, GoldenCase};
use crate::errors::{BoxError, GoldenResult};
use crate::factory::GoldenFactory;
use crate::fixture::GoldenFixture;
use crate::formatter::{format_case_failure, format_summary};
use crate::settings::Settings;

/// Where a golden test was declared. Built by [`golden_test!`](crate::golden_test).
#[derive(Debug, Clone, Copy)]
pub struct TestSite {
    /// Test function name.
    pub name: &'static str,
    /// `CARGO_MANIFEST_DIR` of the crate declaring the test.
    pub manifest_dir: &'static str,
    /// `file!()` of the declaring source file.
    pub file: &'static str,
}

impl TestSite {
    /// Directory golden patterns are resolved against.
    pub fn base_dir(&self) -> PathBuf {
        discovery::caller_dir(Path::new(self.manifest_dir), Path::new(self.file))
    }

    /// Session settings for the declaring crate.
    pub fn settings(&self) -> GoldenResult<Settings> {
        Settings::session(Path::new(self.manifest_dir)).cloned()
    }
}

/// How one case ended, before teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    Passed,
    /// The body returned an error or panicked.
    Failed(String),
    /// The golden file could not be opened; the body did not run.
    SetupFailed(String),
}

/// Report for one golden case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub id: String,
    pub path: PathBuf,
    pub outcome: CaseOutcome,
    /// Flushing the fixture failed after the body ran.
    pub teardown_error: Option<String>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.outcome == CaseOutcome::Passed && self.teardown_error.is_none()
    }
}

/// Tally of a golden test run.
#[derive(Debug, Clone, Default)]
pub struct HarnessResult {
    /// Cases run.
    pub total: usize,
    /// Cases whose body passed and whose teardown succeeded.
    pub passed: usize,
    /// Body failures.
    pub failed: usize,
    /// Cases that could not be set up.
    pub setup_errors: usize,
    /// Cases whose golden file could not be rewritten.
    pub teardown_errors: usize,
    pub reports: Vec<CaseReport>,
}

impl HarnessResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the exit code (0 = pass, 1 = any failure).
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0 && self.setup_errors == 0 && self.teardown_errors == 0
    }

    /// Record a finished case.
    pub fn record(&mut self, report: CaseReport) {
        self.total += 1;
        match report.outcome {
            CaseOutcome::Passed => {}
            CaseOutcome::Failed(_) => self.failed += 1,
            CaseOutcome::SetupFailed(_) => self.setup_errors += 1,
        }
        if report.teardown_error.is_some() {
            self.teardown_errors += 1;
        }
        if report.passed() {
            self.passed += 1;
        }
        self.reports.push(report);
    }

    /// Reports of cases that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.reports.iter().filter(|r| !r.passed())
    }
}

/// Run `body` once per golden file matching `patterns` under `base_dir`.
///
/// Collection errors are returned before any case runs. Case failures are
/// recorded in the result.
pub fn run_cases_in<F>(
    base_dir: &Path,
    test_name: &str,
    settings: &Settings,
    patterns: &[&str],
    body: F,
) -> GoldenResult<HarnessResult>
where
    F: Fn(&GoldenFixture) -> Result<(), BoxError>,
{
    let cases = discovery::collect(patterns, base_dir, test_name, settings.update_goldens)?;
    debug!(test = test_name, cases = cases.len(), "Collected golden cases");

    let mut result = HarnessResult::new();
    for case in cases {
        result.record(run_case(&case, settings, &body));
    }

    info!(
        test = test_name,
        passed = result.passed,
        total = result.total,
        "Golden test finished"
    );
    Ok(result)
}

fn run_case<F>(case: &GoldenCase, settings: &Settings, body: &F) -> CaseReport
where
    F: Fn(&GoldenFixture) -> Result<(), BoxError>,
{
    let report = |outcome, teardown_error| CaseReport {
        id: case.id.clone(),
        path: case.path.clone(),
        outcome,
        teardown_error,
    };

    let fixture = match GoldenFixture::open(&case.path, settings) {
        Ok(fixture) => fixture,
        Err(e) => return report(CaseOutcome::SetupFailed(e.to_string()), None),
    };

    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| body(&fixture))) {
        Ok(Ok(())) => CaseOutcome::Passed,
        Ok(Err(e)) => CaseOutcome::Failed(e.to_string()),
        Err(payload) => CaseOutcome::Failed(panic_message(payload.as_ref())),
    };

    let teardown_error = fixture.flush().err().map(|e| e.to_string());
    report(outcome, teardown_error)
}

/// Run a parameterized golden test, panicking with a report if any case
/// failed or if nothing could be collected.
pub fn run_cases<F>(site: &TestSite, patterns: &[&str], body: F)
where
    F: Fn(&GoldenFixture) -> Result<(), BoxError>,
{
    let settings = site.settings().unwrap_or_else(|e| panic!("{}", e));
    let result = run_cases_in(&site.base_dir(), site.name, &settings, patterns, body)
        .unwrap_or_else(|e| panic!("{}", e));

    if !result.success() {
        let mut message = String::new();
        for report in result.failures() {
            message.push_str(&format_case_failure(site.name, report));
        }
        message.push_str(&format_summary(site.name, &result));
        panic!("{}", message);
    }
}

/// Run a golden test body with a [`GoldenFactory`], flushing every fixture
/// it opened afterwards.
///
/// A panic in the body is resumed after teardown.
pub fn run_with_factory<F>(site: &TestSite, body: F)
where
    F: FnOnce(&GoldenFactory) -> Result<(), BoxError>,
{
    let settings = site.settings().unwrap_or_else(|e| panic!("{}", e));
    let factory = GoldenFactory::new(site.base_dir(), settings);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&factory)));
    let teardown = factory.teardown();

    match outcome {
        Err(payload) => {
            if let Err(e) = teardown {
                error!(test = site.name, error = %e, "Golden teardown failed");
            }
            panic::resume_unwind(payload);
        }
        Ok(Err(e)) => {
            if let Err(teardown) = teardown {
                error!(test = site.name, error = %teardown, "Golden teardown failed");
            }
            panic!("{}", e);
        }
        Ok(Ok(())) => {
            if let Err(e) = teardown {
                panic!("{}", e);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
