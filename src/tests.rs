use crate::{
    register_class, run_cases_in, Absent, BoxError, CaseOutcome, FlushOutcome, GoldenError,
    GoldenFactory, GoldenFixture, Settings,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const ABC: &str = "input: abc\noutput: ABC\n";

fn golden_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }
    dir
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

fn shout(input: &str) -> String {
    input.to_uppercase()
}

fn buggy_shout(input: &str) -> String {
    let mut out = shout(input);
    out.pop();
    out.push('d');
    out.to_lowercase()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_scenario_a_normal_mode_pass() {
    let dir = golden_dir(&[("case/a.yml", ABC)]);

    let result = run_cases_in(dir.path(), "test_shout", &Settings::default(), &["case/a.yml"], |golden| {
        let input: String = golden.input("input")?;
        assert!(golden.output("output")? == shout(&input));
        Ok(())
    })
    .unwrap();

    assert!(result.success());
    assert_eq!(result.passed, 1);
    assert_eq!(read(dir.path(), "case/a.yml"), ABC);
}

#[test]
fn test_scenario_b_normal_mode_mismatch() {
    let dir = golden_dir(&[("case/a.yml", ABC)]);

    let result = run_cases_in(dir.path(), "test_shout", &Settings::default(), &["case/a.yml"], |golden| {
        let input: String = golden.input("input")?;
        assert_eq!(golden.output("output")?, buggy_shout(&input));
        Ok(())
    })
    .unwrap();

    assert_eq!(result.failed, 1);
    match &result.reports[0].outcome {
        CaseOutcome::Failed(message) => assert!(message.contains("abd"), "{}", message),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(read(dir.path(), "case/a.yml"), ABC);
}

#[test]
fn test_scenario_c_update_mode_rewrites() {
    let dir = golden_dir(&[("case/a.yml", ABC)]);
    let settings = Settings::with_update(true);

    let result = run_cases_in(dir.path(), "test_shout", &settings, &["case/a.yml"], |golden| {
        let input: String = golden.input("input")?;
        let matched = golden.output("output")? == buggy_shout(&input);
        // Compared against the old value.
        assert!(!matched);
        Ok(())
    })
    .unwrap();

    assert!(result.success());
    assert_eq!(read(dir.path(), "case/a.yml"), "input: abc\noutput: abd\n");
}

#[test]
fn test_scenario_d_one_case_per_file() {
    let dir = golden_dir(&[
        ("case/one.yml", "input: a\noutput: A\n"),
        ("case/two.yml", "input: b\noutput: wrong\n"),
    ]);
    let settings = Settings::with_update(true);

    let result = run_cases_in(dir.path(), "test_case", &settings, &["case/*.yml"], |golden| {
        let input: String = golden.input("input")?;
        assert!(golden.output("output")? == shout(&input));
        Ok(())
    })
    .unwrap();

    let ids: Vec<&str> = result.reports.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["one.yml", "two.yml"]);
    assert_eq!(result.passed, 1);
    assert_eq!(result.failed, 1);
    assert_eq!(read(dir.path(), "case/one.yml"), "input: a\noutput: A\n");
    assert_eq!(read(dir.path(), "case/two.yml"), "input: b\noutput: B\n");
}

#[test]
fn test_scenario_e_no_match() {
    let dir = golden_dir(&[]);

    let err = run_cases_in(dir.path(), "test_new", &Settings::default(), &["new.yml"], |_| Ok(()))
        .unwrap_err();
    assert!(matches!(err, GoldenError::NoMatch { .. }));

    let err = run_cases_in(dir.path(), "test_new", &Settings::with_update(true), &["new/*.yml"], |_| {
        Ok(())
    })
    .unwrap_err();
    assert!(matches!(err, GoldenError::NoMatch { .. }));
}

#[test]
fn test_scenario_e_literal_pattern_creates_file_in_update_mode() {
    let dir = golden_dir(&[]);
    let settings = Settings::with_update(true);

    let result = run_cases_in(dir.path(), "test_new", &settings, &["new/fresh.yml"], |golden| {
        let _ = golden.output("output")? == vec![1, 2];
        Ok(())
    })
    .unwrap();

    assert_eq!(result.total, 1);
    assert_eq!(result.reports[0].id, "fresh.yml");
    assert_eq!(read(dir.path(), "new/fresh.yml"), "output:\n- 1\n- 2\n");

    // Untouched outputs create nothing.
    let result = run_cases_in(dir.path(), "test_new", &settings, &["new/untouched.yml"], |golden| {
        assert_eq!(golden.get_input::<String>("input")?, None);
        Ok(())
    })
    .unwrap();
    assert!(result.success());
    assert!(!dir.path().join("new/untouched.yml").exists());
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_round_trip_preserves_untouched_text() {
    let text = "\
# Expected output of the shout filter.
input: abc   # lowercase on purpose

notes: |
  kept verbatim
output: ABC
extra: {a: 1,   b: 2}
";
    let dir = golden_dir(&[("a.yml", text)]);
    let path = dir.path().join("a.yml");

    let golden = GoldenFixture::open(&path, &Settings::with_update(true)).unwrap();
    let _ = golden.output("output").unwrap() == "abd";
    golden.flush().unwrap();

    assert_eq!(
        read(dir.path(), "a.yml"),
        text.replace("output: ABC", "output: abd")
    );
}

#[test]
fn test_untouched_fixture_never_writes() {
    let dir = golden_dir(&[("a.yml", ABC)]);
    let path = dir.path().join("a.yml");

    let golden = GoldenFixture::open(&path, &Settings::with_update(true)).unwrap();
    let _: String = golden.input("input").unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(golden.flush().unwrap(), FlushOutcome::Skipped);
    assert!(!path.exists());
}

#[test]
fn test_at_most_one_write() {
    let dir = golden_dir(&[("a.yml", ABC)]);
    let path = dir.path().join("a.yml");

    let golden = GoldenFixture::open(&path, &Settings::with_update(true)).unwrap();
    let _ = golden.output("output").unwrap() == "abd";
    assert_eq!(golden.flush().unwrap(), FlushOutcome::Written);

    fs::remove_file(&path).unwrap();
    assert_eq!(golden.flush().unwrap(), FlushOutcome::AlreadyFlushed);
    drop(golden);
    assert!(!path.exists());
}

#[test]
fn test_deletion_removes_key_and_keeps_comments() {
    let text = "input: abc\noutput: ABC\n# trailing note\nerror: old\n";
    let dir = golden_dir(&[("a.yml", text)]);
    let path = dir.path().join("a.yml");

    let golden = GoldenFixture::open(&path, &Settings::with_update(true)).unwrap();
    assert!(!(golden.get_output("output") == Absent));
    assert!(!(golden.get_output("error") == Option::<String>::None));
    golden.flush().unwrap();

    assert_eq!(read(dir.path(), "a.yml"), "input: abc\n# trailing note\n");
}

#[test]
fn test_flush_runs_when_body_panics() {
    let dir = golden_dir(&[("case/a.yml", ABC)]);
    let settings = Settings::with_update(true);

    let result = run_cases_in(dir.path(), "test_case", &settings, &["case/a.yml"], |golden| {
        assert!(golden.output("output")? == "abd", "mismatch reported");
        Ok(())
    })
    .unwrap();

    assert_eq!(result.failed, 1);
    assert_eq!(result.teardown_errors, 0);
    assert_eq!(read(dir.path(), "case/a.yml"), "input: abc\noutput: abd\n");
}

#[test]
fn test_body_error_is_a_failure() {
    let dir = golden_dir(&[("case/a.yml", ABC)]);

    let result = run_cases_in(dir.path(), "test_case", &Settings::default(), &["case/a.yml"], |golden| {
        let _: u32 = golden.input("missing")?;
        Ok(())
    })
    .unwrap();

    assert_eq!(result.failed, 1);
    match &result.reports[0].outcome {
        CaseOutcome::Failed(message) => assert!(message.contains("missing"), "{}", message),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_setup_and_teardown_failures_are_separate() {
    let dir = golden_dir(&[
        ("case/broken.yml", "input: [unclosed\n"),
        ("case/ok.yml", ABC),
    ]);
    let case_dir = dir.path().join("case");
    let settings = Settings::with_update(true);

    let result = run_cases_in(dir.path(), "test_case", &settings, &["case/*.yml"], |golden| {
        let _ = golden.output("output")? == "abd";
        // Leave no directory to write into.
        fs::remove_dir_all(golden.path().parent().unwrap())?;
        fs::write(golden.path().parent().unwrap(), "")?;
        Ok(())
    })
    .unwrap();

    assert_eq!(result.total, 2);
    assert_eq!(result.setup_errors, 1);
    assert_eq!(result.failed, 0);
    assert_eq!(result.teardown_errors, 1);
    assert!(matches!(result.reports[0].outcome, CaseOutcome::SetupFailed(_)));
    assert_eq!(result.reports[1].outcome, CaseOutcome::Passed);
    assert!(result.reports[1].teardown_error.is_some());
    assert!(case_dir.is_file());
}

#[test]
fn test_last_comparison_wins() {
    let dir = golden_dir(&[("a.yml", ABC)]);
    let path = dir.path().join("a.yml");

    let golden = GoldenFixture::open(&path, &Settings::with_update(true)).unwrap();
    let _ = golden.get_output("output") == Absent;
    let _ = golden.get_output("output") == "first";
    let _ = golden.get_output("output") == "last";
    golden.flush().unwrap();

    assert_eq!(read(dir.path(), "a.yml"), "input: abc\noutput: last\n");
}

// ============================================================================
// Factory and custom types
// ============================================================================

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Distance {
    meters: u32,
}

#[test]
fn test_factory_with_registered_class() {
    register_class::<Distance>("Distance").unwrap();

    let dir = golden_dir(&[("run.yml", "input: 3\noutput: !Distance {meters: 3000}\n")]);
    let factory = GoldenFactory::new(dir.path(), Settings::default());
    let golden = factory.open("run.yml").unwrap();

    let km: u32 = golden.input("input").unwrap();
    let expected: Distance = golden.output("output").unwrap().value().unwrap();
    assert_eq!(expected, Distance { meters: km * 1000 });
    assert!(golden.output("output").unwrap() == Distance { meters: 3000 });
    factory.teardown().unwrap();
}

#[test]
fn test_factory_update_writes_registered_tag() {
    register_class::<Distance>("Distance").unwrap();

    let dir = golden_dir(&[("run.yml", "input: 2\n")]);
    let factory = GoldenFactory::new(dir.path(), Settings::with_update(true));
    let golden = factory.open("run.yml").unwrap();

    let km: u32 = golden.input("input").unwrap();
    let _ = golden.output("output").unwrap() == Distance { meters: km * 1000 };
    factory.teardown().unwrap();

    let text = read(dir.path(), "run.yml");
    assert!(text.starts_with("input: 2\noutput: !Distance"), "{}", text);
    assert!(text.contains("meters: 2000"), "{}", text);
}

#[test]
fn test_errors_convert_to_box_error() {
    fn body(golden: &GoldenFixture) -> Result<(), BoxError> {
        let _: String = golden.input("nope")?;
        Ok(())
    }

    let dir = golden_dir(&[("a.yml", ABC)]);
    let path: PathBuf = dir.path().join("a.yml");
    let golden = GoldenFixture::open(&path, &Settings::default()).unwrap();
    let err = body(&golden).unwrap_err();
    assert!(err.to_string().contains("nope"));
}
