//! Failure reports for golden test runs.

use std::fmt::Write;

use crate::harness::{CaseOutcome, CaseReport, HarnessResult};

/// Format one failed case.
pub fn format_case_failure(test_name: &str, report: &CaseReport) -> String {
    let mut output = String::new();

    writeln!(output, "\nFAIL: {}[{}]", test_name, report.id).unwrap();
    writeln!(output, "  golden: {}", report.path.display()).unwrap();

    match &report.outcome {
        CaseOutcome::Passed => {}
        CaseOutcome::Failed(message) => {
            writeln!(output, "  error:").unwrap();
            write_indented(&mut output, message);
        }
        CaseOutcome::SetupFailed(message) => {
            writeln!(output, "  setup error:").unwrap();
            write_indented(&mut output, message);
        }
    }

    if let Some(message) = &report.teardown_error {
        writeln!(output, "  teardown error:").unwrap();
        write_indented(&mut output, message);
    }

    output
}

/// Format the tally line of a golden test.
pub fn format_summary(test_name: &str, result: &HarnessResult) -> String {
    let mut output = String::new();

    let status = if result.success() { "PASS" } else { "FAIL" };

    writeln!(output, "\n{}: {}", status, test_name).unwrap();
    writeln!(
        output,
        "  {} cases: {} passed, {} failed, {} setup errors, {} teardown errors",
        result.total, result.passed, result.failed, result.setup_errors, result.teardown_errors
    )
    .unwrap();

    output
}

fn write_indented(output: &mut String, message: &str) {
    for line in message.lines() {
        writeln!(output, "    {}", line).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn report(outcome: CaseOutcome, teardown_error: Option<&str>) -> CaseReport {
        CaseReport {
            id: "basic.yml".to_string(),
            path: PathBuf::from("/golden/find_words/basic.yml"),
            outcome,
            teardown_error: teardown_error.map(str::to_string),
        }
    }

    #[test]
    fn test_format_body_failure() {
        let output = format_case_failure(
            "test_find_words",
            &report(
                CaseOutcome::Failed("assertion failed\n  left: 1\n right: 2".into()),
                None,
            ),
        );
        insta::assert_snapshot!(output.trim_start(), @r###"
        FAIL: test_find_words[basic.yml]
          golden: /golden/find_words/basic.yml
          error:
            assertion failed
              left: 1
             right: 2
        "###);
    }

    #[test]
    fn test_format_setup_and_teardown_failures() {
        let output = format_case_failure(
            "test_find_words",
            &report(CaseOutcome::SetupFailed("golden file not found".into()), None),
        );
        assert!(output.contains("setup error:\n    golden file not found"));

        let output = format_case_failure(
            "test_find_words",
            &report(CaseOutcome::Passed, Some("permission denied")),
        );
        assert!(!output.contains("  error:"));
        assert!(output.contains("teardown error:\n    permission denied"));
    }

    #[test]
    fn test_format_summary_pass() {
        let mut result = HarnessResult::new();
        result.record(report(CaseOutcome::Passed, None));

        let output = format_summary("test_find_words", &result);
        insta::assert_snapshot!(output.trim_start(), @r###"
        PASS: test_find_words
          1 cases: 1 passed, 0 failed, 0 setup errors, 0 teardown errors
        "###);
    }

    #[test]
    fn test_format_summary_with_failures() {
        let mut result = HarnessResult::new();
        result.record(report(CaseOutcome::Passed, None));
        result.record(report(CaseOutcome::Failed("boom".into()), Some("disk full")));

        let output = format_summary("test_find_words", &result);
        assert!(output.contains("FAIL: test_find_words"));
        assert!(output.contains("2 cases: 1 passed, 1 failed, 0 setup errors, 1 teardown errors"));
    }
}
