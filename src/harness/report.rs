//! Test-run result shapes.

use serde::{Deserialize, Serialize};

/// One failed test: display name plus the full-text rendering of the thrown
/// exception, so the detail crosses process boundaries safely.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFailure {
    pub test_name: String,
    pub exception: String,
}

/// Raw counts collected from one test run.
///
/// Invariant: `succeeded + failed + skipped <= found`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestRunSummary {
    pub succeeded: u32,
    pub failed: u32,
    pub skipped: u32,
    pub found: u32,
    pub failures: Vec<TestFailure>,
}

impl TestRunSummary {
    /// "All passed" requires at least one success and zero failures; an
    /// empty run never counts as passing.
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.succeeded > 0
    }

    pub fn counts_consistent(&self) -> bool {
        self.succeeded + self.failed + self.skipped <= self.found
    }
}

/// Caller-facing test report, serialized in the wire shape the application
/// layer consumes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub tests_succeeded: u32,
    pub tests_failed: u32,
    pub tests_skipped: u32,
    pub total_tests: u32,
    pub all_tests_passed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<TestFailure>,
}

impl TestReport {
    pub fn from_summary(summary: TestRunSummary) -> Self {
        Self {
            success: true,
            message: None,
            tests_succeeded: summary.succeeded,
            tests_failed: summary.failed,
            tests_skipped: summary.skipped,
            total_tests: summary.found,
            all_tests_passed: summary.all_passed(),
            failures: summary.failures,
        }
    }

    /// Terminal setup failure: compilation, workspace, or launcher fault.
    /// Counts stay zero and nothing is considered passed.
    pub fn setup_failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Canned report for the simulation fallback when the sandbox runtime is
    /// disabled.
    pub fn simulated() -> Self {
        Self {
            success: true,
            message: Some("Simulated test execution (sandbox disabled)".to_string()),
            tests_succeeded: 1,
            tests_failed: 0,
            tests_skipped: 0,
            total_tests: 1,
            all_tests_passed: true,
            failures: Vec::new(),
        }
    }

    /// Counts recovered from the wire shape, for consumers of runner output.
    pub fn into_summary(self) -> TestRunSummary {
        TestRunSummary {
            succeeded: self.tests_succeeded,
            failed: self.tests_failed,
            skipped: self.tests_skipped,
            found: self.total_tests,
            failures: self.failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_passed_requires_a_success() {
        let empty = TestRunSummary::default();
        assert!(!empty.all_passed());

        let passing = TestRunSummary {
            succeeded: 3,
            found: 3,
            ..TestRunSummary::default()
        };
        assert!(passing.all_passed());

        let one_failing = TestRunSummary {
            succeeded: 2,
            failed: 1,
            found: 3,
            ..TestRunSummary::default()
        };
        assert!(!one_failing.all_passed());
    }

    #[test]
    fn report_serializes_in_wire_shape() {
        let report = TestReport::from_summary(TestRunSummary {
            succeeded: 2,
            failed: 1,
            skipped: 0,
            found: 3,
            failures: vec![TestFailure {
                test_name: "addsNumbers()".to_string(),
                exception: "org.opentest4j.AssertionFailedError: expected 4 but was 5".to_string(),
            }],
        });
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"testsSucceeded\":2"));
        assert!(json.contains("\"testsFailed\":1"));
        assert!(json.contains("\"totalTests\":3"));
        assert!(json.contains("\"allTestsPassed\":false"));
        assert!(json.contains("\"testName\":\"addsNumbers()\""));
        assert!(!json.contains("\"message\""));
    }

    #[test]
    fn setup_failure_has_zero_counts() {
        let report = TestReport::setup_failure("could not determine class name");
        assert!(!report.success);
        assert!(!report.all_tests_passed);
        assert_eq!(report.total_tests, 0);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"success\":false"));
        assert!(json.contains("could not determine class name"));
    }

    #[test]
    fn wire_shape_roundtrips_counts() {
        let text = r#"{"success":true,"testsSucceeded":2,"testsFailed":1,"testsSkipped":0,"totalTests":3,"allTestsPassed":false,"failures":[{"testName":"t","exception":"e"}]}"#;
        let report: TestReport = serde_json::from_str(text).unwrap();
        let summary = report.into_summary();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.found, 3);
        assert!(summary.counts_consistent());
        assert_eq!(summary.failures.len(), 1);
    }
}
