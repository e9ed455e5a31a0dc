//! Verdict inputs and outputs.
//!
//! Output-equality comparison is whitespace-normalized, and the shapes the
//! application layer consumes are fixed here: the rendered execution text and
//! the combined run verdict.

use crate::config::types::ExecutionOutcome;
use crate::harness::TestReport;
use serde::Serialize;

/// Caller-facing message when capacity and the queue deadline are both
/// exhausted.
pub const ADMISSION_REJECTED_MESSAGE: &str =
    "ERROR: Too many concurrent executions. Please try again later.";

/// Collapse whitespace runs to single spaces and trim the ends, so outputs
/// differing only in trailing newlines or run lengths compare equal.
pub fn normalize_output(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn outputs_match(expected: &str, actual: &str) -> bool {
    normalize_output(expected) == normalize_output(actual)
}

/// Render an execution outcome as the text the application layer shows.
pub fn render_outcome(outcome: &ExecutionOutcome) -> String {
    match outcome {
        ExecutionOutcome::Output(stdout) => stdout.clone(),
        ExecutionOutcome::Timeout => crate::sandbox::TIMEOUT_MESSAGE.to_string(),
        ExecutionOutcome::CompileError(text) | ExecutionOutcome::RuntimeError(text) => text.clone(),
        ExecutionOutcome::SpawnFailure(reason) => format!("Error executing code: {}", reason),
    }
}

/// Combined verdict for one submission against one task.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunVerdict {
    pub success: bool,
    pub output: String,
    pub output_correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_results: Option<TestReport>,
    pub correct: bool,
}

/// Compose the verdict from the execution outcome, the task's optional
/// expected output, and the optional test report.
///
/// A task with no expected output accepts any output; a task with no test
/// suite accepts without tests. `correct` requires both checks to hold and
/// the execution itself to have produced output.
pub fn assemble(
    outcome: &ExecutionOutcome,
    expected_output: Option<&str>,
    test_results: Option<TestReport>,
) -> RunVerdict {
    let output = render_outcome(outcome);
    let executed = matches!(outcome, ExecutionOutcome::Output(_));

    let output_correct = match expected_output {
        Some(expected) if !expected.trim().is_empty() => {
            executed && outputs_match(expected, &output)
        }
        _ => executed,
    };

    let tests_pass = test_results
        .as_ref()
        .map(|report| report.all_tests_passed)
        .unwrap_or(true);

    RunVerdict {
        success: true,
        output,
        output_correct,
        expected_output: expected_output.map(str::to_string),
        test_results,
        correct: output_correct && tests_pass,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::TestRunSummary;

    #[test]
    fn whitespace_runs_and_ends_are_ignored() {
        assert!(outputs_match("hi\n", "hi"));
        assert!(outputs_match("a  b\tc", "a b c"));
        assert!(outputs_match("  1 2 3  \n\n", "1 2 3"));
        assert!(!outputs_match("hi", "ho"));
        assert!(!outputs_match("ab", "a b"));
    }

    #[test]
    fn timeout_renders_the_stable_message() {
        assert_eq!(
            render_outcome(&ExecutionOutcome::Timeout),
            "Execution timeout - your code took too long to run"
        );
    }

    #[test]
    fn matching_output_without_tests_is_correct() {
        let outcome = ExecutionOutcome::Output("hi\n".to_string());
        let verdict = assemble(&outcome, Some("hi"), None);
        assert!(verdict.output_correct);
        assert!(verdict.correct);
    }

    #[test]
    fn failing_tests_defeat_matching_output() {
        let outcome = ExecutionOutcome::Output("hi\n".to_string());
        let report = TestReport::from_summary(TestRunSummary {
            succeeded: 1,
            failed: 1,
            skipped: 0,
            found: 2,
            failures: Vec::new(),
        });
        let verdict = assemble(&outcome, Some("hi"), Some(report));
        assert!(verdict.output_correct);
        assert!(!verdict.correct);
    }

    #[test]
    fn compile_error_is_never_correct() {
        let outcome =
            ExecutionOutcome::CompileError("Compilation Error: Main.java:1: error: x".to_string());
        let verdict = assemble(&outcome, None, None);
        assert!(!verdict.output_correct);
        assert!(!verdict.correct);
    }

    #[test]
    fn blank_expected_output_accepts_any_output() {
        let outcome = ExecutionOutcome::Output("whatever\n".to_string());
        let verdict = assemble(&outcome, Some("   "), None);
        assert!(verdict.output_correct);
        assert!(verdict.correct);
    }
}
