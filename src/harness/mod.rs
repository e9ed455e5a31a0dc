//! Compile-load-test harness.
//!
//! One invocation walks a fixed state machine: extract type names, create a
//! private workspace, write both sources, compile, run the test suite,
//! summarize, and tear the workspace down on every path out.

pub mod engine;
pub mod report;
pub mod source;
pub mod workspace;

pub use engine::{CompiledUnit, EngineError, ProcessEngine, TestEngine};
pub use report::{TestFailure, TestReport, TestRunSummary};
pub use workspace::TestWorkspace;

use crate::config::types::HarnessSettings;
use std::path::PathBuf;

pub struct TestHarness {
    engine: Box<dyn TestEngine>,
    workspace_root: PathBuf,
}

impl TestHarness {
    pub fn new(engine: Box<dyn TestEngine>, workspace_root: PathBuf) -> Self {
        Self {
            engine,
            workspace_root,
        }
    }

    /// Harness backed by the configured external compiler and runner.
    pub fn process_backed(settings: HarnessSettings) -> Self {
        let workspace_root = settings.workspace_root.clone();
        Self::new(Box::new(ProcessEngine::new(settings)), workspace_root)
    }

    /// Run the supplied test suite against the submission. Never panics and
    /// never leaks the workspace; every fault maps to a setup-failure report.
    pub fn run(&self, submission: &str, test_source: &str) -> TestReport {
        let Some(submission_type) = source::public_type_name(submission) else {
            return TestReport::setup_failure(
                "Could not determine class name for the submitted code",
            );
        };
        let Some(test_type) = source::public_type_name(test_source) else {
            return TestReport::setup_failure("Could not determine class name for the test code");
        };

        let mut workspace = match TestWorkspace::create(&self.workspace_root) {
            Ok(workspace) => workspace,
            Err(e) => {
                log::error!("test workspace creation failed: {}", e);
                return TestReport::setup_failure(format!("Error running tests: {}", e));
            }
        };

        let report = self.run_in(&workspace, &submission_type, submission, &test_type, test_source);
        workspace.teardown();
        report
    }

    fn run_in(
        &self,
        workspace: &TestWorkspace,
        submission_type: &str,
        submission: &str,
        test_type: &str,
        test_source: &str,
    ) -> TestReport {
        let submission_path = match workspace.write_source(submission_type, submission) {
            Ok(path) => path,
            Err(e) => return TestReport::setup_failure(format!("Error running tests: {}", e)),
        };
        let test_path = match workspace.write_source(test_type, test_source) {
            Ok(path) => path,
            Err(e) => return TestReport::setup_failure(format!("Error running tests: {}", e)),
        };

        let unit = match self
            .engine
            .compile(workspace.dir(), &[submission_path, test_path])
        {
            Ok(unit) => unit,
            Err(EngineError::Compile(detail)) => {
                return TestReport::setup_failure(format!("Compilation failed: {}", detail));
            }
            Err(e) => {
                log::error!("test compilation could not run: {}", e);
                return TestReport::setup_failure(format!("Error running tests: {}", e));
            }
        };

        match self.engine.run(&unit, test_type) {
            Ok(summary) => TestReport::from_summary(summary),
            Err(e) => {
                log::error!("test run failed for {}: {}", test_type, e);
                TestReport::setup_failure(format!("Error running tests: {}", e))
            }
        }
    }
}
