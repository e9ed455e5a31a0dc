//! Test-engine facade.
//!
//! The harness state machine is independent of the underlying compiler and
//! test runtime: [`TestEngine`] narrows them to `compile` and `run`. The
//! process-backed implementation shells out to the configured compiler and a
//! test-runner command that reports results as JSON on stdout.

use crate::config::types::HarnessSettings;
use crate::harness::report::{TestReport, TestRunSummary};
use crate::sandbox::diagnostics;
use crate::utils::process::{self, WaitVerdict};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

/// Freshly compiled classes rooted at the workspace directory.
#[derive(Clone, Debug)]
pub struct CompiledUnit {
    pub class_dir: PathBuf,
}

#[derive(Error, Debug)]
pub enum EngineError {
    /// Compiler rejected the sources (or exceeded its bounded wait)
    #[error("compilation failed: {0}")]
    Compile(String),

    /// Compiler or runner process could not be started
    #[error("launcher failed: {0}")]
    Launch(String),

    /// Test run failed before producing results
    #[error("test run failed: {0}")]
    Run(String),

    /// Runner produced output that is not a test report
    #[error("unexpected test output: {0}")]
    Report(String),
}

pub trait TestEngine: Send + Sync {
    /// Compile `sources` with classes emitted into `out_dir`.
    fn compile(
        &self,
        out_dir: &Path,
        sources: &[PathBuf],
    ) -> std::result::Result<CompiledUnit, EngineError>;

    /// Discover and run the test methods of `test_type` against the
    /// compiled unit.
    fn run(
        &self,
        unit: &CompiledUnit,
        test_type: &str,
    ) -> std::result::Result<TestRunSummary, EngineError>;
}

/// Process-backed engine: external compiler plus a JSON-reporting runner.
pub struct ProcessEngine {
    settings: HarnessSettings,
}

impl ProcessEngine {
    pub fn new(settings: HarnessSettings) -> Self {
        Self { settings }
    }

    fn classpath(&self, out_dir: &Path) -> String {
        match &self.settings.classpath {
            Some(classpath) => format!("{}:{}", out_dir.display(), classpath),
            None => match std::env::var("CLASSPATH") {
                Ok(env_cp) if !env_cp.is_empty() => {
                    format!("{}:{}", out_dir.display(), env_cp)
                }
                _ => out_dir.display().to_string(),
            },
        }
    }
}

impl TestEngine for ProcessEngine {
    fn compile(
        &self,
        out_dir: &Path,
        sources: &[PathBuf],
    ) -> std::result::Result<CompiledUnit, EngineError> {
        let mut child = Command::new(&self.settings.compiler)
            .args(&self.settings.compiler_args)
            .arg("-cp")
            .arg(self.classpath(out_dir))
            .arg("-d")
            .arg(out_dir)
            .args(sources)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                EngineError::Launch(format!("could not start {}: {}", self.settings.compiler, e))
            })?;

        let stderr_reader = child.stderr.take().map(process::spawn_line_reader);

        match process::wait_with_deadline(&mut child, self.settings.compile_timeout) {
            Ok(WaitVerdict::Completed(status)) => {
                let stderr = process::join_reader(stderr_reader);
                if status.success() {
                    Ok(CompiledUnit {
                        class_dir: out_dir.to_path_buf(),
                    })
                } else {
                    Err(EngineError::Compile(diagnostics::excerpt(&stderr)))
                }
            }
            Ok(WaitVerdict::TimedOut) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(EngineError::Compile(format!(
                    "compilation timed out after {:?}",
                    self.settings.compile_timeout
                )))
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(EngineError::Launch(format!(
                    "compiler monitoring error: {}",
                    e
                )))
            }
        }
    }

    fn run(
        &self,
        unit: &CompiledUnit,
        test_type: &str,
    ) -> std::result::Result<TestRunSummary, EngineError> {
        let Some((program, prefix_args)) = self.settings.runner.split_first() else {
            return Err(EngineError::Launch("empty runner command".to_string()));
        };

        let mut child = Command::new(program)
            .args(prefix_args)
            .arg(&unit.class_dir)
            .arg(test_type)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::Launch(format!("could not start {}: {}", program, e)))?;

        let stdout_reader = child.stdout.take().map(process::spawn_line_reader);
        let stderr_reader = child.stderr.take().map(process::spawn_line_reader);

        match process::wait_with_deadline(&mut child, self.settings.run_timeout) {
            Ok(WaitVerdict::Completed(_)) => {
                let stdout = process::join_reader(stdout_reader);
                let stderr = process::join_reader(stderr_reader);
                parse_runner_report(&stdout, &stderr)
            }
            Ok(WaitVerdict::TimedOut) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(EngineError::Run(format!(
                    "test run timed out after {:?}",
                    self.settings.run_timeout
                )))
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(EngineError::Launch(format!(
                    "runner monitoring error: {}",
                    e
                )))
            }
        }
    }
}

/// Decode the runner's stdout. Anything that does not parse as a report is a
/// terminal fault, with stderr folded in for context.
fn parse_runner_report(
    stdout: &str,
    stderr: &str,
) -> std::result::Result<TestRunSummary, EngineError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Report(if stderr.is_empty() {
            "runner produced no output".to_string()
        } else {
            diagnostics::excerpt(stderr)
        }));
    }
    if !trimmed.starts_with('{') {
        return Err(EngineError::Report(diagnostics::excerpt(trimmed)));
    }

    let report: TestReport = serde_json::from_str(trimmed)
        .map_err(|e| EngineError::Report(format!("malformed report: {}", e)))?;
    if !report.success {
        return Err(EngineError::Run(
            report
                .message
                .unwrap_or_else(|| "test runner reported failure".to_string()),
        ));
    }

    let summary = report.into_summary();
    if !summary.counts_consistent() {
        log::warn!(
            "runner reported inconsistent counts: {}+{}+{} > {}",
            summary.succeeded,
            summary.failed,
            summary.skipped,
            summary.found
        );
    }
    Ok(summary)
}
