//! Deadline-bounded sandbox execution.
//!
//! Spawns exactly one isolated process per submission through the configured
//! [`SandboxRunner`], waits with a hard deadline, force-kills on expiry, and
//! classifies the collected output into an [`ExecutionOutcome`].

use crate::config::types::ExecutionOutcome;
use crate::sandbox::diagnostics::{self, Diagnostic};
use crate::sandbox::runner::SandboxRunner;
use crate::utils::process::{self, WaitVerdict};
use std::time::Duration;
use uuid::Uuid;

/// Caller-facing timeout message, stable wording.
pub const TIMEOUT_MESSAGE: &str = "Execution timeout - your code took too long to run";

pub struct SandboxExecutor {
    runner: Box<dyn SandboxRunner>,
    timeout: Duration,
}

impl SandboxExecutor {
    pub fn new(runner: Box<dyn SandboxRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one submission to completion. Every exit path destroys the
    /// sandbox before returning; no handle survives this call.
    pub fn run(&self, source: &str) -> ExecutionOutcome {
        let name = format!("drillbox-{}", &Uuid::new_v4().to_string()[..8]);

        let mut handle = match self.runner.spawn(&name, source) {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("sandbox spawn failed for {}: {}", name, e);
                self.runner.dispose(&name);
                return ExecutionOutcome::SpawnFailure(e.to_string());
            }
        };

        let stdout_reader = handle.child.stdout.take().map(process::spawn_line_reader);
        let stderr_reader = handle.child.stderr.take().map(process::spawn_line_reader);

        match process::wait_with_deadline(&mut handle.child, self.timeout) {
            Ok(WaitVerdict::Completed(status)) => {
                let stdout = process::join_reader(stdout_reader);
                let stderr = process::join_reader(stderr_reader);
                log::debug!(
                    "sandbox {} exited with {:?} after {}ms",
                    name,
                    status.code(),
                    handle.started.elapsed().as_millis()
                );

                if stderr.is_empty() {
                    ExecutionOutcome::Output(stdout)
                } else {
                    match diagnostics::classify(&stderr) {
                        Diagnostic::Compile(text) => ExecutionOutcome::CompileError(text),
                        Diagnostic::Runtime(text) => ExecutionOutcome::RuntimeError(text),
                    }
                }
            }
            Ok(WaitVerdict::TimedOut) => {
                log::warn!(
                    "sandbox {} exceeded {}s wall budget, force-killing",
                    name,
                    self.timeout.as_secs()
                );
                self.destroy(&mut handle);
                ExecutionOutcome::Timeout
            }
            Err(e) => {
                log::error!("sandbox {} monitoring failed: {}", name, e);
                self.destroy(&mut handle);
                ExecutionOutcome::SpawnFailure(format!("process monitoring error: {}", e))
            }
        }
    }

    /// Force-kill, reap, and remove the sandbox. Cleanup errors are logged
    /// and swallowed; they never replace the primary outcome.
    fn destroy(&self, handle: &mut crate::sandbox::runner::SandboxHandle) {
        if let Err(e) = handle.child.kill() {
            log::warn!("force-kill of sandbox {} failed: {}", handle.name, e);
        }
        let _ = handle.child.wait();
        self.runner.dispose(&handle.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::Result;
    use crate::sandbox::runner::SandboxHandle;
    use std::process::{Command, Stdio};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    /// Runner that executes the "source" as a shell script, standing in for
    /// the container runtime.
    struct ShellRunner {
        disposed: Arc<AtomicUsize>,
    }

    impl SandboxRunner for ShellRunner {
        fn spawn(&self, name: &str, source: &str) -> Result<SandboxHandle> {
            let child = Command::new("sh")
                .arg("-c")
                .arg(source)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()?;
            Ok(SandboxHandle {
                name: name.to_string(),
                child,
                started: Instant::now(),
            })
        }

        fn dispose(&self, _name: &str) {
            self.disposed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn shell_executor(timeout: Duration) -> (SandboxExecutor, Arc<AtomicUsize>) {
        let disposed = Arc::new(AtomicUsize::new(0));
        let runner = ShellRunner {
            disposed: Arc::clone(&disposed),
        };
        (SandboxExecutor::new(Box::new(runner), timeout), disposed)
    }

    #[test]
    fn clean_run_returns_stdout() {
        let (executor, _) = shell_executor(Duration::from_secs(5));
        let outcome = executor.run("echo hi");
        assert_eq!(outcome, ExecutionOutcome::Output("hi\n".to_string()));
    }

    #[test]
    fn stderr_takes_precedence_over_stdout() {
        let (executor, _) = shell_executor(Duration::from_secs(5));
        let outcome = executor.run("echo ignored; echo 'java.lang.IllegalStateException: bad' >&2");
        match outcome {
            ExecutionOutcome::RuntimeError(text) => {
                assert!(text.contains("IllegalStateException"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn compile_marker_yields_compile_error() {
        let (executor, _) = shell_executor(Duration::from_secs(5));
        let outcome = executor
            .run("printf 'Compilation Error\\nMain.java:1: error: class expected\\n' >&2");
        match outcome {
            ExecutionOutcome::CompileError(text) => {
                assert!(text.contains("Main.java:1: error"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn overlong_run_is_killed_within_budget() {
        let (executor, disposed) = shell_executor(Duration::from_millis(200));
        let start = Instant::now();
        let outcome = executor.run("sleep 30");
        assert_eq!(outcome, ExecutionOutcome::Timeout);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn spawn_failure_attempts_cleanup() {
        struct BrokenRunner;
        impl SandboxRunner for BrokenRunner {
            fn spawn(&self, _name: &str, _source: &str) -> Result<SandboxHandle> {
                Err(crate::config::types::PipelineError::Sandbox(
                    "runtime unavailable".to_string(),
                ))
            }
            fn dispose(&self, name: &str) {
                assert!(name.starts_with("drillbox-"));
            }
        }
        let executor = SandboxExecutor::new(Box::new(BrokenRunner), Duration::from_secs(1));
        match executor.run("echo hi") {
            ExecutionOutcome::SpawnFailure(reason) => {
                assert!(reason.contains("runtime unavailable"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
