//! Pipeline front door.
//!
//! Wires screening, admission control, the sandbox executor, and the test
//! harness into the two operations the application layer calls: run a
//! submission, and run a test suite against a submission. Capacity is sized
//! once at construction and the overflow dispatcher runs for the service's
//! whole lifetime.

use crate::admission::{
    self, CapacityPlan, Dispatcher, OverflowQueue, PendingTask, PermitGate, ResultSlot,
};
use crate::config::types::{ExecutionOutcome, PipelineConfig};
use crate::harness::{ProcessEngine, TestEngine, TestHarness, TestReport};
use crate::sandbox::{ContainerRunner, SandboxExecutor, SandboxRunner};
use crate::screening::{CodeScreener, ScreeningReport};
use crate::verdict;
use std::sync::Arc;
use std::time::Instant;

/// Service-level result of one submission run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The sandbox produced an outcome (including timeouts and errors)
    Completed(ExecutionOutcome),
    /// Screening refused the submission before any sandbox was spawned
    Blocked(ScreeningReport),
    /// Capacity and the queue deadline were both exhausted
    AdmissionRejected,
}

impl RunOutcome {
    /// Text the application layer shows for this outcome.
    pub fn render(&self) -> String {
        match self {
            RunOutcome::Completed(outcome) => verdict::render_outcome(outcome),
            RunOutcome::Blocked(report) => report.user_message("Code"),
            RunOutcome::AdmissionRejected => verdict::ADMISSION_REJECTED_MESSAGE.to_string(),
        }
    }
}

pub struct ExecutionService {
    config: PipelineConfig,
    plan: CapacityPlan,
    screener: CodeScreener,
    gate: PermitGate,
    queue: Arc<OverflowQueue>,
    dispatcher: Option<Dispatcher>,
    executor: Arc<SandboxExecutor>,
    harness: TestHarness,
}

impl ExecutionService {
    /// Production service: container-backed sandbox, process-backed harness.
    pub fn new(config: PipelineConfig) -> Self {
        let runner = Box::new(ContainerRunner::new(config.sandbox.clone()));
        let engine = Box::new(ProcessEngine::new(config.harness.clone()));
        Self::with_backends(config, runner, engine)
    }

    /// Service with explicit backends; the seam the integration tests use.
    pub fn with_backends(
        config: PipelineConfig,
        runner: Box<dyn SandboxRunner>,
        engine: Box<dyn TestEngine>,
    ) -> Self {
        let per_sandbox = admission::parse_memory_limit(&config.sandbox.memory_limit);
        let plan = admission::plan_capacity(per_sandbox, config.admission.max_concurrency);
        let gate = PermitGate::new(plan.permits);
        let queue = OverflowQueue::new();
        let executor = Arc::new(SandboxExecutor::new(runner, config.sandbox.timeout));

        let dispatcher = {
            let executor = Arc::clone(&executor);
            Dispatcher::spawn(Arc::clone(&queue), gate.clone(), move |source| {
                executor.run(source)
            })
        };

        let harness = TestHarness::new(engine, config.harness.workspace_root.clone());
        let screener = CodeScreener::new(config.screening.clone());

        log::info!(
            "initialized execution service with max {} concurrent executions",
            plan.permits
        );
        log::info!(
            "host cores: {}, by-cpu cap: {}, by-memory cap: {}, ceiling: {}",
            plan.cores,
            plan.by_cpu,
            plan.by_memory,
            plan.ceiling
        );

        Self {
            config,
            plan,
            screener,
            gate,
            queue,
            dispatcher: Some(dispatcher),
            executor,
            harness,
        }
    }

    pub fn capacity(&self) -> &CapacityPlan {
        &self.plan
    }

    pub fn available_permits(&self) -> usize {
        self.gate.available()
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    /// Execute one submission. Admits immediately when a permit is free,
    /// otherwise queues and waits on the task's own result slot for at most
    /// `timeout × queue_wait_multiplier`.
    pub fn run_submission(&self, source: &str) -> RunOutcome {
        if self.screener.enabled() {
            let report = self.screener.screen_submission(source);
            if self.screener.blocks_submission(&report) {
                log::warn!(
                    "screening blocked submission: risk {:?} ({})",
                    report.risk,
                    report.reasons.join("; ")
                );
                return RunOutcome::Blocked(report);
            }
            if report.flagged() {
                log::warn!(
                    "risky submission allowed in non-strict mode: {}",
                    report.reasons.join("; ")
                );
            }
        }

        if !self.config.sandbox_enabled() {
            return RunOutcome::Completed(ExecutionOutcome::Output(simulate_execution(source)));
        }

        match self.gate.try_acquire() {
            Some(permit) => {
                let outcome = self.executor.run(source);
                drop(permit);
                RunOutcome::Completed(outcome)
            }
            None => self.enqueue_and_wait(source),
        }
    }

    fn enqueue_and_wait(&self, source: &str) -> RunOutcome {
        let slot = ResultSlot::new();
        self.queue.push(PendingTask {
            source: source.to_string(),
            slot: Arc::clone(&slot),
            enqueued_at: Instant::now(),
        });

        // The task may wait for a permit before its own timeout window even
        // starts; doubling (by default) bounds total caller-visible latency.
        let deadline = self.executor.timeout() * self.config.admission.queue_wait_multiplier;
        match slot.wait(deadline) {
            Some(outcome) => RunOutcome::Completed(outcome),
            None => {
                log::warn!(
                    "queued execution exceeded the {:?} caller deadline, rejecting",
                    deadline
                );
                RunOutcome::AdmissionRejected
            }
        }
    }

    /// Run an externally supplied test suite against the submission. This
    /// path is independent of sandbox admission; the harness bounds its own
    /// compiler and runner processes.
    pub fn run_test_suite(&self, submission: &str, test_source: &str) -> TestReport {
        if self.screener.enabled() {
            let submission_report = self.screener.screen_submission(submission);
            if self.screener.blocks_submission(&submission_report) {
                log::warn!(
                    "screening blocked student code in test run: risk {:?}",
                    submission_report.risk
                );
                return TestReport::setup_failure(submission_report.user_message("Student code"));
            }
            let test_report = self.screener.screen_tests(test_source);
            if self.screener.blocks_tests(&test_report) {
                log::warn!(
                    "screening blocked test code: risk {:?}",
                    test_report.risk
                );
                return TestReport::setup_failure(test_report.user_message("Test code"));
            }
        }

        if !self.config.sandbox_enabled() {
            return TestReport::simulated();
        }

        self.harness.run(submission, test_source)
    }

    /// Stop the overflow dispatcher and join it. Called automatically on
    /// drop; safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(mut dispatcher) = self.dispatcher.take() {
            dispatcher.stop();
            log::info!("execution service shut down");
        }
    }
}

impl Drop for ExecutionService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Development fallback when the sandbox runtime is disabled: extract the
/// print-statement literals instead of executing anything.
fn simulate_execution(source: &str) -> String {
    let mut output = String::new();
    for line in source.lines() {
        if !line.contains("System.out.print") {
            continue;
        }
        let Some(start) = line.find("(\"") else { continue };
        let Some(end) = line.rfind("\")") else { continue };
        if end <= start + 2 {
            continue;
        }
        output.push_str(&line[start + 2..end]);
        if line.contains("println") {
            output.push('\n');
        }
    }
    if output.is_empty() {
        "Code executed successfully, but no output was detected.".to_string()
    } else {
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulation_extracts_print_literals() {
        let source = "public class Main {\n    public static void main(String[] args) {\n        System.out.println(\"hello\");\n        System.out.print(\"wor\");\n        System.out.println(\"ld\");\n    }\n}\n";
        assert_eq!(simulate_execution(source), "hello\nworld\n");
    }

    #[test]
    fn simulation_without_prints_reports_no_output() {
        let source = "public class Main { int x; }";
        assert!(simulate_execution(source).contains("no output was detected"));
    }

    #[test]
    fn rejected_outcome_renders_retry_message() {
        assert_eq!(
            RunOutcome::AdmissionRejected.render(),
            "ERROR: Too many concurrent executions. Please try again later."
        );
    }
}
