/// Core types and configuration for the drillbox pipeline
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Resource envelope applied to one isolated execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SandboxSettings {
    /// Isolation image identifier handed to the container runtime
    pub image: String,
    /// Container runtime binary ("docker" unless overridden)
    pub runtime: String,
    /// Memory ceiling in runtime notation ("128m", "1g", plain bytes)
    pub memory_limit: String,
    /// CPU share ceiling in runtime notation ("0.5")
    pub cpu_limit: String,
    /// Soft nproc ulimit; the hard limit is pinned at double this value
    pub process_limit: u32,
    /// Disable all network access inside the sandbox
    pub network_disabled: bool,
    /// Wall-clock budget for one execution
    pub timeout: Duration,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            image: "drillbox-runner:latest".to_string(),
            runtime: "docker".to_string(),
            memory_limit: "128m".to_string(),
            cpu_limit: "0.5".to_string(),
            process_limit: 32,
            network_disabled: true,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Admission-control policy knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdmissionSettings {
    /// Hard ceiling on concurrent sandboxes regardless of host resources
    pub max_concurrency: usize,
    /// Caller-visible wait budget for queued requests, as a multiple of the
    /// per-execution timeout. Policy constant, not an invariant.
    pub queue_wait_multiplier: u32,
}

impl Default for AdmissionSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            queue_wait_multiplier: 2,
        }
    }
}

/// External compiler / test-runner invocation shape for the test harness.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarnessSettings {
    /// Compiler binary invoked against the submission and test sources
    pub compiler: String,
    /// Extra compiler arguments inserted before the source paths
    pub compiler_args: Vec<String>,
    /// Classpath handed to the compiler; inherited from the environment when unset
    pub classpath: Option<String>,
    /// Test-runner argv prefix; invoked as `<runner...> <class-dir> <test-type>`
    /// and expected to print a JSON test report on stdout
    pub runner: Vec<String>,
    /// Root directory under which per-invocation workspaces are created
    pub workspace_root: PathBuf,
    /// Bounded wait for the compiler process
    pub compile_timeout: Duration,
    /// Bounded wait for the test-runner process
    pub run_timeout: Duration,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            compiler: "javac".to_string(),
            compiler_args: vec!["-encoding".to_string(), "UTF-8".to_string()],
            classpath: None,
            runner: vec![
                "java".to_string(),
                "-jar".to_string(),
                "/usr/share/drillbox/test-runner.jar".to_string(),
            ],
            workspace_root: std::env::temp_dir().join("drillbox-harness"),
            compile_timeout: Duration::from_secs(30),
            run_timeout: Duration::from_secs(30),
        }
    }
}

/// Static source screening policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScreeningSettings {
    /// Master switch for pre-execution screening
    pub enabled: bool,
    /// Block on any Medium-or-higher finding; otherwise only Critical blocks
    pub strict: bool,
    /// Apply the relaxed ruleset to test-suite code
    pub relaxed_tests: bool,
}

impl Default for ScreeningSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            strict: true,
            relaxed_tests: true,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// When unset or true, executions run in the sandbox; when false they are simulated
    pub sandbox_enabled: Option<bool>,
    pub sandbox: SandboxSettings,
    pub admission: AdmissionSettings,
    pub harness: HarnessSettings,
    pub screening: ScreeningSettings,
}

impl PipelineConfig {
    pub fn sandbox_enabled(&self) -> bool {
        self.sandbox_enabled.unwrap_or(true)
    }
}

/// Tagged result of one sandboxed execution. Exactly one variant per run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    /// Normal exit with empty stderr; carries the full stdout text
    Output(String),
    /// Wall-clock budget exceeded; the process was force-killed
    Timeout,
    /// Non-empty stderr without a compilation marker; carries the trimmed trace
    RuntimeError(String),
    /// Stderr carried the compilation-error marker; carries the extracted span
    CompileError(String),
    /// The isolated process could not be started
    SpawnFailure(String),
}

/// Errors surfaced by the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sandbox error: {0}")]
    Sandbox(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Test engine error: {0}")]
    Engine(String),
}

/// Result type alias for drillbox operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_envelope() {
        let cfg = PipelineConfig::default();
        assert!(cfg.sandbox_enabled());
        assert_eq!(cfg.sandbox.memory_limit, "128m");
        assert_eq!(cfg.sandbox.process_limit, 32);
        assert_eq!(cfg.sandbox.timeout, Duration::from_secs(10));
        assert_eq!(cfg.admission.max_concurrency, 16);
        assert_eq!(cfg.admission.queue_wait_multiplier, 2);
        assert_eq!(cfg.harness.compile_timeout, Duration::from_secs(30));
    }

    #[test]
    fn config_roundtrips_through_json() {
        let cfg = PipelineConfig::default();
        let text = serde_json::to_string(&cfg).unwrap();
        let back: PipelineConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.sandbox.image, cfg.sandbox.image);
        assert_eq!(back.admission.max_concurrency, cfg.admission.max_concurrency);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: PipelineConfig = serde_json::from_str(
            r#"{"admission": {"max_concurrency": 4, "queue_wait_multiplier": 3}}"#,
        )
        .unwrap();
        assert_eq!(cfg.admission.max_concurrency, 4);
        assert_eq!(cfg.admission.queue_wait_multiplier, 3);
        assert_eq!(cfg.sandbox.memory_limit, "128m");
    }
}
