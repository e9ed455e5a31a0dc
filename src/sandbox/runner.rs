//! Sandbox spawning backends.
//!
//! The isolation backend sits behind the narrow [`SandboxRunner`] seam so the
//! container runtime is swappable without touching admission control or the
//! executor's deadline/kill logic.

use crate::config::types::{PipelineError, Result, SandboxSettings};
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::time::Instant;

/// One spawned isolated process. Destroyed (forcibly if necessary) before the
/// executing call returns; a handle never outlives the call that created it.
pub struct SandboxHandle {
    pub name: String,
    pub child: Child,
    pub started: Instant,
}

/// Spawning seam for isolation backends.
pub trait SandboxRunner: Send + Sync {
    /// Spawn one isolated process under `name`, stream `source` to its stdin
    /// and close the stream to signal end-of-input.
    fn spawn(&self, name: &str, source: &str) -> Result<SandboxHandle>;

    /// Best-effort forced removal of the sandbox identity. Errors are logged
    /// and swallowed; disposal must never mask the primary outcome.
    fn dispose(&self, name: &str);
}

/// Container-runtime backend. Builds the fixed argv shape
/// `run --name <name> --rm -i [--network=none] --memory=<m> --cpus=<c>
/// --ulimit nproc=<soft>:<hard> <image>`.
pub struct ContainerRunner {
    settings: SandboxSettings,
}

impl ContainerRunner {
    pub fn new(settings: SandboxSettings) -> Self {
        Self { settings }
    }

    fn run_args(&self, name: &str) -> Vec<String> {
        let s = &self.settings;
        let mut args = vec![
            "run".to_string(),
            "--name".to_string(),
            name.to_string(),
            "--rm".to_string(),
            "-i".to_string(),
        ];
        if s.network_disabled {
            args.push("--network=none".to_string());
        }
        args.push(format!("--memory={}", s.memory_limit));
        args.push(format!("--cpus={}", s.cpu_limit));
        args.push("--ulimit".to_string());
        args.push(format!(
            "nproc={}:{}",
            s.process_limit,
            s.process_limit * 2
        ));
        args.push(s.image.clone());
        args
    }
}

impl SandboxRunner for ContainerRunner {
    fn spawn(&self, name: &str, source: &str) -> Result<SandboxHandle> {
        let mut child = Command::new(&self.settings.runtime)
            .args(self.run_args(name))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PipelineError::Sandbox(format!("failed to start sandbox: {}", e)))?;

        // Write the submission and close stdin to signal end-of-input.
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(source.as_bytes())
                .map_err(|e| PipelineError::Sandbox(format!("failed to stream source: {}", e)))?;
        }

        Ok(SandboxHandle {
            name: name.to_string(),
            child,
            started: Instant::now(),
        })
    }

    fn dispose(&self, name: &str) {
        let removed = Command::new(&self.settings.runtime)
            .args(["rm", "-f", name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .and_then(|mut child| child.wait());
        if let Err(e) = removed {
            log::warn!("sandbox cleanup failed for {}: {}", name, e);
        }
    }
}
