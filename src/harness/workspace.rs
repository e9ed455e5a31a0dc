//! Per-invocation private workspace.
//!
//! A uniquely-named directory holding the submitted source and the test
//! source for one harness run. Deleted unconditionally before the run
//! returns; `Drop` covers early exits so no invocation leaks its directory.

use crate::config::types::{PipelineError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct TestWorkspace {
    dir: PathBuf,
    cleaned: bool,
}

impl TestWorkspace {
    /// Create a fresh workspace directory under `root`.
    pub fn create(root: &Path) -> Result<Self> {
        let dir = root.join(format!("ws-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).map_err(|e| {
            PipelineError::Workspace(format!(
                "failed to create workspace {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self {
            dir,
            cleaned: false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one source blob as `<TypeName>.java` inside the workspace.
    pub fn write_source(&self, type_name: &str, content: &str) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}.java", type_name));
        fs::write(&path, content).map_err(|e| {
            PipelineError::Workspace(format!(
                "failed to write source {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(path)
    }

    /// Recursively delete the workspace. Idempotent; failures are logged and
    /// swallowed so teardown never masks the run's primary result.
    pub fn teardown(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!(
                    "failed to remove workspace {}: {}",
                    self.dir.display(),
                    e
                );
            }
        }
    }
}

impl Drop for TestWorkspace {
    fn drop(&mut self) {
        self.teardown();
    }
}
