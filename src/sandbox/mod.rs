//! Sandbox execution.
//!
//! One isolated, resource-limited process per submission: spawn through the
//! [`runner::SandboxRunner`] seam, stream the source over stdin, wait under a
//! hard deadline, force-kill on expiry, and reduce stderr to a short
//! diagnostic.

pub mod diagnostics;
pub mod executor;
pub mod runner;

pub use diagnostics::Diagnostic;
pub use executor::{SandboxExecutor, TIMEOUT_MESSAGE};
pub use runner::{ContainerRunner, SandboxHandle, SandboxRunner};
