//! drillbox: sandboxed execution and test verification for untrusted code
//! submissions.
//!
//! The surrounding application supplies a submission (and optionally a task's
//! expected output and test suite) and consumes a structured verdict; this
//! crate owns everything between those two points.
//!
//! # Architecture
//!
//! ## Admission ([`admission`])
//! - [`admission::capacity`]: startup sizing from host cores and memory
//! - [`admission::permits`]: counting-semaphore gate bounding live sandboxes
//! - [`admission::queue`]: FIFO overflow backlog + background dispatcher
//!
//! ## Sandbox ([`sandbox`])
//! - [`sandbox::runner`]: spawning seam over the container runtime
//! - [`sandbox::executor`]: deadline-bounded run with forced kill
//! - [`sandbox::diagnostics`]: stderr reduced to a short diagnostic
//!
//! ## Test harness ([`harness`])
//! - [`harness::workspace`]: per-invocation directory, torn down on every path
//! - [`harness::engine`]: compile/run facade over the external toolchain
//! - [`harness::report`]: run summaries and the caller-facing report shape
//!
//! ## Screening ([`screening`])
//! - pattern-based refusal of obviously hostile source before admission
//!
//! ## Verdict ([`verdict`])
//! - whitespace-normalized output comparison and verdict assembly
//!
//! ## Service ([`service`])
//! - [`service::ExecutionService`]: the front door wiring it all together
//!
//! # Design principles
//!
//! 1. **Scoped acquisition** - permits, workspaces, and sandbox handles are
//!    released on every exit path, enforced by guards rather than discipline
//! 2. **One authoritative deadline** - every sandbox run is force-killed at
//!    its budget; queued callers carry their own bounded wait
//! 3. **Cleanup never masks outcomes** - teardown failures are logged and
//!    swallowed, never returned in place of the primary result
//! 4. **Narrow backend seams** - the container runtime and the compiler/test
//!    runtime sit behind small traits so backends are swappable

pub mod admission;
pub mod config;
pub mod harness;
pub mod sandbox;
pub mod screening;
pub mod service;
pub mod utils;
pub mod verdict;

// CLI entrypoint wiring shared by the drillbox binary.
pub mod cli;

// Re-export commonly used types for convenience
pub use config::types::*;
pub use service::{ExecutionService, RunOutcome};
