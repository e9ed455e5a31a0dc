//! Admission control.
//!
//! Startup capacity sizing, the permit gate bounding concurrent sandboxes,
//! and the FIFO overflow backlog with its background dispatcher.

pub mod capacity;
pub mod permits;
pub mod queue;

pub use capacity::{parse_memory_limit, plan_capacity, CapacityPlan};
pub use permits::{PermitGate, PermitGuard};
pub use queue::{Dispatcher, OverflowQueue, PendingTask, ResultSlot};
