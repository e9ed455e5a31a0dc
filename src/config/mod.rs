//! Configuration and shared types
//!
//! Pipeline configuration structs with documented defaults, the execution
//! outcome taxonomy, and the crate-wide error type.

pub mod types;
