//! Execution control for accepted, compiled work.
//!
//! Workloads run on background workers so a hung statement never blocks
//! interruption. Results come back through a one-shot handoff table keyed by
//! task identity, because the boundary above this layer only carries text.

mod controller;
mod task;

pub use controller::{ExecutionController, InterruptHandle};
pub use task::{AbortHandle, CompiledUnit, TaskKey, Workload, WorkloadError};
