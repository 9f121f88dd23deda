#![forbid(unsafe_code)]
//! tabflow-exec: runs an `ExecutionPlan` and reports per-node results.
//!
//! The default runtime walks the plan sequentially. With the
//! `async-scheduler` feature, `AsyncScheduler` runs each wave of ready nodes
//! concurrently on tokio. Both produce the same `RunResult` for the same
//! plan and catalog contents.

pub mod metrics;
pub mod replay;
pub mod result;
pub mod runtime;
pub mod scheduler;

pub use result::{NodeError, NodeMetrics, NodeOutput, NodeResult, RunResult};
pub use runtime::{CancelToken, Engine, ExecError};

#[cfg(feature = "async-scheduler")]
pub use scheduler::AsyncScheduler;
