#![forbid(unsafe_code)]
//! tabflow: typed tabular pipeline graphs.
//!
//! Re-exports the workspace crates under one roof:
//! - `tabflow_core`: value model, tables, stage configs, manifests.
//! - `tabflow_operators`: one executor per stage kind.
//! - `tabflow_io`: catalogs, readers and writers.
//! - `tabflow_planner`: definition parsing, validation and planning.
//! - `tabflow_exec`: the runtime.

pub use tabflow_core;
pub use tabflow_exec;
pub use tabflow_io;
pub use tabflow_operators;
pub use tabflow_planner;

pub use tabflow_core::prelude::*;
pub use tabflow_exec::{CancelToken, Engine, ExecError, NodeError, NodeResult, RunResult};
pub use tabflow_planner::{plan_definition, ExecutionPlan, PipelineDefinition, PlanError};
