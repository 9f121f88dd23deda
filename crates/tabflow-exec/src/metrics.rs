//! Tracing hooks for runs and nodes.
//!
//! Compiled to no-ops without the `tracing` feature; the binary decides where
//! events go.

use tabflow_core::id::NodeId;
use tabflow_core::manifest::RunManifest;
use tabflow_planner::{ExecutionPlan, PlanStep};

use crate::result::NodeResult;

#[cfg(feature = "tracing")]
pub fn run_started(plan: &ExecutionPlan) {
    tracing::debug!(
        nodes = plan.len(),
        waves = plan.waves.len(),
        output = %plan.output,
        "run started"
    );
}

#[cfg(not(feature = "tracing"))]
pub fn run_started(_plan: &ExecutionPlan) {}

#[cfg(feature = "tracing")]
pub fn node_finished(step: &PlanStep, result: &NodeResult) {
    match result {
        Ok(out) => tracing::trace!(
            node = %step.node,
            kind = %step.kind,
            rows_in = out.metrics.rows_in,
            rows_out = out.metrics.rows_out,
            elapsed_us = out.metrics.elapsed.as_micros() as u64,
            diagnostics = %out.diagnostics,
            "node finished"
        ),
        Err(e) => tracing::warn!(node = %step.node, kind = %step.kind, error = %e, "node failed"),
    }
}

#[cfg(not(feature = "tracing"))]
pub fn node_finished(_step: &PlanStep, _result: &NodeResult) {}

#[cfg(feature = "tracing")]
pub fn run_cancelled(before: &NodeId) {
    tracing::debug!(node = %before, "run cancelled");
}

#[cfg(not(feature = "tracing"))]
pub fn run_cancelled(_before: &NodeId) {}

#[cfg(feature = "tracing")]
pub fn run_finished(manifest: &RunManifest) {
    tracing::debug!(
        run = %manifest.id.0,
        succeeded = manifest.nodes_succeeded,
        failed = manifest.nodes_failed,
        elapsed_ms = manifest.elapsed_ms(),
        "run finished"
    );
}

#[cfg(not(feature = "tracing"))]
pub fn run_finished(_manifest: &RunManifest) {}
