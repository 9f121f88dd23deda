//! Deterministic replay & provenance helpers.
//!
//! The manifest records a hash of the executed plan and of the output table.
//! Re-running the same plan against the same catalog contents must produce
//! the same pair.

use tabflow_core::hash::{hash_serde, hash_table, Hash256};
use tabflow_core::manifest::RunManifest;
use tabflow_core::table::Table;
use tabflow_planner::{ExecutionPlan, PipelineDefinition};

use crate::ExecError;

pub fn hash_plan(plan: &ExecutionPlan) -> Result<Hash256, ExecError> {
    hash_serde(plan).map_err(|e| ExecError::Hash(e.to_string()))
}

pub fn hash_definition(def: &PipelineDefinition) -> Result<Hash256, ExecError> {
    def.hash().map_err(|e| ExecError::Hash(e.to_string()))
}

pub fn output_digest(table: &Table) -> Hash256 {
    hash_table(table)
}

/// Whether two runs executed the same plan and produced the same output.
pub fn same_outcome(a: &RunManifest, b: &RunManifest) -> bool {
    a.pipeline_hash == b.pipeline_hash && a.output_digest == b.output_digest
}
