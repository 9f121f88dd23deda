//! What a run hands back: one result per node plus the manifest.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use tabflow_core::diagnostics::Diagnostics;
use tabflow_core::fetch::FetchError;
use tabflow_core::id::NodeId;
use tabflow_core::manifest::RunManifest;
use tabflow_core::table::Table;
use tabflow_operators::OpError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeMetrics {
    /// Rows across all inputs.
    pub rows_in: usize,
    pub rows_out: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct NodeOutput {
    pub table: Arc<Table>,
    pub diagnostics: Diagnostics,
    pub metrics: NodeMetrics,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("execution error: {0}")]
    Exec(String),

    #[error("upstream node(s) failed: {}", join_ids(.failed))]
    Upstream { failed: Vec<NodeId> },
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter().map(NodeId::as_str).collect::<Vec<_>>().join(", ")
}

impl From<OpError> for NodeError {
    fn from(e: OpError) -> Self {
        match e {
            OpError::Config(m) => NodeError::Config(m),
            OpError::Fetch(f) => NodeError::Fetch(f),
            OpError::Exec(m) => NodeError::Exec(m),
        }
    }
}

pub type NodeResult = Result<NodeOutput, NodeError>;

#[derive(Debug)]
pub struct RunResult {
    pub manifest: RunManifest,
    pub nodes: BTreeMap<NodeId, NodeResult>,
    pub output: NodeId,
    /// The output node's `outputLabel`, when set.
    pub output_label: Option<String>,
}

impl RunResult {
    pub fn node(&self, id: &NodeId) -> Option<&NodeResult> {
        self.nodes.get(id)
    }

    pub fn output_result(&self) -> Option<&NodeResult> {
        self.nodes.get(&self.output)
    }

    /// The designated output table, when the output node succeeded.
    pub fn output_table(&self) -> Option<&Arc<Table>> {
        match self.output_result()? {
            Ok(out) => Some(&out.table),
            Err(_) => None,
        }
    }

    /// First `n` rows of a node's table, when that node succeeded.
    pub fn sample(&self, id: &NodeId, n: usize) -> Option<Table> {
        match self.nodes.get(id)? {
            Ok(out) => Some(out.table.head(n)),
            Err(_) => None,
        }
    }

    /// Ids of nodes that failed, in id order.
    pub fn failed(&self) -> impl Iterator<Item = (&NodeId, &NodeError)> + '_ {
        self.nodes.iter().filter_map(|(id, r)| r.as_ref().err().map(|e| (id, e)))
    }

    /// Row diagnostics summed over every node that succeeded.
    pub fn diagnostics(&self) -> Diagnostics {
        let mut total = Diagnostics::new();
        for out in self.nodes.values().flatten() {
            total.merge(&out.diagnostics);
        }
        total
    }

    pub fn is_success(&self) -> bool {
        self.nodes.values().all(Result::is_ok)
    }
}
