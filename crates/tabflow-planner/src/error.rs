//! Structural problems found while building or validating a pipeline graph.

use std::fmt;

use thiserror::Error;

use tabflow_core::dag::{Arity, StageKind};
use tabflow_core::id::{EdgeId, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Issue {
    #[error("pipeline has no nodes")]
    Empty,

    #[error("node '{node}': unknown stage type '{kind}'")]
    UnknownStageType { node: NodeId, kind: String },

    #[error("node id '{0}' is used more than once")]
    DuplicateNode(NodeId),

    #[error("edge '{edge}' references unknown node '{node}'")]
    UnknownEndpoint { edge: EdgeId, node: NodeId },

    #[error("edge '{edge}' connects node '{node}' to itself")]
    SelfLoop { edge: EdgeId, node: NodeId },

    #[error("edge '{edge}' ({from} -> {to}) would create a cycle")]
    Cycle { edge: EdgeId, from: NodeId, to: NodeId },

    #[error("nodes {0:?} are part of a cycle")]
    CyclicNodes(Vec<NodeId>),

    #[error("pipeline has no output node")]
    NoOutput,

    #[error("pipeline has more than one output node: {0:?}")]
    MultipleOutputs(Vec<NodeId>),

    #[error("output node '{0}' must not have outgoing edges")]
    OutputHasOutgoing(NodeId),

    #[error("{kind} node '{node}' needs {expected} input(s), has {got}")]
    Arity {
        node: NodeId,
        kind: StageKind,
        expected: Arity,
        got: usize,
    },

    #[error("join node '{node}': {detail}")]
    JoinRoles { node: NodeId, detail: String },
}

/// Every structural issue found; a pipeline with any issue does not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanError {
    pub issues: Vec<Issue>,
}

impl PlanError {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid pipeline ({} issue(s))", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  - {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PlanError {}
