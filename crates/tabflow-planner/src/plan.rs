//! Execution plan: deterministic node order, resolved inputs, and waves.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use tabflow_core::dag::{StageConfig, StageKind};
use tabflow_core::id::NodeId;

use crate::graph::{Edge, InputRole, PipelineGraph};

/// One node ready to run once every node in `inputs` has a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    pub node: NodeId,
    pub kind: StageKind,
    pub label: String,
    pub config: StageConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_issue: Option<String>,
    /// Upstream nodes in the order the stage consumes them.
    pub inputs: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionPlan {
    /// Steps in topological order; ties follow definition order.
    pub steps: Vec<PlanStep>,
    /// Groups of steps whose inputs all come from earlier waves.
    pub waves: Vec<Vec<NodeId>>,
    pub output: NodeId,
}

impl ExecutionPlan {
    pub fn order(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.steps.iter().map(|s| &s.node)
    }

    pub fn step(&self, id: &NodeId) -> Option<&PlanStep> {
        self.steps.iter().find(|s| &s.node == id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Build the plan for an already validated graph.
    pub(crate) fn build(graph: &PipelineGraph, order: Vec<NodeId>, output: NodeId) -> Self {
        let mut level: HashMap<&NodeId, usize> = HashMap::new();
        let mut steps = Vec::with_capacity(order.len());
        let mut waves: Vec<Vec<NodeId>> = Vec::new();

        for id in &order {
            let Some(node) = graph.node(id) else { continue };
            let inputs = resolve_inputs(graph, node.kind, id);
            let depth = inputs
                .iter()
                .filter_map(|i| level.get(i))
                .map(|l| l + 1)
                .max()
                .unwrap_or(0);
            level.insert(id, depth);
            if waves.len() <= depth {
                waves.resize_with(depth + 1, Vec::new);
            }
            waves[depth].push(id.clone());
            steps.push(PlanStep {
                node: id.clone(),
                kind: node.kind,
                label: node.label.clone(),
                config: node.config.clone(),
                config_issue: node.config_issue.clone(),
                inputs,
            });
        }
        Self {
            steps,
            waves,
            output,
        }
    }
}

/// Kahn's algorithm; among ready nodes the earliest-defined runs first.
/// Returns the nodes left over when a cycle blocks progress.
pub(crate) fn topological_order(graph: &PipelineGraph) -> Result<Vec<NodeId>, Vec<NodeId>> {
    let nodes = graph.nodes();
    let mut indegree: Vec<usize> = nodes.iter().map(|n| graph.incoming(&n.id).count()).collect();
    let mut ready: BTreeSet<usize> = indegree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| i)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(i) = ready.pop_first() {
        let id = &nodes[i].id;
        for edge in graph.outgoing(id) {
            if let Some(t) = graph.position(&edge.target) {
                indegree[t] -= 1;
                if indegree[t] == 0 {
                    ready.insert(t);
                }
            }
        }
        order.push(id.clone());
    }

    if order.len() == nodes.len() {
        Ok(order)
    } else {
        Err(nodes
            .iter()
            .zip(&indegree)
            .filter(|(_, d)| **d > 0)
            .map(|(n, _)| n.id.clone())
            .collect())
    }
}

/// Input order for `id`: join takes primary then lookup, union sorts by
/// slot (unslotted last) then declaration, others keep edge order.
pub(crate) fn resolve_inputs(graph: &PipelineGraph, kind: StageKind, id: &NodeId) -> Vec<NodeId> {
    let mut incoming: Vec<(usize, &Edge)> = graph.incoming(id).enumerate().collect();
    match kind {
        StageKind::Join => {
            incoming.sort_by_key(|(i, e)| match e.input_role() {
                Some(InputRole::Primary) => (0, *i),
                Some(InputRole::Lookup) => (1, *i),
                None => (2, *i),
            });
        }
        StageKind::Union => {
            incoming.sort_by_key(|(i, e)| (e.slot.is_none(), e.slot, *i));
        }
        _ => {}
    }
    incoming.into_iter().map(|(_, e)| e.source.clone()).collect()
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "output: {}", self.output)?;
        for (n, wave) in self.waves.iter().enumerate() {
            let ids: Vec<&str> = wave.iter().map(|id| id.as_str()).collect();
            writeln!(f, "wave {n}: {}", ids.join(", "))?;
        }
        writeln!(f, "steps:")?;
        for (n, step) in self.steps.iter().enumerate() {
            write!(f, "  {:>2}. {} [{}]", n + 1, step.node, step.kind)?;
            if !step.label.is_empty() {
                write!(f, " \"{}\"", step.label)?;
            }
            if !step.inputs.is_empty() {
                let ids: Vec<&str> = step.inputs.iter().map(|id| id.as_str()).collect();
                write!(f, " <- {}", ids.join(", "))?;
            }
            if let Some(issue) = &step.config_issue {
                write!(f, " (config error: {issue})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
