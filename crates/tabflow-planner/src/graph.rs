//! Typed pipeline graph.
//!
//! Nodes carry a decoded `StageConfig`. A node whose config does not decode
//! still enters the graph (with the default config and `config_issue` set) so
//! the run can report it as that node's configuration error while sibling
//! branches proceed.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tabflow_core::dag::{StageConfig, StageKind};
use tabflow_core::id::{EdgeId, NodeId};

use crate::definition::PipelineDefinition;
use crate::error::Issue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputRole {
    Primary,
    Lookup,
}

impl InputRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "left" => Some(InputRole::Primary),
            "lookup" | "right" => Some(InputRole::Lookup),
            _ => None,
        }
    }
}

impl fmt::Display for InputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputRole::Primary => "primary",
            InputRole::Lookup => "lookup",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: StageKind,
    pub label: String,
    pub config: StageConfig,
    /// Why the editor's config for this node could not be decoded.
    pub config_issue: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, config: StageConfig) -> Self {
        Self {
            id: id.into(),
            kind: config.kind(),
            label: String::new(),
            config,
            config_issue: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    /// Raw role text; only join targets interpret it.
    pub role: Option<String>,
    pub slot: Option<u32>,
}

impl Edge {
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            role: None,
            slot: None,
        }
    }

    pub fn with_role(mut self, role: InputRole) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn with_slot(mut self, slot: u32) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn input_role(&self) -> Option<InputRole> {
        self.role.as_deref().and_then(InputRole::parse)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node id '{0}' already exists")]
    DuplicateNode(NodeId),
    #[error("edge '{edge}' references unknown node '{node}'")]
    UnknownNode { edge: EdgeId, node: NodeId },
    #[error("edge '{edge}' is a self loop on '{node}'")]
    SelfLoop { edge: EdgeId, node: NodeId },
    #[error("edge '{edge}' would create a cycle")]
    Cycle { edge: EdgeId },
}

impl GraphError {
    fn into_issue(self, edge: &Edge) -> Issue {
        match self {
            GraphError::DuplicateNode(id) => Issue::DuplicateNode(id),
            GraphError::UnknownNode { edge, node } => Issue::UnknownEndpoint { edge, node },
            GraphError::SelfLoop { edge, node } => Issue::SelfLoop { edge, node },
            GraphError::Cycle { edge: id } => Issue::Cycle {
                edge: id,
                from: edge.source.clone(),
                to: edge.target.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineGraph {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    edges: Vec<Edge>,
}

impl PipelineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.index.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Add an edge. Rejects unknown endpoints, self loops, and any edge that
    /// would close a cycle.
    pub fn connect(&mut self, edge: Edge) -> Result<(), GraphError> {
        for end in [&edge.source, &edge.target] {
            if !self.index.contains_key(end) {
                return Err(GraphError::UnknownNode {
                    edge: edge.id.clone(),
                    node: end.clone(),
                });
            }
        }
        if edge.source == edge.target {
            return Err(GraphError::SelfLoop {
                edge: edge.id,
                node: edge.source,
            });
        }
        if self.reaches(&edge.target, &edge.source) {
            return Err(GraphError::Cycle { edge: edge.id });
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Whether `to` is reachable from `from` along existing edges.
    fn reaches(&self, from: &NodeId, to: &NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen: HashSet<&NodeId> = HashSet::new();
        while let Some(cur) = stack.pop() {
            if cur == to {
                return true;
            }
            if !seen.insert(cur) {
                continue;
            }
            stack.extend(self.edges.iter().filter(|e| &e.source == cur).map(|e| &e.target));
        }
        false
    }

    /// Build from an editor definition, collecting every problem found on the
    /// way. Offending nodes and edges are left out of the returned graph.
    pub fn build(def: &PipelineDefinition) -> (Self, Vec<Issue>) {
        let mut graph = Self::new();
        let mut issues = Vec::new();
        let mut declared: HashSet<&NodeId> = HashSet::new();

        for nd in &def.nodes {
            let first = declared.insert(&nd.id);
            let kind = match nd.kind.parse::<StageKind>() {
                Ok(kind) => kind,
                Err(_) => {
                    issues.push(Issue::UnknownStageType {
                        node: nd.id.clone(),
                        kind: nd.kind.clone(),
                    });
                    continue;
                }
            };
            let (config, config_issue) = match StageConfig::from_json(kind, nd.config.clone()) {
                Ok(cfg) => (cfg, None),
                Err(e) => (StageConfig::default_for(kind), Some(e.to_string())),
            };
            let node = Node {
                id: nd.id.clone(),
                kind,
                label: nd.label.clone(),
                config,
                config_issue,
            };
            if !first || graph.add_node(node).is_err() {
                issues.push(Issue::DuplicateNode(nd.id.clone()));
            }
        }

        for ed in &def.edges {
            // Edges touching a declared-but-rejected node were already reported through that node.
            let dangling = [&ed.source, &ed.target]
                .into_iter()
                .any(|end| declared.contains(end) && graph.node(end).is_none());
            if dangling {
                continue;
            }
            let edge = Edge {
                id: ed.edge_id(),
                source: ed.source.clone(),
                target: ed.target.clone(),
                role: ed.role.clone(),
                slot: ed.slot,
            };
            if let Err(e) = graph.connect(edge.clone()) {
                issues.push(e.into_issue(&edge));
            }
        }
        (graph, issues)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|i| &self.nodes[*i])
    }

    /// Definition order of `id`.
    pub fn position(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Incoming edges of `id` in insertion order.
    pub fn incoming<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.target == id)
    }

    pub fn outgoing<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.source == id)
    }
}
