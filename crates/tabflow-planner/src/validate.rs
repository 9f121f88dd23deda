//! Structural validation. Every issue is collected before failing so the
//! editor can show them all at once; nothing runs unless the list is empty.

use tabflow_core::dag::StageKind;
use tabflow_core::id::NodeId;

use crate::definition::PipelineDefinition;
use crate::error::{Issue, PlanError};
use crate::graph::{InputRole, Node, PipelineGraph};
use crate::plan::{topological_order, ExecutionPlan};

pub fn validate(graph: &PipelineGraph) -> Result<ExecutionPlan, PlanError> {
    if graph.nodes().is_empty() {
        return Err(PlanError::new(vec![Issue::Empty]));
    }
    let mut issues = Vec::new();

    let outputs: Vec<&NodeId> = graph
        .nodes()
        .iter()
        .filter(|n| n.kind == StageKind::Output)
        .map(|n| &n.id)
        .collect();
    match outputs.as_slice() {
        [] => issues.push(Issue::NoOutput),
        [_] => {}
        many => issues.push(Issue::MultipleOutputs(many.iter().map(|id| (*id).clone()).collect())),
    }
    for id in &outputs {
        if graph.outgoing(id).next().is_some() {
            issues.push(Issue::OutputHasOutgoing((*id).clone()));
        }
    }

    for node in graph.nodes() {
        let got = graph.incoming(&node.id).count();
        let expected = node.kind.arity();
        if !expected.accepts(got) {
            issues.push(Issue::Arity {
                node: node.id.clone(),
                kind: node.kind,
                expected,
                got,
            });
        } else if node.kind == StageKind::Join {
            check_join_roles(graph, node, &mut issues);
        }
    }

    let order = match topological_order(graph) {
        Ok(order) => Some(order),
        Err(stuck) => {
            issues.push(Issue::CyclicNodes(stuck));
            None
        }
    };

    match (order, outputs.as_slice()) {
        (Some(order), [output]) if issues.is_empty() => {
            Ok(ExecutionPlan::build(graph, order, (*output).clone()))
        }
        _ => Err(PlanError::new(issues)),
    }
}

/// A join needs exactly one `primary` and one `lookup` input.
fn check_join_roles(graph: &PipelineGraph, node: &Node, issues: &mut Vec<Issue>) {
    let mut primary = 0;
    let mut lookup = 0;
    for edge in graph.incoming(&node.id) {
        match edge.input_role() {
            Some(InputRole::Primary) => primary += 1,
            Some(InputRole::Lookup) => lookup += 1,
            None => issues.push(Issue::JoinRoles {
                node: node.id.clone(),
                detail: match &edge.role {
                    Some(role) => format!("edge '{}' has unknown role '{role}'", edge.id),
                    None => format!("edge '{}' has no primary/lookup role", edge.id),
                },
            }),
        }
    }
    if primary > 1 || lookup > 1 {
        issues.push(Issue::JoinRoles {
            node: node.id.clone(),
            detail: format!("needs one primary and one lookup input, has {primary} primary and {lookup} lookup"),
        });
    }
}

/// Build, validate and plan an editor definition in one step.
pub fn plan_definition(def: &PipelineDefinition) -> Result<ExecutionPlan, PlanError> {
    let (graph, mut issues) = PipelineGraph::build(def);
    match validate(&graph) {
        Ok(plan) if issues.is_empty() => Ok(plan),
        Ok(_) => Err(PlanError::new(issues)),
        Err(e) => {
            issues.extend(e.issues);
            Err(PlanError::new(issues))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(v: serde_json::Value) -> Result<ExecutionPlan, PlanError> {
        let def: PipelineDefinition = serde_json::from_value(v).unwrap();
        plan_definition(&def)
    }

    fn join_pipeline(primary: &str, lookup: &str) -> serde_json::Value {
        json!({
            "nodes": [
                {"id": "orders", "type": "source", "config": {"entityName": "orders"}},
                {"id": "customers", "type": "source", "config": {"entityName": "customers"}},
                {"id": "j", "type": "join", "config": {"predicates": [{"leftColumn": "cid", "rightColumn": "cid"}]}},
                {"id": "out", "type": "output"}
            ],
            "edges": [
                {"id": "e1", "source": "customers", "target": "j", "role": lookup},
                {"id": "e2", "source": "orders", "target": "j", "role": primary},
                {"id": "e3", "source": "j", "target": "out"}
            ]
        })
    }

    #[test]
    fn join_inputs_follow_roles_not_edge_order() {
        let plan = plan(join_pipeline("primary", "lookup")).unwrap();
        let step = plan.step(&"j".into()).unwrap();
        assert_eq!(step.inputs, vec![NodeId::from("orders"), NodeId::from("customers")]);
        assert_eq!(plan.output.as_str(), "out");
        assert_eq!(
            plan.waves,
            vec![
                vec![NodeId::from("orders"), NodeId::from("customers")],
                vec![NodeId::from("j")],
                vec![NodeId::from("out")],
            ]
        );
    }

    #[test]
    fn join_without_roles_is_rejected() {
        let err = plan(join_pipeline("primary", "primary")).unwrap_err();
        assert!(err.issues.iter().any(|i| matches!(i, Issue::JoinRoles { .. })));
        let err = plan(join_pipeline("primary", "input-2")).unwrap_err();
        assert!(matches!(&err.issues[0], Issue::JoinRoles { detail, .. } if detail.contains("input-2")));
    }

    #[test]
    fn union_inputs_ordered_by_slot() {
        let plan = plan(json!({
            "nodes": [
                {"id": "a", "type": "source", "config": {"entityName": "a"}},
                {"id": "b", "type": "source", "config": {"entityName": "b"}},
                {"id": "c", "type": "source", "config": {"entityName": "c"}},
                {"id": "u", "type": "union"},
                {"id": "out", "type": "output"}
            ],
            "edges": [
                {"source": "a", "target": "u"},
                {"source": "b", "target": "u", "slot": 1},
                {"source": "c", "target": "u", "slot": 0},
                {"source": "u", "target": "out"}
            ]
        }))
        .unwrap();
        let inputs = &plan.step(&"u".into()).unwrap().inputs;
        let ids: Vec<&str> = inputs.iter().map(|i| i.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);
    }

    #[test]
    fn collects_every_structural_issue() {
        let err = plan(json!({
            "nodes": [
                {"id": "s", "type": "source"},
                {"id": "f", "type": "filter"},
                {"id": "u", "type": "union"},
                {"id": "x", "type": "sorter"}
            ],
            "edges": [
                {"id": "e1", "source": "s", "target": "u"},
                {"id": "e2", "source": "u", "target": "s"},
                {"id": "e3", "source": "s", "target": "ghost"}
            ]
        }))
        .unwrap_err();
        let has = |pred: fn(&Issue) -> bool| err.issues.iter().any(pred);
        assert!(has(|i| matches!(i, Issue::UnknownStageType { kind, .. } if kind == "sorter")));
        let cycle = err
            .issues
            .iter()
            .find(|i| matches!(i, Issue::Cycle { .. }))
            .unwrap();
        assert!(matches!(cycle, Issue::Cycle { from, to, .. } if from.as_str() == "u" && to.as_str() == "s"));
        assert_eq!(cycle.to_string(), "edge 'e2' (u -> s) would create a cycle");
        assert!(has(|i| matches!(i, Issue::UnknownEndpoint { node, .. } if node.as_str() == "ghost")));
        assert!(has(|i| matches!(i, Issue::NoOutput)));
        assert!(has(|i| matches!(i, Issue::Arity { node, got: 0, .. } if node.as_str() == "f")));
        assert!(has(|i| matches!(i, Issue::Arity { node, got: 1, .. } if node.as_str() == "u")));
    }

    #[test]
    fn output_must_be_unique_and_terminal() {
        let err = plan(json!({
            "nodes": [
                {"id": "s", "type": "source", "config": {"entityName": "a"}},
                {"id": "o1", "type": "output"},
                {"id": "o2", "type": "output"}
            ],
            "edges": [
                {"source": "s", "target": "o1"},
                {"source": "o1", "target": "o2"}
            ]
        }))
        .unwrap_err();
        assert!(err.issues.contains(&Issue::MultipleOutputs(vec!["o1".into(), "o2".into()])));
        assert!(err.issues.contains(&Issue::OutputHasOutgoing("o1".into())));
    }

    #[test]
    fn source_with_input_is_arity_error() {
        let err = plan(json!({
            "nodes": [
                {"id": "a", "type": "source", "config": {"entityName": "a"}},
                {"id": "b", "type": "source", "config": {"entityName": "b"}},
                {"id": "out", "type": "output"}
            ],
            "edges": [
                {"source": "a", "target": "b"},
                {"source": "b", "target": "out"}
            ]
        }))
        .unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert!(err.to_string().contains("source node 'b' needs exactly 0 input(s), has 1"));
    }

    #[test]
    fn undecodable_config_is_kept_for_runtime() {
        let plan = plan(json!({
            "nodes": [
                {"id": "s", "type": "source", "config": {"entityType": "spreadsheets", "entityName": "a"}},
                {"id": "out", "type": "output"}
            ],
            "edges": [{"source": "s", "target": "out"}]
        }))
        .unwrap();
        assert!(plan.step(&"s".into()).unwrap().config_issue.is_some());
    }

    #[test]
    fn empty_pipeline() {
        let err = plan(json!({"nodes": []})).unwrap_err();
        assert_eq!(err.issues, vec![Issue::Empty]);
    }

    #[test]
    fn ties_break_by_definition_order() {
        let plan = plan(json!({
            "nodes": [
                {"id": "out", "type": "output"},
                {"id": "z", "type": "source", "config": {"entityName": "z"}},
                {"id": "f", "type": "filter"},
                {"id": "a", "type": "source", "config": {"entityName": "a"}},
                {"id": "u", "type": "union"}
            ],
            "edges": [
                {"source": "u", "target": "out"},
                {"source": "z", "target": "f"},
                {"source": "f", "target": "u"},
                {"source": "a", "target": "u"}
            ]
        }))
        .unwrap();
        let order: Vec<&str> = plan.order().map(|id| id.as_str()).collect();
        assert_eq!(order, ["z", "f", "a", "u", "out"]);
        assert!(plan.to_string().contains("wave 0: z, a"));
    }
}
