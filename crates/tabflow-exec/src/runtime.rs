//! Runtime: execute an `ExecutionPlan` in order and emit a `RunManifest`.
//!
//! - Builds each node's stage through `tabflow_operators::build_stage`.
//! - A node whose config failed to decode or compile fails with
//!   `NodeError::Config`; its descendants fail with `NodeError::Upstream`.
//!   Sibling branches still run.
//! - Cancellation is checked before every node. A cancelled run discards
//!   every table it produced.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use tabflow_core::config::EngineConfig;
use tabflow_core::dag::StageConfig;
use tabflow_core::fetch::TableFetcher;
use tabflow_core::id::NodeId;
use tabflow_core::manifest::RunManifest;
use tabflow_core::table::Table;
use tabflow_operators::{build_stage, StageContext};
use tabflow_planner::{plan_definition, ExecutionPlan, PipelineDefinition, PlanError, PlanStep};

use crate::metrics;
use crate::replay;
use crate::result::{NodeError, NodeMetrics, NodeOutput, NodeResult, RunResult};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("run cancelled")]
    Cancelled,
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("hashing error: {0}")]
    Hash(String),
    #[error("scheduler: {0}")]
    Scheduler(String),
}

/// Whole-run cancellation flag, shared by clone.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Engine owns the configuration and the catalog stages fetch from.
#[derive(Clone)]
pub struct Engine {
    cfg: EngineConfig,
    fetcher: Arc<dyn TableFetcher>,
}

impl Engine {
    pub fn new(cfg: EngineConfig, fetcher: Arc<dyn TableFetcher>) -> Self {
        Self { cfg, fetcher }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn fetcher(&self) -> &Arc<dyn TableFetcher> {
        &self.fetcher
    }

    /// Plan and run an editor definition.
    pub fn run_definition(&self, def: &PipelineDefinition) -> Result<RunResult, ExecError> {
        let plan = plan_definition(def)?;
        self.run(&plan)
    }

    pub fn run(&self, plan: &ExecutionPlan) -> Result<RunResult, ExecError> {
        self.run_with_cancel(plan, &CancelToken::new())
    }

    /// Execute every step in plan order.
    pub fn run_with_cancel(
        &self,
        plan: &ExecutionPlan,
        cancel: &CancelToken,
    ) -> Result<RunResult, ExecError> {
        let pipeline_hash = replay::hash_plan(plan)?;
        let manifest = RunManifest::new(pipeline_hash, now_millis());
        metrics::run_started(plan);

        let mut nodes: BTreeMap<NodeId, NodeResult> = BTreeMap::new();
        for step in &plan.steps {
            if cancel.is_cancelled() {
                metrics::run_cancelled(&step.node);
                return Err(ExecError::Cancelled);
            }
            let result = gather_inputs(step, &nodes)
                .and_then(|inputs| execute_step(step, inputs, self.fetcher.as_ref(), &self.cfg));
            metrics::node_finished(step, &result);
            nodes.insert(step.node.clone(), result);
        }
        Ok(finish(plan, manifest, nodes))
    }
}

/// Collect a step's input tables in resolved order.
///
/// Fails with `Upstream` naming every failed ancestor that caused it, in
/// first-seen order.
pub(crate) fn gather_inputs(
    step: &PlanStep,
    done: &BTreeMap<NodeId, NodeResult>,
) -> Result<Vec<Arc<Table>>, NodeError> {
    let mut tables = Vec::with_capacity(step.inputs.len());
    let mut failed: Vec<NodeId> = Vec::new();
    for input in &step.inputs {
        match done.get(input) {
            Some(Ok(out)) => tables.push(Arc::clone(&out.table)),
            Some(Err(NodeError::Upstream { failed: causes })) => {
                for id in causes {
                    if !failed.contains(id) {
                        failed.push(id.clone());
                    }
                }
            }
            Some(Err(_)) | None => {
                if !failed.contains(input) {
                    failed.push(input.clone());
                }
            }
        }
    }
    if failed.is_empty() {
        Ok(tables)
    } else {
        Err(NodeError::Upstream { failed })
    }
}

/// Build and evaluate one stage on its inputs.
pub(crate) fn execute_step(
    step: &PlanStep,
    inputs: Vec<Arc<Table>>,
    fetcher: &dyn TableFetcher,
    cfg: &EngineConfig,
) -> NodeResult {
    if let Some(issue) = &step.config_issue {
        return Err(NodeError::Config(issue.clone()));
    }
    let stage = build_stage(&step.config, &cfg.default_currency)?;
    let ctx = StageContext { fetcher };
    let rows_in = inputs.iter().map(|t| t.num_rows()).sum();
    let started = Instant::now();
    let out = stage.eval(&inputs, &ctx)?;
    Ok(NodeOutput {
        metrics: NodeMetrics {
            rows_in,
            rows_out: out.table.num_rows(),
            elapsed: started.elapsed(),
        },
        table: out.table,
        diagnostics: out.diagnostics,
    })
}

/// Close the manifest and assemble the run result.
pub(crate) fn finish(
    plan: &ExecutionPlan,
    manifest: RunManifest,
    nodes: BTreeMap<NodeId, NodeResult>,
) -> RunResult {
    let output_digest = match nodes.get(&plan.output) {
        Some(Ok(out)) => Some(replay::output_digest(&out.table)),
        _ => None,
    };
    let failed = nodes.values().filter(|r| r.is_err()).count();
    let manifest = manifest.finish(now_millis(), output_digest, nodes.len() - failed, failed);
    metrics::run_finished(&manifest);

    let output_label = plan.step(&plan.output).and_then(|s| match &s.config {
        StageConfig::Output(cfg) => cfg
            .output_label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string),
        _ => None,
    });

    RunResult {
        manifest,
        nodes,
        output: plan.output.clone(),
        output_label,
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabflow_core::dag::EntityType;
    use tabflow_core::diagnostics::DiagnosticKind;
    use tabflow_core::fetch::FetchError;
    use tabflow_core::types::Scalar;
    use tabflow_io::MemoryCatalog;

    fn engine() -> Engine {
        let catalog = MemoryCatalog::new();
        let orders = Table::from_json_rows(&[
            json!({"order_id": 1, "cid": 1, "amount": 100, "status": "PAID"}),
            json!({"order_id": 2, "cid": 2, "amount": 40, "status": "VOID"}),
            json!({"order_id": 3, "cid": 1, "amount": 60, "status": "PAID"}),
        ])
        .unwrap();
        let customers = Table::from_json_rows(&[
            json!({"cid": 1, "segment": "A"}),
            json!({"cid": 2, "segment": "B"}),
        ])
        .unwrap();
        catalog.insert(EntityType::Datasets, "orders", orders);
        catalog.insert(EntityType::Datasets, "customers", customers);
        Engine::new(EngineConfig::default(), Arc::new(catalog))
    }

    fn definition(v: serde_json::Value) -> PipelineDefinition {
        serde_json::from_value(v).unwrap()
    }

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    #[test]
    fn runs_filter_join_aggregate() {
        let def = definition(json!({
            "nodes": [
                {"id": "orders", "type": "source", "config": {"entityName": "orders"}},
                {"id": "customers", "type": "source", "config": {"entityName": "customers"}},
                {"id": "paid", "type": "filter", "config": {"operator": "AND", "conditions": [
                    {"fieldId": "status", "operator": "not_in", "value": "VOID"}
                ]}},
                {"id": "j", "type": "join", "config": {"joinType": "left", "predicates": [
                    {"leftColumn": "cid", "operator": "==", "rightColumn": "cid"}
                ]}},
                {"id": "agg", "type": "aggregate", "config": {
                    "groupBy": ["segment"],
                    "aggregations": [{"function": "sum", "columnId": "amount", "alias": "total"}]
                }},
                {"id": "out", "type": "output", "config": {"outputLabel": " Revenue "}}
            ],
            "edges": [
                {"source": "orders", "target": "paid"},
                {"source": "paid", "target": "j", "role": "primary"},
                {"source": "customers", "target": "j", "role": "lookup"},
                {"source": "j", "target": "agg"},
                {"source": "agg", "target": "out"}
            ]
        }));
        let result = engine().run_definition(&def).unwrap();
        assert!(result.is_success());
        let table = result.output_table().unwrap();
        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.rows()[0].value("segment"), &Scalar::text("A"));
        assert_eq!(table.rows()[0].value("total"), &Scalar::Number(160.0));
        assert_eq!(result.output_label.as_deref(), Some("Revenue"));

        let Some(Ok(paid)) = result.node(&id("paid")) else {
            panic!("filter failed")
        };
        assert_eq!(paid.metrics.rows_in, 3);
        assert_eq!(paid.metrics.rows_out, 2);
        assert_eq!(result.manifest.nodes_succeeded, 6);
        assert!(result.manifest.output_digest.is_some());
    }

    #[test]
    fn failed_branch_does_not_stop_siblings() {
        let def = definition(json!({
            "nodes": [
                {"id": "orders", "type": "source", "config": {"entityName": "orders"}},
                {"id": "ghost", "type": "source", "config": {"entityName": "missing"}},
                {"id": "f", "type": "filter"},
                {"id": "g", "type": "filter"},
                {"id": "out", "type": "output"}
            ],
            "edges": [
                {"source": "orders", "target": "f"},
                {"source": "ghost", "target": "g"},
                {"source": "f", "target": "out"}
            ]
        }));
        let result = engine().run_definition(&def).unwrap();
        assert!(matches!(
            result.node(&id("ghost")),
            Some(Err(NodeError::Fetch(FetchError::NotFound { .. })))
        ));
        assert_eq!(
            result.node(&id("g")).unwrap().as_ref().unwrap_err(),
            &NodeError::Upstream { failed: vec![id("ghost")] }
        );
        assert_eq!(result.output_table().unwrap().num_rows(), 3);
        assert_eq!(result.manifest.nodes_failed, 2);
        assert!(!result.is_success());
    }

    #[test]
    fn upstream_failure_names_root_causes() {
        let def = definition(json!({
            "nodes": [
                {"id": "orders", "type": "source", "config": {"entityName": "orders"}},
                {"id": "bad", "type": "aggregate", "config": {
                    "aggregations": [{"function": "sum"}]
                }},
                {"id": "ghost", "type": "source", "config": {"entityName": "missing"}},
                {"id": "u", "type": "union"},
                {"id": "out", "type": "output"}
            ],
            "edges": [
                {"source": "orders", "target": "bad"},
                {"source": "bad", "target": "u", "slot": 0},
                {"source": "ghost", "target": "u", "slot": 1},
                {"source": "u", "target": "out"}
            ]
        }));
        let result = engine().run_definition(&def).unwrap();
        assert!(matches!(result.node(&id("bad")), Some(Err(NodeError::Config(_)))));
        assert_eq!(
            result.output_result().unwrap().as_ref().unwrap_err(),
            &NodeError::Upstream { failed: vec![id("bad"), id("ghost")] }
        );
        assert!(result.output_table().is_none());
        assert!(result.manifest.output_digest.is_none());
    }

    #[test]
    fn diagnostics_total_across_nodes() {
        let def = definition(json!({
            "nodes": [
                {"id": "s", "type": "source", "config": {"entityName": "orders"}},
                {"id": "a", "type": "formula", "config": {"fields": [
                    {"name": "per_zero", "formula": "{amount} / 0", "datatype": {"type": "number"}}
                ]}},
                {"id": "b", "type": "formula", "config": {"fields": [
                    {"name": "ghost", "formula": "{nope} + 1", "datatype": {"type": "number"}}
                ]}},
                {"id": "out", "type": "output"}
            ],
            "edges": [
                {"source": "s", "target": "a"},
                {"source": "a", "target": "b"},
                {"source": "b", "target": "out"}
            ]
        }));
        let result = engine().run_definition(&def).unwrap();
        let totals = result.diagnostics();
        assert_eq!(totals.count(DiagnosticKind::DivisionByZero), 3);
        assert_eq!(totals.count(DiagnosticKind::UnknownColumn), 3);
        assert_eq!(totals.total(), 6);
    }

    #[test]
    fn undecodable_config_fails_only_that_node() {
        let def = definition(json!({
            "nodes": [
                {"id": "s", "type": "source", "config": {"entityName": "orders", "entityType": "sheets"}},
                {"id": "out", "type": "output"}
            ],
            "edges": [{"source": "s", "target": "out"}]
        }));
        let result = engine().run_definition(&def).unwrap();
        assert!(matches!(result.node(&id("s")), Some(Err(NodeError::Config(_)))));
    }

    #[test]
    fn structural_errors_block_the_run() {
        let def = definition(json!({"nodes": [{"id": "f", "type": "filter"}]}));
        assert!(matches!(engine().run_definition(&def), Err(ExecError::Plan(_))));
    }

    #[test]
    fn cancelled_run_returns_nothing() {
        let def = definition(json!({
            "nodes": [
                {"id": "s", "type": "source", "config": {"entityName": "orders"}},
                {"id": "out", "type": "output"}
            ],
            "edges": [{"source": "s", "target": "out"}]
        }));
        let plan = plan_definition(&def).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            engine().run_with_cancel(&plan, &cancel),
            Err(ExecError::Cancelled)
        ));
    }

    #[test]
    fn reruns_are_reproducible() {
        let def = definition(json!({
            "nodes": [
                {"id": "s", "type": "source", "config": {"entityName": "orders"}},
                {"id": "out", "type": "output"}
            ],
            "edges": [{"source": "s", "target": "out"}]
        }));
        let engine = engine();
        let a = engine.run_definition(&def).unwrap();
        let b = engine.run_definition(&def).unwrap();
        assert!(replay::same_outcome(&a.manifest, &b.manifest));
        assert_ne!(a.manifest.id, b.manifest.id);
        assert_eq!(a.sample(&id("s"), 2).unwrap().num_rows(), 2);
    }
}
