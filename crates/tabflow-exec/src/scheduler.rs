//! Concurrent wave scheduler (feature `async-scheduler`).
//!
//! Each plan wave holds nodes whose inputs all come from earlier waves, so a
//! wave's nodes run concurrently once the previous wave is complete. Stage
//! evaluation is synchronous and may block on the catalog, so it runs on
//! tokio's blocking pool, bounded by `EngineConfig::max_parallel_tasks`.

#[cfg(feature = "async-scheduler")]
pub use async_impl::*;

#[cfg(feature = "async-scheduler")]
mod async_impl {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use tokio::sync::Semaphore;
    use tokio::task::JoinSet;

    use tabflow_core::id::NodeId;
    use tabflow_core::manifest::RunManifest;
    use tabflow_planner::ExecutionPlan;

    use crate::metrics;
    use crate::replay;
    use crate::result::{NodeResult, RunResult};
    use crate::runtime::{
        execute_step, finish, gather_inputs, now_millis, CancelToken, Engine, ExecError,
    };

    pub struct AsyncScheduler {
        engine: Engine,
        semaphore: Arc<Semaphore>,
    }

    impl AsyncScheduler {
        pub fn new(engine: Engine) -> Self {
            let permits = engine.config().max_parallel_tasks.max(1);
            Self {
                engine,
                semaphore: Arc::new(Semaphore::new(permits)),
            }
        }

        pub async fn run(&self, plan: &ExecutionPlan) -> Result<RunResult, ExecError> {
            self.run_with_cancel(plan, &CancelToken::new()).await
        }

        pub async fn run_with_cancel(
            &self,
            plan: &ExecutionPlan,
            cancel: &CancelToken,
        ) -> Result<RunResult, ExecError> {
            let pipeline_hash = replay::hash_plan(plan)?;
            let manifest = RunManifest::new(pipeline_hash, now_millis());
            metrics::run_started(plan);

            let mut nodes: BTreeMap<NodeId, NodeResult> = BTreeMap::new();
            for wave in &plan.waves {
                let mut tasks = JoinSet::new();
                for id in wave {
                    let Some(step) = plan.step(id) else {
                        return Err(ExecError::Scheduler(format!("wave names unknown node '{id}'")));
                    };
                    if cancel.is_cancelled() {
                        metrics::run_cancelled(id);
                        tasks.abort_all();
                        return Err(ExecError::Cancelled);
                    }
                    let inputs = gather_inputs(step, &nodes);
                    let step = step.clone();
                    let fetcher = Arc::clone(self.engine.fetcher());
                    let cfg = self.engine.config().clone();
                    let permit = Arc::clone(&self.semaphore)
                        .acquire_owned()
                        .await
                        .map_err(|e| ExecError::Scheduler(e.to_string()))?;
                    tasks.spawn_blocking(move || {
                        let _permit = permit;
                        let result = inputs
                            .and_then(|inputs| execute_step(&step, inputs, fetcher.as_ref(), &cfg));
                        metrics::node_finished(&step, &result);
                        (step.node, result)
                    });
                }
                while let Some(joined) = tasks.join_next().await {
                    let (id, result) = joined.map_err(|e| ExecError::Scheduler(e.to_string()))?;
                    nodes.insert(id, result);
                }
            }
            if cancel.is_cancelled() {
                return Err(ExecError::Cancelled);
            }
            Ok(finish(plan, manifest, nodes))
        }
    }
}

#[cfg(all(test, feature = "async-scheduler"))]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use tabflow_core::config::EngineConfig;
    use tabflow_core::dag::EntityType;
    use tabflow_core::table::Table;
    use tabflow_io::MemoryCatalog;
    use tabflow_planner::{plan_definition, PipelineDefinition};

    use super::AsyncScheduler;
    use crate::runtime::Engine;

    #[tokio::test]
    async fn matches_sequential_run() {
        let catalog = MemoryCatalog::new();
        for (name, rows) in [
            ("east", vec![json!({"region": "E", "v": 1}), json!({"region": "E", "v": 2})]),
            ("west", vec![json!({"region": "W", "v": 5})]),
        ] {
            catalog.insert(EntityType::Datasets, name, Table::from_json_rows(&rows).unwrap());
        }
        let def: PipelineDefinition = serde_json::from_value(json!({
            "nodes": [
                {"id": "e", "type": "source", "config": {"entityName": "east"}},
                {"id": "w", "type": "source", "config": {"entityName": "west"}},
                {"id": "u", "type": "union"},
                {"id": "out", "type": "output"}
            ],
            "edges": [
                {"source": "e", "target": "u", "slot": 0},
                {"source": "w", "target": "u", "slot": 1},
                {"source": "u", "target": "out"}
            ]
        }))
        .unwrap();
        let plan = plan_definition(&def).unwrap();
        let engine = Engine::new(
            EngineConfig {
                max_parallel_tasks: 2,
                ..EngineConfig::default()
            },
            Arc::new(catalog),
        );
        let sequential = engine.run(&plan).unwrap();
        let concurrent = AsyncScheduler::new(engine).run(&plan).await.unwrap();
        assert_eq!(
            sequential.output_table().unwrap(),
            concurrent.output_table().unwrap()
        );
        assert_eq!(
            sequential.manifest.output_digest,
            concurrent.manifest.output_digest
        );
    }
}
