//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use serde_json::Value;

use tabflow::tabflow_core::dag::EntityType;
use tabflow::tabflow_io::MemoryCatalog;
use tabflow::{Engine, EngineConfig, NodeId, PipelineDefinition, Row, RunResult, Table};

pub fn table(rows: &[Value]) -> Table {
    Table::from_json_rows(rows).expect("fixture rows are objects")
}

pub fn rows(values: &[Value]) -> Vec<Row> {
    table(values).into_parts().1
}

/// A catalog holding each `(name, rows)` pair as a dataset.
pub fn catalog(datasets: &[(&str, Vec<Value>)]) -> MemoryCatalog {
    let catalog = MemoryCatalog::new();
    for (name, values) in datasets {
        catalog.insert(EntityType::Datasets, *name, table(values));
    }
    catalog
}

pub fn run(catalog: MemoryCatalog, def: Value) -> RunResult {
    let def: PipelineDefinition = serde_json::from_value(def).expect("definition decodes");
    Engine::new(EngineConfig::default(), Arc::new(catalog))
        .run_definition(&def)
        .expect("pipeline is valid")
}

pub fn output(result: &RunResult) -> Arc<Table> {
    Arc::clone(result.output_table().expect("output node succeeded"))
}

pub fn node_table(result: &RunResult, id: &str) -> Arc<Table> {
    match result.node(&NodeId::from(id)) {
        Some(Ok(out)) => Arc::clone(&out.table),
        other => panic!("node {id} did not succeed: {other:?}"),
    }
}

/// `source(name) -> <stage> -> output` with the stage's config.
pub fn single_stage(name: &str, kind: &str, config: Value) -> Value {
    serde_json::json!({
        "nodes": [
            {"id": "src", "type": "source", "config": {"entityName": name}},
            {"id": "stage", "type": kind, "config": config},
            {"id": "out", "type": "output"}
        ],
        "edges": [
            {"source": "src", "target": "stage"},
            {"source": "stage", "target": "out"}
        ]
    })
}

/// `primary + lookup -> join -> output`.
pub fn join_pipeline(primary: &str, lookup: &str, config: Value) -> Value {
    serde_json::json!({
        "nodes": [
            {"id": "p", "type": "source", "config": {"entityName": primary}},
            {"id": "l", "type": "source", "config": {"entityName": lookup}},
            {"id": "j", "type": "join", "config": config},
            {"id": "out", "type": "output"}
        ],
        "edges": [
            {"source": "l", "target": "j", "role": "lookup"},
            {"source": "p", "target": "j", "role": "primary"},
            {"source": "j", "target": "out"}
        ]
    })
}
