#![forbid(unsafe_code)]
//! tabflow-planner: from an editor pipeline definition (JSON or YAML) to a
//! validated `ExecutionPlan`.
//!
//! Design:
//! - `definition`: the untyped boundary shape, exactly as the editor emits it.
//! - `graph`: typed nodes and edges; `connect` refuses cycle-creating edges.
//! - `validate`: structural rules, all issues collected into one `PlanError`.
//! - `plan`: deterministic topological order, resolved input order per node,
//!   and concurrency waves.
//!
//! Nothing here touches data; stage configs are decoded but not compiled.

pub mod definition;
pub mod dsl;
pub mod error;
pub mod graph;
pub mod plan;
pub mod validate;

pub use definition::{EdgeDef, NodeDef, PipelineConfig, PipelineDefinition};
pub use dsl::yaml::parse_yaml_pipeline;
pub use error::{Issue, PlanError};
pub use graph::{Edge, InputRole, Node, PipelineGraph};
pub use plan::{ExecutionPlan, PlanStep};
pub use validate::{plan_definition, validate};
