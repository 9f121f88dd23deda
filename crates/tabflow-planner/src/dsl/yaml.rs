//! YAML pipeline definitions.
//!
//! Same shape as the editor's JSON, handy for hand-written pipelines:
//!
//! ```yaml
//! config:
//!   default_currency: EUR
//! nodes:
//!   - { id: orders, type: source, config: { entityType: datasets, entityName: orders } }
//!   - id: paid
//!     type: filter
//!     config:
//!       operator: AND
//!       conditions: [ { fieldId: status, operator: "==", value: PAID } ]
//!   - { id: out, type: output }
//! edges:
//!   - { source: orders, target: paid }
//!   - { source: paid, target: out }
//! ```

use crate::definition::PipelineDefinition;

pub fn parse_yaml_pipeline(yaml_src: &str) -> Result<PipelineDefinition, serde_yaml::Error> {
    serde_yaml::from_str(yaml_src)
}
