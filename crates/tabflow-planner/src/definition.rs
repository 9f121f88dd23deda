//! The pipeline definition boundary: `{nodes: [...], edges: [...]}`.
//!
//! Kept deliberately loose (stage type and edge role are plain strings, node
//! config is raw JSON) so that every problem can be reported by validation
//! with node and edge ids attached, instead of failing the whole parse.

use serde::{Deserialize, Serialize};

use tabflow_core::config::EngineConfig;
use tabflow_core::error::{Error, Result};
use tabflow_core::hash::{hash_serde, Hash256};
use tabflow_core::id::{EdgeId, NodeId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<PipelineConfig>,
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub edges: Vec<EdgeDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EdgeId>,
    pub source: NodeId,
    pub target: NodeId,
    /// `primary` / `lookup` on join inputs; other targets ignore it.
    #[serde(default, alias = "targetHandle", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Ordering of union inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<u32>,
}

impl EdgeDef {
    /// The declared id, or `source->target` when the editor sent none.
    pub fn edge_id(&self) -> EdgeId {
        self.id
            .clone()
            .unwrap_or_else(|| EdgeId::new(format!("{}->{}", self.source, self.target)))
    }
}

/// Engine settings carried inside a definition file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_parallel_tasks: Option<usize>,
    pub preview_rows: Option<usize>,
    pub default_currency: Option<String>,
    pub data_dir: Option<String>,
}

impl PipelineConfig {
    /// Overlay the values this block sets onto `cfg`.
    pub fn apply_to(&self, cfg: &mut EngineConfig) {
        if let Some(n) = self.max_parallel_tasks {
            cfg.max_parallel_tasks = n.max(1);
        }
        if let Some(n) = self.preview_rows {
            cfg.preview_rows = n;
        }
        if let Some(c) = self.default_currency.as_deref().map(str::trim) {
            if !c.is_empty() {
                cfg.default_currency = c.to_ascii_uppercase();
            }
        }
        if let Some(dir) = &self.data_dir {
            cfg.data_dir = Some(dir.clone());
        }
    }
}

impl PipelineDefinition {
    pub fn from_json_str(src: &str) -> Result<Self> {
        Ok(serde_json::from_str(src)?)
    }

    pub fn from_yaml_str(src: &str) -> Result<Self> {
        crate::dsl::yaml::parse_yaml_pipeline(src).map_err(|e| Error::Definition(e.to_string()))
    }

    /// Stable content hash, recorded in run manifests.
    pub fn hash(&self) -> Result<Hash256> {
        hash_serde(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_handle_is_role_alias() {
        let def = PipelineDefinition::from_json_str(
            r#"{"nodes": [], "edges": [{"id": "e1", "source": "a", "target": "j", "targetHandle": "lookup"}]}"#,
        )
        .unwrap();
        assert_eq!(def.edges[0].role.as_deref(), Some("lookup"));
    }

    #[test]
    fn missing_edge_id_is_derived() {
        let def = PipelineDefinition::from_json_str(
            r#"{"nodes": [{"id": "a", "type": "source"}], "edges": [{"source": "a", "target": "b"}]}"#,
        )
        .unwrap();
        assert_eq!(def.edges[0].edge_id().as_str(), "a->b");
        assert!(def.nodes[0].config.is_null());
    }

    #[test]
    fn config_block_overlays_engine_config() {
        let mut cfg = EngineConfig::default();
        PipelineConfig {
            max_parallel_tasks: Some(2),
            default_currency: Some("gbp".into()),
            ..Default::default()
        }
        .apply_to(&mut cfg);
        assert_eq!(cfg.max_parallel_tasks, 2);
        assert_eq!(cfg.default_currency, "GBP");
        assert_eq!(cfg.preview_rows, 50);
    }

    #[test]
    fn hash_is_stable() {
        let src = r#"{"nodes": [{"id": "a", "type": "source", "config": {"entityName": "x"}}]}"#;
        let a = PipelineDefinition::from_json_str(src).unwrap();
        let b = PipelineDefinition::from_json_str(src).unwrap();
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    }
}
