//! Source stage: pull a table from the catalog.

use std::sync::Arc;

use tabflow_core::dag::{EntityType, SourceConfig};
use tabflow_core::diagnostics::Diagnostics;
use tabflow_core::fetch::FetchRequest;
use tabflow_core::table::Table;

use crate::traits::{expect_inputs, OpError, Stage, StageContext, StageOutput};

#[derive(Debug, Clone)]
pub struct Source {
    request: FetchRequest,
}

impl Source {
    pub fn new(cfg: &SourceConfig) -> Result<Self, OpError> {
        let name = cfg.entity_name.trim();
        if name.is_empty() {
            return Err(OpError::Config("source is missing entityName".into()));
        }
        // Only price lists are versioned; every other entity reads latest.
        let version = match (cfg.entity_type, cfg.pin_version) {
            (EntityType::Pricelists, true) => Some(cfg.version.ok_or_else(|| {
                OpError::Config(format!("price list '{name}' pins a version but none is set"))
            })?),
            _ => None,
        };
        Ok(Self {
            request: FetchRequest {
                entity_type: cfg.entity_type,
                entity_name: name.to_string(),
                version,
                selected_columns: cfg
                    .selected_columns
                    .iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect(),
            },
        })
    }

    pub fn request(&self) -> &FetchRequest {
        &self.request
    }
}

impl Stage for Source {
    fn name(&self) -> &'static str {
        "source"
    }

    fn eval(&self, inputs: &[Arc<Table>], ctx: &StageContext<'_>) -> Result<StageOutput, OpError> {
        expect_inputs(self.name(), inputs, 0)?;
        let table = ctx.fetcher.fetch(&self.request)?;
        Ok(StageOutput::new(
            self.request.apply_selection(table),
            Diagnostics::default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabflow_core::fetch::{FetchError, TableFetcher};

    struct OneTable;

    impl TableFetcher for OneTable {
        fn fetch(&self, req: &FetchRequest) -> Result<Table, FetchError> {
            if req.entity_name != "orders" {
                return Err(FetchError::NotFound {
                    entity_type: req.entity_type,
                    name: req.entity_name.clone(),
                });
            }
            Ok(Table::from_json_rows(&[json!({"id": 1, "amount": 5, "secret": "x"})]).unwrap())
        }
    }

    fn cfg(name: &str, cols: &[&str]) -> SourceConfig {
        SourceConfig {
            entity_name: name.into(),
            selected_columns: cols.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn projects_selected_columns() {
        let stage = Source::new(&cfg("orders", &["id", "region"])).unwrap();
        let out = stage.eval(&[], &StageContext { fetcher: &OneTable }).unwrap();
        assert_eq!(out.table.columns(), &["id".to_string(), "region".to_string()]);
    }

    #[test]
    fn missing_entity_is_fetch_error() {
        let stage = Source::new(&cfg("nope", &[])).unwrap();
        let err = stage.eval(&[], &StageContext { fetcher: &OneTable }).unwrap_err();
        assert!(matches!(err, OpError::Fetch(FetchError::NotFound { .. })));
    }

    #[test]
    fn pinned_price_list_needs_version() {
        let mut c = cfg("EU", &[]);
        c.entity_type = EntityType::Pricelists;
        c.pin_version = true;
        assert!(Source::new(&c).is_err());
        c.version = Some(3);
        assert_eq!(Source::new(&c).unwrap().request().version, Some(3));
    }

    #[test]
    fn datasets_ignore_version() {
        let mut c = cfg("orders", &[]);
        c.pin_version = true;
        c.version = Some(2);
        assert_eq!(Source::new(&c).unwrap().request().version, None);
    }
}
