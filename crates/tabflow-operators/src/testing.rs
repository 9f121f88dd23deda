//! Shared fixtures for stage unit tests.

use std::sync::Arc;

use tabflow_core::fetch::{FetchError, FetchRequest, TableFetcher};
use tabflow_core::table::Table;

use crate::traits::{Stage, StageContext, StageOutput};

pub(crate) struct NoFetch;

impl TableFetcher for NoFetch {
    fn fetch(&self, r: &FetchRequest) -> Result<Table, FetchError> {
        Err(FetchError::NotFound {
            entity_type: r.entity_type,
            name: r.entity_name.clone(),
        })
    }
}

pub(crate) fn table(rows: &[serde_json::Value]) -> Arc<Table> {
    Arc::new(Table::from_json_rows(rows).expect("fixture rows are objects"))
}

pub(crate) fn run(stage: &dyn Stage, inputs: &[Arc<Table>]) -> StageOutput {
    stage
        .eval(inputs, &StageContext { fetcher: &NoFetch })
        .expect("stage evaluates")
}
