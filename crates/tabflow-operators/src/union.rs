//! Union stage: concatenate inputs in slot order.

use std::sync::Arc;

use tabflow_core::diagnostics::Diagnostics;
use tabflow_core::table::Table;

use crate::traits::{OpError, Stage, StageContext, StageOutput};

#[derive(Debug, Clone, Default)]
pub struct Union;

impl Stage for Union {
    fn name(&self) -> &'static str {
        "union"
    }

    fn eval(&self, inputs: &[Arc<Table>], _ctx: &StageContext<'_>) -> Result<StageOutput, OpError> {
        if inputs.len() < 2 {
            return Err(OpError::Exec(format!(
                "union expects at least 2 inputs, got {}",
                inputs.len()
            )));
        }
        let mut columns: Vec<String> = Vec::new();
        for t in inputs {
            for c in t.columns() {
                if !columns.contains(c) {
                    columns.push(c.clone());
                }
            }
        }
        let rows = inputs
            .iter()
            .flat_map(|t| t.project(&columns).into_parts().1)
            .collect();
        Ok(StageOutput::new(Table::new(columns, rows), Diagnostics::default()))
    }
}
