//! Filter stage: keep rows that pass a flat condition group.

use std::sync::Arc;

use tabflow_core::dag::FilterConfig;
use tabflow_core::diagnostics::Diagnostics;
use tabflow_core::table::Table;

use crate::condition::ConditionGroup;
use crate::traits::{expect_inputs, OpError, Stage, StageContext, StageOutput};

#[derive(Debug, Clone)]
pub struct Filter {
    group: ConditionGroup,
}

impl Filter {
    pub fn new(cfg: &FilterConfig) -> Result<Self, OpError> {
        Ok(Self {
            group: ConditionGroup::compile(cfg.operator, &cfg.conditions)?,
        })
    }
}

impl Stage for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn eval(&self, inputs: &[Arc<Table>], _ctx: &StageContext<'_>) -> Result<StageOutput, OpError> {
        let input = &expect_inputs(self.name(), inputs, 1)?[0];

        // No conditions: pass through
        if self.group.is_empty() {
            return Ok(StageOutput::shared(Arc::clone(input)));
        }

        let mut diagnostics = Diagnostics::new();
        let rows = input
            .rows()
            .iter()
            .filter(|row| self.group.matches(row, &mut diagnostics))
            .cloned()
            .collect();
        Ok(StageOutput::new(
            Table::new(input.columns().to_vec(), rows),
            diagnostics,
        ))
    }
}
