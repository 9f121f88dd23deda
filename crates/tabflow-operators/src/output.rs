//! Output stage: marks the pipeline's result; passes its input through.

use std::sync::Arc;

use tabflow_core::dag::OutputConfig;
use tabflow_core::table::Table;

use crate::traits::{expect_inputs, OpError, Stage, StageContext, StageOutput};

#[derive(Debug, Clone, Default)]
pub struct Output {
    pub label: Option<String>,
}

impl Output {
    pub fn new(cfg: &OutputConfig) -> Self {
        Self {
            label: cfg
                .output_label
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        }
    }
}

impl Stage for Output {
    fn name(&self) -> &'static str {
        "output"
    }

    fn eval(&self, inputs: &[Arc<Table>], _ctx: &StageContext<'_>) -> Result<StageOutput, OpError> {
        let input = &expect_inputs(self.name(), inputs, 1)?[0];
        Ok(StageOutput::shared(Arc::clone(input)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{run, table};
    use serde_json::json;

    #[test]
    fn passes_the_same_table_through() {
        let input = table(&[json!({"a": 1})]);
        let out = run(&Output::default(), &[Arc::clone(&input)]);
        assert!(Arc::ptr_eq(&input, &out.table));
    }

    #[test]
    fn blank_label_is_none() {
        let o = Output::new(&OutputConfig {
            output_label: Some("  ".into()),
        });
        assert_eq!(o.label, None);
    }
}
