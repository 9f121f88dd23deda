//! Formula stage: computed columns.
//!
//! Every field is evaluated against the input row as it arrived, so fields in
//! one stage cannot see each other's results. Chain stages for that.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tabflow_core::dag::FormulaConfig;
use tabflow_core::diagnostics::Diagnostics;
use tabflow_core::table::{Row, Table};
use tabflow_core::types::DataType;

use crate::expr::{self, evaluate, Expr};
use crate::traits::{expect_inputs, OpError, Stage, StageContext, StageOutput};

#[derive(Debug, Clone)]
struct Field {
    column: String,
    expr: Expr,
    declared: DataType,
}

#[derive(Debug, Clone)]
pub struct Formula {
    fields: Vec<Field>,
    default_currency: String,
}

impl Formula {
    /// Compile every field. A plain number stored into money declared without
    /// a currency takes `default_currency`.
    pub fn new(cfg: &FormulaConfig, default_currency: &str) -> Result<Self, OpError> {
        let mut fields: Vec<Field> = Vec::with_capacity(cfg.fields.len());
        for (idx, f) in cfg.fields.iter().enumerate() {
            let column = f
                .column_name()
                .ok_or_else(|| OpError::Config(format!("formula field {idx} has no name or label")))?
                .to_string();
            if fields.iter().any(|existing| existing.column == column) {
                return Err(OpError::Config(format!("duplicate formula column '{column}'")));
            }
            let expr = expr::parse(&f.formula)
                .map_err(|e| OpError::Config(format!("formula '{column}': {e}")))?;
            fields.push(Field {
                column,
                expr,
                declared: f.datatype.to_data_type(),
            });
        }
        Ok(Self {
            fields,
            default_currency: default_currency.to_string(),
        })
    }
}

impl Stage for Formula {
    fn name(&self) -> &'static str {
        "formula"
    }

    fn eval(&self, inputs: &[Arc<Table>], _ctx: &StageContext<'_>) -> Result<StageOutput, OpError> {
        let input = &expect_inputs(self.name(), inputs, 1)?[0];
        if self.fields.is_empty() {
            return Ok(StageOutput::shared(Arc::clone(input)));
        }

        let known: HashSet<String> = input.columns().iter().cloned().collect();
        let mut columns = input.columns().to_vec();
        for f in &self.fields {
            if !known.contains(&f.column) {
                columns.push(f.column.clone());
            }
        }

        // Counts rows affected per kind, not failing cells.
        let mut diagnostics = Diagnostics::new();
        let rows: Vec<Row> = input
            .rows()
            .iter()
            .map(|row| {
                let mut out = row.clone();
                let mut issues = BTreeSet::new();
                for f in &self.fields {
                    let result = evaluate(&f.expr, row, &known, &f.declared, &self.default_currency);
                    issues.extend(result.issue);
                    out.insert(f.column.clone(), result.value);
                }
                issues.into_iter().for_each(|kind| diagnostics.record(kind));
                out
            })
            .collect();

        Ok(StageOutput::new(Table::new(columns, rows), diagnostics))
    }
}
