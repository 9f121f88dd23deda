//! Pivot stage: spread one column's declared values into output columns.

use std::collections::HashMap;
use std::sync::Arc;

use tabflow_core::dag::{AggFunction, PivotConfig};
use tabflow_core::diagnostics::{DiagnosticKind, Diagnostics};
use tabflow_core::table::{Row, Table};
use tabflow_core::types::Scalar;

use crate::accum::Accumulator;
use crate::group::Groups;
use crate::traits::{expect_inputs, OpError, Stage, StageContext, StageOutput};

#[derive(Debug, Clone)]
pub struct Pivot {
    row_groups: Vec<String>,
    pivot_col: String,
    value_col: String,
    function: AggFunction,
    values: Vec<String>,
    /// pivot value text -> position in `values`
    slots: HashMap<String, usize>,
}

impl Pivot {
    pub fn new(cfg: &PivotConfig) -> Result<Self, OpError> {
        let pivot_col = cfg.pivot_col.trim().to_string();
        let value_col = cfg.value_col.trim().to_string();
        if pivot_col.is_empty() {
            return Err(OpError::Config("pivot is missing pivotCol".into()));
        }
        if value_col.is_empty() {
            return Err(OpError::Config("pivot is missing valueCol".into()));
        }
        if cfg.pivot_values.is_empty() {
            return Err(OpError::Config("pivot declares no pivotValues".into()));
        }
        let row_groups: Vec<String> = cfg
            .row_group_cols
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        let mut slots = HashMap::with_capacity(cfg.pivot_values.len());
        for (idx, v) in cfg.pivot_values.iter().enumerate() {
            if v.is_empty() {
                return Err(OpError::Config("pivot value must not be empty".into()));
            }
            if row_groups.contains(v) {
                return Err(OpError::Config(format!(
                    "pivot value '{v}' collides with a row group column"
                )));
            }
            if slots.insert(v.clone(), idx).is_some() {
                return Err(OpError::Config(format!("duplicate pivot value '{v}'")));
            }
        }
        Ok(Self {
            row_groups,
            pivot_col,
            value_col,
            function: cfg.agg_function,
            values: cfg.pivot_values.clone(),
            slots,
        })
    }
}

impl Stage for Pivot {
    fn name(&self) -> &'static str {
        "pivot"
    }

    fn eval(&self, inputs: &[Arc<Table>], _ctx: &StageContext<'_>) -> Result<StageOutput, OpError> {
        let input = &expect_inputs(self.name(), inputs, 1)?[0];
        let width = self.values.len();

        let mut groups = Groups::new();
        for row in input.rows() {
            let cells: &mut Vec<Option<Accumulator>> =
                groups.entry(row, &self.row_groups, || vec![None; width]);
            let header = row.value(&self.pivot_col).to_text();
            if let Some(&slot) = self.slots.get(&header) {
                cells[slot]
                    .get_or_insert_with(|| Accumulator::new(self.function))
                    .update(row.value(&self.value_col));
            }
        }

        let mut diagnostics = Diagnostics::new();
        let rows = groups
            .into_groups()
            .into_iter()
            .map(|(first, cells)| {
                let mut out = Row::new();
                for c in &self.row_groups {
                    out.insert(c.clone(), first.value(c).clone());
                }
                for (header, cell) in self.values.iter().zip(cells) {
                    let value = match cell {
                        None => Scalar::Null,
                        Some(acc) => acc.finish().unwrap_or_else(|_| {
                            diagnostics.record(DiagnosticKind::TypeMismatch);
                            Scalar::Null
                        }),
                    };
                    out.insert(header.clone(), value);
                }
                out
            })
            .collect();

        let columns = self
            .row_groups
            .iter()
            .chain(&self.values)
            .cloned()
            .collect();
        Ok(StageOutput::new(Table::new(columns, rows), diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{run, table};
    use serde_json::json;

    fn cfg(function: AggFunction, values: &[&str]) -> PivotConfig {
        PivotConfig {
            row_group_cols: vec!["store".into()],
            pivot_col: "month".into(),
            value_col: "sales".into(),
            agg_function: function,
            pivot_values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn sales() -> Arc<Table> {
        table(&[
            json!({"store": "A", "month": "Jan", "sales": 10}),
            json!({"store": "A", "month": "Feb", "sales": 4}),
            json!({"store": "A", "month": "Jan", "sales": 1}),
            json!({"store": "B", "month": "Mar", "sales": 9}),
        ])
    }

    #[test]
    fn sums_declared_values_only() {
        let out = run(&Pivot::new(&cfg(AggFunction::Sum, &["Jan", "Feb"])).unwrap(), &[sales()]);
        assert_eq!(out.table.to_json_rows(), vec![
            json!({"store": "A", "Jan": 11.0, "Feb": 4.0}),
            json!({"store": "B", "Jan": null, "Feb": null}),
        ]);
    }

    #[test]
    fn empty_combination_count_is_null() {
        let out = run(&Pivot::new(&cfg(AggFunction::Count, &["Jan", "Mar"])).unwrap(), &[sales()]);
        let b = &out.table.rows()[1];
        assert_eq!(b.value("Jan"), &Scalar::Null);
        assert_eq!(b.value("Mar"), &Scalar::Number(1.0));
    }

    #[test]
    fn numeric_pivot_column_matches_by_text() {
        let input = table(&[json!({"store": "A", "month": 1, "sales": 3})]);
        let out = run(&Pivot::new(&cfg(AggFunction::Sum, &["1"])).unwrap(), &[input]);
        assert_eq!(out.table.rows()[0].value("1"), &Scalar::Number(3.0));
    }

    #[test]
    fn config_errors() {
        assert!(Pivot::new(&cfg(AggFunction::Sum, &[])).is_err());
        assert!(Pivot::new(&cfg(AggFunction::Sum, &["Jan", "Jan"])).is_err());
        assert!(Pivot::new(&cfg(AggFunction::Sum, &["store"])).is_err());
        let mut c = cfg(AggFunction::Sum, &["Jan"]);
        c.value_col.clear();
        assert!(Pivot::new(&c).is_err());
    }
}
