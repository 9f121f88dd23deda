//! Aggregate stage: group-by with per-group accumulators.

use std::sync::Arc;

use tabflow_core::dag::{AggFunction, AggregateConfig};
use tabflow_core::diagnostics::{DiagnosticKind, Diagnostics};
use tabflow_core::table::{Row, Table};
use tabflow_core::types::Scalar;

use crate::accum::Accumulator;
use crate::group::Groups;
use crate::traits::{expect_inputs, OpError, Stage, StageContext, StageOutput};

#[derive(Debug, Clone)]
struct Measure {
    function: AggFunction,
    column: Option<String>,
    output: String,
}

#[derive(Debug, Clone)]
pub struct Aggregate {
    group_by: Vec<String>,
    measures: Vec<Measure>,
}

impl Aggregate {
    pub fn new(cfg: &AggregateConfig) -> Result<Self, OpError> {
        let group_by: Vec<String> = cfg
            .group_by
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        let mut outputs = group_by.clone();
        let mut measures = Vec::with_capacity(cfg.aggregations.len());
        for spec in &cfg.aggregations {
            let column = Some(spec.column_id.trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            if column.is_none() && spec.function.needs_column() {
                return Err(OpError::Config(format!(
                    "{} aggregation needs a columnId",
                    spec.function.as_str()
                )));
            }
            let output = spec.output_name();
            if outputs.contains(&output) {
                return Err(OpError::Config(format!("duplicate aggregate column '{output}'")));
            }
            outputs.push(output.clone());
            measures.push(Measure {
                function: spec.function,
                column,
                output,
            });
        }
        Ok(Self { group_by, measures })
    }

    fn output_columns(&self) -> Vec<String> {
        self.group_by
            .iter()
            .cloned()
            .chain(self.measures.iter().map(|m| m.output.clone()))
            .collect()
    }
}

impl Stage for Aggregate {
    fn name(&self) -> &'static str {
        "aggregate"
    }

    fn eval(&self, inputs: &[Arc<Table>], _ctx: &StageContext<'_>) -> Result<StageOutput, OpError> {
        let input = &expect_inputs(self.name(), inputs, 1)?[0];

        let mut groups = Groups::new();
        for row in input.rows() {
            let accs = groups.entry(row, &self.group_by, || {
                self.measures
                    .iter()
                    .map(|m| Accumulator::new(m.function))
                    .collect::<Vec<_>>()
            });
            for (acc, m) in accs.iter_mut().zip(&self.measures) {
                match &m.column {
                    Some(c) => acc.update(row.value(c)),
                    None => acc.update(&Scalar::Null),
                }
            }
        }

        let mut diagnostics = Diagnostics::new();
        let rows = groups
            .into_groups()
            .into_iter()
            .map(|(first, accs)| {
                let mut out = Row::new();
                for c in &self.group_by {
                    out.insert(c.clone(), first.value(c).clone());
                }
                for (acc, m) in accs.into_iter().zip(&self.measures) {
                    let value = acc.finish().unwrap_or_else(|_| {
                        diagnostics.record(DiagnosticKind::TypeMismatch);
                        Scalar::Null
                    });
                    out.insert(m.output.clone(), value);
                }
                out
            })
            .collect();

        Ok(StageOutput::new(Table::new(self.output_columns(), rows), diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{run, table};
    use serde_json::json;
    use tabflow_core::dag::AggregationSpec;

    fn spec(function: AggFunction, column: &str, alias: &str) -> AggregationSpec {
        AggregationSpec {
            function,
            column_id: column.into(),
            alias: alias.into(),
            label: String::new(),
        }
    }

    fn sales() -> Arc<Table> {
        table(&[
            json!({"region": "E", "amount": 10}),
            json!({"region": "W", "amount": 5}),
            json!({"region": "E", "amount": 7}),
            json!({"region": null, "amount": 1}),
        ])
    }

    #[test]
    fn groups_in_first_seen_order() {
        let stage = Aggregate::new(&AggregateConfig {
            group_by: vec!["region".into()],
            aggregations: vec![
                spec(AggFunction::Sum, "amount", "total"),
                spec(AggFunction::Count, "", "n"),
            ],
        })
        .unwrap();
        let out = run(&stage, &[sales()]);
        assert_eq!(out.table.to_json_rows(), vec![
            json!({"region": "E", "total": 17.0, "n": 2.0}),
            json!({"region": "W", "total": 5.0, "n": 1.0}),
            json!({"region": null, "total": 1.0, "n": 1.0}),
        ]);
    }

    #[test]
    fn no_group_by_is_one_group() {
        let stage = Aggregate::new(&AggregateConfig {
            group_by: vec![],
            aggregations: vec![spec(AggFunction::Max, "amount", "")],
        })
        .unwrap();
        let out = run(&stage, &[sales()]);
        assert_eq!(out.table.columns(), &["amount".to_string()]);
        assert_eq!(out.table.rows()[0].value("amount"), &Scalar::Number(10.0));
    }

    #[test]
    fn incompatible_sum_is_null_with_diagnostic() {
        let input = table(&[json!({"g": 1, "v": "x"}), json!({"g": 1, "v": 2})]);
        let stage = Aggregate::new(&AggregateConfig {
            group_by: vec!["g".into()],
            aggregations: vec![spec(AggFunction::Sum, "v", "s")],
        })
        .unwrap();
        let out = run(&stage, &[input]);
        assert_eq!(out.table.rows()[0].value("s"), &Scalar::Null);
        assert_eq!(out.diagnostics.count(DiagnosticKind::TypeMismatch), 1);
    }

    #[test]
    fn config_errors() {
        let missing_col = AggregateConfig {
            group_by: vec![],
            aggregations: vec![spec(AggFunction::Sum, "", "s")],
        };
        assert!(Aggregate::new(&missing_col).is_err());
        let dup = AggregateConfig {
            group_by: vec!["region".into()],
            aggregations: vec![spec(AggFunction::Count, "", "region")],
        };
        assert!(Aggregate::new(&dup).is_err());
    }
}
