//! Hash join.
//!
//! The lookup side is built into a hash table keyed by the canonical bytes of
//! its key columns; the primary side probes it row by row, so output order
//! follows the primary table with fan-out in lookup order.

use std::collections::HashMap;
use std::sync::Arc;

use tabflow_core::dag::{JoinConfig, JoinType};
use tabflow_core::diagnostics::Diagnostics;
use tabflow_core::table::{Row, Table};
use tabflow_core::types::Scalar;

use super::COLLISION_PREFIX;
use crate::traits::{expect_inputs, OpError, Stage, StageContext, StageOutput};

#[derive(Debug, Clone)]
pub struct HashJoin {
    join_type: JoinType,
    left_keys: Vec<String>,
    right_keys: Vec<String>,
}

/// Where each lookup column lands in the joined table.
struct Layout {
    columns: Vec<String>,
    /// (lookup column, output column) for every lookup column that is not merged.
    lookup: Vec<(String, String)>,
    /// (primary key column, lookup key column) pairs sharing one output column.
    merged: Vec<(String, String)>,
}

impl HashJoin {
    pub fn new(cfg: &JoinConfig) -> Result<Self, OpError> {
        if cfg.predicates.is_empty() {
            return Err(OpError::Config("join needs at least one predicate".into()));
        }
        let mut left_keys = Vec::with_capacity(cfg.predicates.len());
        let mut right_keys = Vec::with_capacity(cfg.predicates.len());
        for p in &cfg.predicates {
            let (l, r) = (p.left_column.trim(), p.right_column.trim());
            if l.is_empty() || r.is_empty() {
                return Err(OpError::Config("join predicate is missing a column".into()));
            }
            if p.operator.trim() != "==" {
                return Err(OpError::Config(format!(
                    "join predicate {l} {} {r}: only '==' is supported",
                    p.operator.trim()
                )));
            }
            left_keys.push(l.to_string());
            right_keys.push(r.to_string());
        }
        Ok(Self {
            join_type: cfg.join_type,
            left_keys,
            right_keys,
        })
    }

    fn layout(&self, primary: &Table, lookup: &Table) -> Layout {
        let mut columns = primary.columns().to_vec();
        let merged: Vec<(String, String)> = self
            .left_keys
            .iter()
            .zip(&self.right_keys)
            .filter(|(l, r)| l == r)
            .map(|(l, r)| (l.clone(), r.clone()))
            .collect();

        let mut mapped = Vec::new();
        for col in lookup.columns() {
            if merged.iter().any(|(_, r)| r == col) {
                continue;
            }
            let mut out = col.clone();
            while columns.contains(&out) {
                out = format!("{COLLISION_PREFIX}{out}");
            }
            columns.push(out.clone());
            mapped.push((col.clone(), out));
        }
        Layout {
            columns,
            lookup: mapped,
            merged,
        }
    }

    /// Key bytes for `row`, or `None` when any key part is null.
    fn key(row: &Row, columns: &[String]) -> Option<Vec<u8>> {
        let mut key = Vec::new();
        for c in columns {
            let v = row.value(c);
            if v.is_null() {
                return None;
            }
            v.write_key(&mut key);
        }
        Some(key)
    }
}

impl Stage for HashJoin {
    fn name(&self) -> &'static str {
        "join"
    }

    fn eval(&self, inputs: &[Arc<Table>], _ctx: &StageContext<'_>) -> Result<StageOutput, OpError> {
        let inputs = expect_inputs(self.name(), inputs, 2)?;
        let (primary, lookup) = (&inputs[0], &inputs[1]);
        let layout = self.layout(primary, lookup);

        let mut build: HashMap<Vec<u8>, Vec<usize>> = HashMap::new();
        for (idx, row) in lookup.rows().iter().enumerate() {
            if let Some(key) = Self::key(row, &self.right_keys) {
                build.entry(key).or_default().push(idx);
            }
        }

        let mut matched = vec![false; lookup.num_rows()];
        let mut rows = Vec::with_capacity(primary.num_rows());
        for prow in primary.rows() {
            let hits = Self::key(prow, &self.left_keys).and_then(|k| build.get(&k));
            match hits {
                Some(hits) => {
                    for &idx in hits {
                        matched[idx] = true;
                        rows.push(combine(&layout, primary, Some(prow), Some(&lookup.rows()[idx])));
                    }
                }
                None if self.join_type == JoinType::Inner => {}
                None => rows.push(combine(&layout, primary, Some(prow), None)),
            }
        }

        if self.join_type == JoinType::Full {
            for (idx, lrow) in lookup.rows().iter().enumerate() {
                if !matched[idx] {
                    rows.push(combine(&layout, primary, None, Some(lrow)));
                }
            }
        }

        Ok(StageOutput::new(
            Table::new(layout.columns, rows),
            Diagnostics::default(),
        ))
    }
}

fn combine(layout: &Layout, primary: &Table, prow: Option<&Row>, lrow: Option<&Row>) -> Row {
    let mut out = Row::new();
    for c in primary.columns() {
        let v = prow.map(|r| r.value(c).clone()).unwrap_or(Scalar::Null);
        out.insert(c.clone(), v);
    }
    if prow.is_none() {
        if let Some(lrow) = lrow {
            for (l, r) in &layout.merged {
                out.insert(l.clone(), lrow.value(r).clone());
            }
        }
    }
    for (src, dst) in &layout.lookup {
        let v = lrow.map(|r| r.value(src).clone()).unwrap_or(Scalar::Null);
        out.insert(dst.clone(), v);
    }
    out
}
