//! Immutable row tables passed between stages.
//!
//! A `Table` declares an ordered column set; rows are sparse maps and may omit
//! columns (a missing cell reads as null). Stages never mutate a table they
//! received; they build a new one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Scalar;

static NULL: Scalar = Scalar::Null;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, Scalar>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.0.get(column)
    }

    /// Cell value, with missing columns reading as null.
    pub fn value(&self, column: &str) -> &Scalar {
        self.0.get(column).unwrap_or(&NULL)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Scalar) {
        self.0.insert(column.into(), value);
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.0.iter()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let obj: serde_json::Map<String, serde_json::Value> = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(obj)
    }
}

impl<K: Into<String>> FromIterator<(K, Scalar)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Scalar)>>(iter: I) -> Self {
        Row(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table from a declared column order and rows.
    ///
    /// Columns present in rows but not declared are appended in first-seen
    /// order so the column set always covers every stored cell.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let mut declared = Vec::with_capacity(columns.len());
        for c in columns {
            if !declared.contains(&c) {
                declared.push(c);
            }
        }
        for row in &rows {
            for (name, _) in row.iter() {
                if !declared.iter().any(|c| c == name) {
                    declared.push(name.clone());
                }
            }
        }
        Self {
            columns: declared,
            rows,
        }
    }

    pub fn empty(columns: Vec<String>) -> Self {
        Self::new(columns, Vec::new())
    }

    /// Build a table whose column set is inferred from the rows.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self::new(Vec::new(), rows)
    }

    /// Build a table from JSON objects (one per row).
    pub fn from_json_rows(values: &[serde_json::Value]) -> Result<Self> {
        let mut columns = Vec::new();
        let mut rows = Vec::with_capacity(values.len());
        for (idx, value) in values.iter().enumerate() {
            let obj = value
                .as_object()
                .ok_or_else(|| Error::Table(format!("row {idx} is not a JSON object")))?;
            let mut row = Row::new();
            for (k, v) in obj {
                if !columns.contains(k) {
                    columns.push(k.clone());
                }
                row.insert(k.clone(), Scalar::from_json(v));
            }
            rows.push(row);
        }
        Ok(Self::new(columns, rows))
    }

    pub fn to_json_rows(&self) -> Vec<serde_json::Value> {
        self.rows.iter().map(Row::to_json).collect()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Scalar> + 'a {
        self.rows.iter().map(move |r| r.value(name))
    }

    /// Project to exactly `columns`: missing columns become null, extras drop.
    pub fn project(&self, columns: &[String]) -> Table {
        let rows = self
            .rows
            .iter()
            .map(|r| {
                columns
                    .iter()
                    .map(|c| (c.clone(), r.value(c).clone()))
                    .collect::<Row>()
            })
            .collect();
        Table::new(columns.to_vec(), rows)
    }

    /// First `n` rows, same column set.
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Row>) {
        (self.columns, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_cells_read_as_null() {
        let row: Row = [("a", Scalar::Number(1.0))].into_iter().collect();
        assert_eq!(row.value("b"), &Scalar::Null);
        assert!(!row.contains("b"));
    }

    #[test]
    fn new_appends_undeclared_columns() {
        let row: Row = [("b", Scalar::Null), ("a", Scalar::Null)].into_iter().collect();
        let t = Table::new(vec!["b".into()], vec![row]);
        assert_eq!(t.columns(), &["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn project_fills_and_drops() {
        let t = Table::from_json_rows(&[json!({"id": 1, "name": "x"})]).unwrap();
        let p = t.project(&["id".to_string(), "region".to_string()]);
        assert_eq!(p.columns(), &["id".to_string(), "region".to_string()]);
        assert_eq!(p.rows()[0].get("region"), Some(&Scalar::Null));
        assert!(!p.rows()[0].contains("name"));
    }

    #[test]
    fn from_json_rows_rejects_non_objects() {
        assert!(Table::from_json_rows(&[json!([1, 2])]).is_err());
    }
}
