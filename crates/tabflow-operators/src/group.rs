//! Grouping rows by a tuple of column values, in first-seen order.

use std::collections::HashMap;

use tabflow_core::table::Row;

/// Canonical key bytes for `row` over `columns`. Null is a valid key part.
pub fn key_of(row: &Row, columns: &[String]) -> Vec<u8> {
    let mut key = Vec::with_capacity(columns.len() * 10);
    for c in columns {
        row.value(c).write_key(&mut key);
    }
    key
}

/// Rows partitioned by key; groups keep the order their first row appeared.
#[derive(Debug, Default)]
pub struct Groups<'a, S> {
    index: HashMap<Vec<u8>, usize>,
    groups: Vec<(&'a Row, S)>,
}

impl<'a, S> Groups<'a, S> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    /// State for the group `row` belongs to, creating it with `init` if new.
    pub fn entry(&mut self, row: &'a Row, columns: &[String], init: impl FnOnce() -> S) -> &mut S {
        let key = key_of(row, columns);
        let idx = match self.index.get(&key) {
            Some(idx) => *idx,
            None => {
                let idx = self.groups.len();
                self.index.insert(key, idx);
                self.groups.push((row, init()));
                idx
            }
        };
        &mut self.groups[idx].1
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in first-seen order with the first row of each group.
    pub fn into_groups(self) -> Vec<(&'a Row, S)> {
        self.groups
    }
}
