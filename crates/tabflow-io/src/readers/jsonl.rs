use std::io::{BufRead, Read};

use tabflow_core::table::Table;

use crate::error::{IoError, Result};

/// Read newline-delimited JSON objects. Blank lines are skipped.
pub fn read_jsonl<R: BufRead>(reader: R) -> Result<Table> {
    let mut values = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        values.push(serde_json::from_str::<serde_json::Value>(&line)?);
    }
    Ok(Table::from_json_rows(&values)?)
}

/// Read a JSON document whose top level is an array of objects.
pub fn read_json_array<R: Read>(reader: R) -> Result<Table> {
    match serde_json::from_reader::<_, serde_json::Value>(reader)? {
        serde_json::Value::Array(values) => Ok(Table::from_json_rows(&values)?),
        _ => Err(IoError::Format("expected a JSON array of row objects".into())),
    }
}
