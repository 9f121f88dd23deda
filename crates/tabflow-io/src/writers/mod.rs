//! Writers that materialise a whole `Table`.

pub mod csv;
pub mod jsonl;

use std::fs::{self, File};
use std::path::Path;

use tabflow_core::table::Table;

use crate::error::{IoError, Result};

/// Write `table` to `path`, choosing the format by file extension.
pub fn write_path(path: &Path, table: &Table) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => csv::CsvWriter::to_writer(File::create(path)?).write_table(table),
        "jsonl" | "ndjson" => jsonl::JsonlWriter::to_writer(File::create(path)?).write_table(table),
        other => Err(IoError::Format(format!(
            "{} (extension '{other}')",
            path.display()
        ))),
    }
}
