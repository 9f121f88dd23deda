//! Readers that load a whole file into a `Table`.
//!
//! Tables are small enough to hold in memory. Text cells from CSV are typed
//! with `Scalar::infer`; JSON cells keep their JSON type (money and
//! percentage objects included).

pub mod csv;
pub mod jsonl;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tabflow_core::table::Table;

use crate::error::{IoError, Result};

/// File extensions the readers understand, in lookup priority order.
pub const EXTENSIONS: [&str; 3] = ["csv", "jsonl", "json"];

/// Read `path`, choosing the reader by file extension.
pub fn read_path(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let file = BufReader::new(File::open(path)?);
    match ext.as_str() {
        "csv" => csv::read_csv(file),
        "jsonl" | "ndjson" => jsonl::read_jsonl(file),
        "json" => jsonl::read_json_array(file),
        other => Err(IoError::Format(format!(
            "{} (extension '{other}')",
            path.display()
        ))),
    }
}
