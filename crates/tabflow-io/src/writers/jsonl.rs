//! NDJSON writer.

use std::io::{BufWriter, Write};

use tabflow_core::table::Table;

use crate::error::Result;

pub struct JsonlWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> JsonlWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// One JSON object per row, keys in table column order.
    pub fn write_table(mut self, table: &Table) -> Result<()> {
        for row in table.rows() {
            let obj: serde_json::Map<String, serde_json::Value> = table
                .columns()
                .iter()
                .map(|c| (c.clone(), row.value(c).to_json()))
                .collect();
            serde_json::to_writer(&mut self.writer, &obj)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
