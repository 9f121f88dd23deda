//! CSV writer. Cells use their textual form; null is an empty field.

use std::io::Write;

use tabflow_core::table::Table;

use crate::error::Result;

pub struct CsvWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(writer),
        }
    }

    pub fn write_table(mut self, table: &Table) -> Result<()> {
        self.writer.write_record(table.columns())?;
        for row in table.rows() {
            self.writer
                .write_record(table.columns().iter().map(|c| row.value(c).to_text()))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabflow_core::table::Row;
    use tabflow_core::types::Scalar;

    #[test]
    fn writes_header_and_text_cells() {
        let rows: Vec<Row> = vec![
            [("id", Scalar::Number(1.0)), ("name", Scalar::text("a,b"))]
                .into_iter()
                .collect(),
            [("id", Scalar::Number(2.0))].into_iter().collect(),
        ];
        let table = Table::new(vec!["id".into(), "name".into()], rows);
        let mut buf = Vec::new();
        CsvWriter::to_writer(&mut buf).write_table(&table).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "id,name\n1,\"a,b\"\n2,\n");
    }
}
