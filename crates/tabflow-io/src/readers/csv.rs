use std::io::Read;

use tabflow_core::table::{Row, Table};
use tabflow_core::types::Scalar;

use crate::error::Result;

/// Read a headered CSV document. Every cell is typed with `Scalar::infer`.
pub fn read_csv<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, cell)| (h.as_str(), Scalar::infer(cell)))
            .collect();
        rows.push(row);
    }
    Ok(Table::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabflow_core::types::parse_date;

    #[test]
    fn infers_cell_types() {
        let data = "id,region,amount,day,active\n1,E,10.5,2024-01-02,true\n2,,7,,false\n";
        let t = read_csv(data.as_bytes()).unwrap();
        assert_eq!(t.columns().len(), 5);
        let r0 = &t.rows()[0];
        assert_eq!(r0.value("amount"), &Scalar::Number(10.5));
        assert_eq!(r0.value("day"), &Scalar::Date(parse_date("2024-01-02").unwrap()));
        assert_eq!(r0.value("active"), &Scalar::Bool(true));
        assert_eq!(t.rows()[1].value("region"), &Scalar::Null);
    }

    #[test]
    fn short_records_leave_cells_missing() {
        let t = read_csv("a,b\n1\n".as_bytes()).unwrap();
        assert!(!t.rows()[0].contains("b"));
        assert_eq!(t.rows()[0].value("b"), &Scalar::Null);
    }
}
