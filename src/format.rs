use crate::types::{col, Cell, Table};

const NUMERIC_COLUMNS: [&str; 3] = [col::TOTAL, col::TAXABLE_AMOUNT, col::LINEITEM_QUANTITY];

/// Columns whose 0/1 values are real numbers, not flags.
const NUMERIC_NAME_MARKERS: [&str; 3] = ["quantity", "amount", "price"];

#[derive(Debug, PartialEq)]
enum Flavor {
    Boolean,
    ZeroOne,
    Other,
}

fn column_flavor(table: &Table, idx: usize) -> Flavor {
    let mut all_bool = true;
    let mut any = false;
    for row in &table.rows {
        match &row[idx] {
            Cell::Empty => continue,
            Cell::Bool(_) => {}
            Cell::Number(n) if *n == 0.0 || *n == 1.0 => all_bool = false,
            Cell::Number(_) | Cell::Text(_) => return Flavor::Other,
        }
        any = true;
    }
    match (any, all_bool) {
        (false, _) => Flavor::Other,
        (true, true) => Flavor::Boolean,
        (true, false) => Flavor::ZeroOne,
    }
}

fn truthy(cell: &Cell) -> Cell {
    match cell {
        Cell::Bool(true) => Cell::text("True"),
        Cell::Bool(false) => Cell::text("False"),
        Cell::Number(n) if *n == 1.0 => Cell::text("True"),
        Cell::Number(n) if *n == 0.0 => Cell::text("False"),
        other => other.clone(),
    }
}

/// Prepare a ledger for the spreadsheet writer.
///
/// Numeric columns are re-coerced, with unparsable values left empty rather
/// than zero. Boolean columns, and 0/1 columns not named like a quantity,
/// amount or price, are spelled out as `True`/`False`. The transient
/// warehouse tag is dropped.
pub fn finalize(mut table: Table) -> Table {
    for name in NUMERIC_COLUMNS {
        table.map_column(name, |c| c.to_number().map(Cell::Number).unwrap_or(Cell::Empty));
    }

    for idx in 0..table.headers.len() {
        let lower = table.headers[idx].to_lowercase();
        let convert = match column_flavor(&table, idx) {
            Flavor::Boolean => true,
            Flavor::ZeroOne => !NUMERIC_NAME_MARKERS.iter().any(|m| lower.contains(m)),
            Flavor::Other => false,
        };
        if convert {
            for row in &mut table.rows {
                row[idx] = truthy(&row[idx]);
            }
        }
    }

    table.drop_columns_where(|h| h == col::SOURCE_WAREHOUSE);
    table
}
