use rust_xlsxwriter::{Workbook as XlsxWorkbook, Worksheet};
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table as TextTable, Tabled};

use crate::error::{ReconError, Result};
use crate::types::{Cell, Table};

/// Write named sheets into a new workbook at `path`, in the given order.
pub fn write_workbook(path: &Path, sheets: &[(String, &Table)]) -> Result<()> {
    let mut workbook = XlsxWorkbook::new();
    for (name, table) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name)?;
        write_sheet(worksheet, name, table)?;
    }
    workbook.save(path)?;
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, name: &str, table: &Table) -> Result<()> {
    let too_large = || ReconError::SheetTooLarge {
        sheet: name.to_string(),
        rows: table.len() + 1,
        cols: table.headers.len(),
    };
    for (c, header) in table.headers.iter().enumerate() {
        let col = u16::try_from(c).map_err(|_| too_large())?;
        worksheet.write_string(0, col, header)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let row_num = u32::try_from(r + 1).map_err(|_| too_large())?;
        for (c, cell) in row.iter().enumerate() {
            let col = u16::try_from(c).map_err(|_| too_large())?;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    worksheet.write_string(row_num, col, s)?;
                }
                Cell::Number(n) if n.is_finite() => {
                    worksheet.write_number(row_num, col, *n)?;
                }
                Cell::Number(_) => {}
                Cell::Bool(b) => {
                    worksheet.write_boolean(row_num, col, *b)?;
                }
            }
        }
    }
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Render the first `max_rows` rows as a markdown table for the console.
pub fn render_table_rows<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        return "(no rows)\n\n".to_string();
    }
    let table_str = TextTable::new(slice).with(Style::markdown()).to_string();
    format!("{}\n\n", table_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_workbook;
    use crate::types::tests::table;

    #[test]
    fn sheets_round_trip_through_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let mut ledger = table(&["Month", "Total"], &[&["NOV 2025", "-118"]]);
        ledger.push_row(vec![]);
        ledger.push_row(vec![Cell::text("True"), Cell::Bool(false)]);
        let other = table(&["A"], &[]);

        write_workbook(
            &path,
            &[("NOV 2025 GSTR1 LEAF HR".to_string(), &ledger), ("SUMMARY_PIVOT".to_string(), &other)],
        )
        .unwrap();

        let wb = load_workbook(&path).unwrap();
        assert_eq!(wb.sheet_names(), vec!["NOV 2025 GSTR1 LEAF HR", "SUMMARY_PIVOT"]);
        let hr = wb.sheet("NOV 2025 GSTR1 LEAF HR").unwrap();
        assert_eq!(hr.headers, vec!["Month", "Total"]);
        assert_eq!(hr.rows[0][1], Cell::Number(-118.0));
        assert!(hr.rows[1].iter().all(Cell::is_blank));
        assert_eq!(hr.rows[2][1], Cell::Bool(false));
    }

    #[test]
    fn invalid_sheet_name_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let t = table(&["A"], &[]);
        let err = write_workbook(&dir.path().join("bad.xlsx"), &[("bad[name]".to_string(), &t)]);
        assert!(matches!(err, Err(ReconError::Xlsx(_))));
    }
}
