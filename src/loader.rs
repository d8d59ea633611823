use calamine::{open_workbook_auto, Data, Range, Reader};
use csv::ReaderBuilder;
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{ReconError, Result};
use crate::types::{Cell, Sheet, Table, Workbook};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Load the current-month table: a CSV file or the first sheet of a workbook.
pub fn load_table(path: &Path) -> Result<Table> {
    if is_csv(path) {
        let bytes = std::fs::read(path)?;
        return read_csv(&bytes);
    }
    let workbook = load_workbook(path)?;
    workbook
        .sheets
        .into_iter()
        .next()
        .map(|s| s.table)
        .ok_or_else(|| ReconError::Input {
            path: path.to_path_buf(),
            message: "workbook has no sheets".to_string(),
        })
}

/// Load every sheet of a workbook. A CSV file has no sheets to select from
/// and yields an empty workbook.
pub fn load_workbook(path: &Path) -> Result<Workbook> {
    if is_csv(path) {
        warn!(path = %path.display(), "previous month is a CSV file, no sheets to read returns from");
        return Ok(Workbook::default());
    }
    let mut workbook = open_workbook_auto(path)?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let table = range_to_table(&range);
        debug!(sheet = %name, rows = table.len(), "loaded sheet");
        sheets.push(Sheet { name, table });
    }
    Ok(Workbook { sheets })
}

/// Decode CSV bytes as UTF-8, falling back to Windows-1252 for exports saved
/// by older spreadsheet tools.
fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            debug!("input is not UTF-8, decoding as Windows-1252");
            encoding_rs::WINDOWS_1252.decode(bytes).0
        }
    }
}

pub fn read_csv(bytes: &[u8]) -> Result<Table> {
    let text = decode(bytes);
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(text.as_bytes());
    let headers = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| header_name(h, i))
        .collect();
    let mut table = Table::new(headers);
    for result in rdr.records() {
        let record = result?;
        table.push_row(record.iter().map(infer_cell).collect());
    }
    Ok(table)
}

fn header_name(raw: &str, idx: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("Unnamed_{}", idx)
    } else {
        trimmed.to_string()
    }
}

/// Type a CSV field the way a spreadsheet would: numbers and booleans become
/// typed cells, `NaN` and blanks become empty.
fn infer_cell(raw: &str) -> Cell {
    let s = raw.trim();
    if s.is_empty() {
        return Cell::Empty;
    }
    if s.eq_ignore_ascii_case("true") {
        return Cell::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Cell::Bool(false);
    }
    match s.parse::<f64>() {
        Ok(n) if n.is_finite() => Cell::Number(n),
        Ok(n) if n.is_nan() => Cell::Empty,
        _ => Cell::Text(raw.to_string()),
    }
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) => Cell::Text(d.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

fn range_to_table(range: &Range<Data>) -> Table {
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Table::default();
    };
    let headers = header_row
        .iter()
        .enumerate()
        .map(|(i, d)| header_name(&data_to_cell(d).as_text(), i))
        .collect();
    let mut table = Table::new(headers);
    for row in rows {
        table.push_row(row.iter().map(data_to_cell).collect());
    }
    table
}
