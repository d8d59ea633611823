use serde::Serialize;
use std::fmt;
use tabled::Tabled;

use crate::util::format_number;

/// Canonical column names produced by the column normalizer.
pub mod col {
    pub const COURIER_STATUS: &str = "Courier_Status";
    pub const PICKUP_LOCATION: &str = "Pickup_Location";
    pub const TOTAL: &str = "Total";
    pub const TAXABLE_AMOUNT: &str = "Taxable_Amount";
    pub const LINEITEM_NAME: &str = "Lineitem_name";
    pub const LINEITEM_QUANTITY: &str = "Lineitem_quantity";
    pub const UPDATED_STATUS: &str = "Updated_Status";
    pub const SHIPPING_PROVINCE: &str = "Shipping_Province";
    pub const HSN: &str = "HSN";
    pub const MONTH: &str = "Month";
    pub const SOURCE_WAREHOUSE: &str = "Source_Warehouse";
}

/// A single spreadsheet value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Empty cells and whitespace-only text both count as blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) | Cell::Bool(_) => false,
        }
    }

    /// Display form used for string comparisons (status, location, province).
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => format!("{}", n),
            Cell::Bool(true) => "True".to_string(),
            Cell::Bool(false) => "False".to_string(),
        }
    }

    /// Numeric coercion. `None` means the value is missing or not a number;
    /// callers pick their own default.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => crate::util::parse_f64_safe(Some(s)),
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Number(_) => None,
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        }
    }
}

/// An in-memory sheet: ordered headers plus rows that are always exactly
/// `headers.len()` cells wide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Table { headers, rows: Vec::new() }
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of one column, or `None` when the column is absent.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    /// Replace a column in place, or append it when absent.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.column_index(name) {
            Some(idx) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
    }

    /// Apply `f` to every cell of a column. Missing columns are left alone.
    pub fn map_column(&mut self, name: &str, f: impl Fn(&Cell) -> Cell) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        true
    }

    pub fn drop_columns_where(&mut self, pred: impl Fn(&str) -> bool) {
        let keep: Vec<bool> = self.headers.iter().map(|h| !pred(h)).collect();
        self.retain_columns(&keep);
    }

    /// Keep only columns whose flag is `true`.
    pub fn retain_columns(&mut self, keep: &[bool]) {
        let mut flags = keep.iter();
        self.headers.retain(|_| *flags.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
    }

    pub fn move_column_first(&mut self, name: &str) {
        if let Some(idx) = self.column_index(name) {
            let h = self.headers.remove(idx);
            self.headers.insert(0, h);
            for row in &mut self.rows {
                let c = row.remove(idx);
                row.insert(0, c);
            }
        }
    }

    /// A table with the same headers and only the rows at `indices`.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            headers: self.headers.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    pub fn filter_rows(&self, pred: impl Fn(&[Cell]) -> bool) -> Table {
        Table {
            headers: self.headers.clone(),
            rows: self.rows.iter().filter(|r| pred(r)).cloned().collect(),
        }
    }

    /// Concatenate tables, aligning columns by header name. The result has
    /// the union of headers in order of first appearance.
    pub fn concat<'a>(tables: impl IntoIterator<Item = &'a Table>) -> Table {
        let tables: Vec<&Table> = tables.into_iter().collect();
        let mut out = Table::default();
        for t in &tables {
            for h in &t.headers {
                if !out.headers.contains(h) {
                    out.headers.push(h.clone());
                }
            }
        }
        for t in tables {
            let positions: Vec<usize> = t
                .headers
                .iter()
                .filter_map(|h| out.column_index(h))
                .collect();
            for row in &t.rows {
                let mut aligned = vec![Cell::Empty; out.headers.len()];
                for (cell, &pos) in row.iter().zip(&positions) {
                    aligned[pos] = cell.clone();
                }
                out.rows.push(aligned);
            }
        }
        out
    }
}

/// A named sheet inside a workbook.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
}

/// Every sheet of an input workbook, in workbook order.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Table> {
        self.sheets.iter().find(|s| s.name == name).map(|s| &s.table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warehouse {
    Hr,
    Up,
}

impl Warehouse {
    pub const ALL: [Warehouse; 2] = [Warehouse::Hr, Warehouse::Up];

    pub fn code(self) -> &'static str {
        match self {
            Warehouse::Hr => "HR",
            Warehouse::Up => "UP",
        }
    }
}

impl fmt::Display for Warehouse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

fn display_amount(v: &f64) -> String {
    format_number(*v, 2)
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct ProvinceSummaryRow {
    #[serde(rename = "Shipping_Province")]
    #[tabled(rename = "Shipping_Province")]
    pub shipping_province: String,
    #[serde(rename = "HR_Net_Taxable")]
    #[tabled(rename = "HR_Net_Taxable")]
    #[tabled(display_with = "display_amount")]
    pub hr_net_taxable: f64,
    #[serde(rename = "UP_Net_Taxable")]
    #[tabled(rename = "UP_Net_Taxable")]
    #[tabled(display_with = "display_amount")]
    pub up_net_taxable: f64,
    #[serde(rename = "Total_Combined")]
    #[tabled(rename = "Total_Combined")]
    #[tabled(display_with = "display_amount")]
    pub total_combined: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct ItemSummaryRow {
    #[serde(rename = "Shipping_Province")]
    #[tabled(rename = "Shipping_Province")]
    pub shipping_province: String,
    #[serde(rename = "Lineitem_name")]
    #[tabled(rename = "Lineitem_name")]
    pub lineitem_name: String,
    #[serde(rename = "Lineitem_quantity")]
    #[tabled(rename = "Lineitem_quantity")]
    #[tabled(display_with = "display_amount")]
    pub lineitem_quantity: f64,
    #[serde(rename = "Taxable_Amount")]
    #[tabled(rename = "Taxable_Amount")]
    #[tabled(display_with = "display_amount")]
    pub taxable_amount: f64,
}
