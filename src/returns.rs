// Previous-month returns extraction.
//
// The prior month's GSTR1 workbook carries one ledger sheet per warehouse.
// Rows whose updated status marks them as cancelled or lost are re-issued
// as negative entries stamped with the month they belong to.
use tracing::{debug, info};

use crate::normalize::{derive_taxable, normalize_columns, normalize_provinces, TaxablePolicy};
use crate::types::{col, Cell, Table, Warehouse, Workbook};
use crate::util::negate;

const RETURN_STATUSES: [&str; 5] = ["cancelled", "free order", "lost", "refunded", "rtoed"];

const NEGATED_COLUMNS: [&str; 3] = [col::TOTAL, col::TAXABLE_AMOUNT, col::LINEITEM_QUANTITY];

/// Return ledgers extracted from the previous month, one per warehouse.
#[derive(Debug, Clone, Default)]
pub struct Returns {
    pub hr: Table,
    pub up: Table,
}

/// First sheet whose name mentions the warehouse code and GSTR1 but is not a
/// pivot sheet. Matching is case-insensitive.
pub fn select_sheet<'a>(names: &[&'a str], warehouse: Warehouse) -> Option<&'a str> {
    names.iter().copied().find(|name| {
        let upper = name.to_uppercase();
        upper.contains(warehouse.code()) && upper.contains("GSTR1") && !upper.contains("PVT")
    })
}

fn is_return_status(cell: &Cell) -> bool {
    RETURN_STATUSES.contains(&cell.as_text().trim().to_lowercase().as_str())
}

/// Turn one previous-month ledger sheet into return records.
///
/// Sheets without an `Updated_Status` column produce no rows. Candidate rows
/// whose taxable amount is already negative were reversed earlier and are
/// dropped rather than negated a second time.
pub fn extract_returns(sheet: Table, month_label: &str) -> Table {
    let mut sheet = normalize_columns(sheet);
    normalize_provinces(&mut sheet);
    derive_taxable(&mut sheet, TaxablePolicy::Recompute);

    let Some(status_idx) = sheet.column_index(col::UPDATED_STATUS) else {
        debug!("no Updated_Status column, sheet has no returns");
        return Table::default();
    };
    let taxable_idx = sheet.column_index(col::TAXABLE_AMOUNT);
    let mut returns = sheet.filter_rows(|row| {
        let not_reversed = taxable_idx
            .map(|i| row[i].to_number().unwrap_or(0.0) >= 0.0)
            .unwrap_or(true);
        is_return_status(&row[status_idx]) && not_reversed
    });
    if returns.is_empty() {
        return Table::default();
    }

    returns.drop_columns_where(|h| h.eq_ignore_ascii_case(col::MONTH));
    let stamp = vec![Cell::text(month_label); returns.len()];
    returns.set_column(col::MONTH, stamp);
    returns.move_column_first(col::MONTH);

    for name in NEGATED_COLUMNS {
        returns.map_column(name, |c| Cell::Number(negate(c.to_number().unwrap_or(0.0))));
    }
    returns
}

/// Extract both warehouses' returns from the previous-month workbook. A
/// warehouse without a matching sheet gets an empty ledger.
pub fn extract_workbook_returns(workbook: &Workbook, month_label: &str) -> Returns {
    let names = workbook.sheet_names();
    let mut out = Returns::default();
    for warehouse in Warehouse::ALL {
        let Some(name) = select_sheet(&names, warehouse) else {
            info!(%warehouse, "no previous-month sheet found, no returns");
            continue;
        };
        info!(%warehouse, sheet = name, "reading previous-month sheet");
        let table = workbook.sheet(name).cloned().unwrap_or_default();
        let extracted = extract_returns(table, month_label);
        debug!(%warehouse, rows = extracted.len(), "extracted returns");
        match warehouse {
            Warehouse::Hr => out.hr = extracted,
            Warehouse::Up => out.up = extracted,
        }
    }
    out
}
