use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::types::{col, Cell, ItemSummaryRow, ProvinceSummaryRow, Table, Warehouse};

fn amount(row: &[Cell], idx: Option<usize>) -> f64 {
    idx.and_then(|i| row[i].to_number()).unwrap_or(0.0)
}

/// Province of a row, or `None` when it is missing or blank.
fn province(row: &[Cell], idx: usize) -> Option<String> {
    let cell = &row[idx];
    if cell.is_blank() {
        None
    } else {
        Some(cell.as_text().trim().to_string())
    }
}

fn source(row: &[Cell], idx: Option<usize>) -> Option<Warehouse> {
    let tag = idx.map(|i| row[i].as_text())?;
    Warehouse::ALL.into_iter().find(|w| w.code() == tag.trim())
}

/// Net taxable amount per province, split by source warehouse. Sorted by
/// province.
pub fn province_summary(all: &Table) -> Vec<ProvinceSummaryRow> {
    let Some(prov_idx) = all.column_index(col::SHIPPING_PROVINCE) else {
        warn!("no Shipping_Province column, province summary is empty");
        return Vec::new();
    };
    let taxable_idx = all.column_index(col::TAXABLE_AMOUNT);
    let wh_idx = all.column_index(col::SOURCE_WAREHOUSE);

    #[derive(Default)]
    struct Acc {
        hr: f64,
        up: f64,
        total: f64,
    }
    let mut groups: BTreeMap<String, Acc> = BTreeMap::new();
    for row in &all.rows {
        let Some(key) = province(row, prov_idx) else {
            continue;
        };
        let value = amount(row, taxable_idx);
        let e = groups.entry(key).or_default();
        match source(row, wh_idx) {
            Some(Warehouse::Hr) => e.hr += value,
            Some(Warehouse::Up) => e.up += value,
            None => {}
        }
        e.total += value;
    }
    debug!(provinces = groups.len(), "built province summary");

    groups
        .into_iter()
        .map(|(shipping_province, acc)| ProvinceSummaryRow {
            shipping_province,
            hr_net_taxable: acc.hr,
            up_net_taxable: acc.up,
            total_combined: acc.total,
        })
        .collect()
}

/// Quantity and taxable amount per (province, line item) for a single
/// warehouse. Sorted by province, then line item.
pub fn itemized_summary(all: &Table, warehouse: Warehouse) -> Vec<ItemSummaryRow> {
    let Some(prov_idx) = all.column_index(col::SHIPPING_PROVINCE) else {
        warn!(%warehouse, "no Shipping_Province column, itemized summary is empty");
        return Vec::new();
    };
    let item_idx = all.column_index(col::LINEITEM_NAME);
    let qty_idx = all.column_index(col::LINEITEM_QUANTITY);
    let taxable_idx = all.column_index(col::TAXABLE_AMOUNT);
    let wh_idx = all.column_index(col::SOURCE_WAREHOUSE);

    let mut groups: BTreeMap<(String, String), (f64, f64)> = BTreeMap::new();
    for row in &all.rows {
        if source(row, wh_idx) != Some(warehouse) {
            continue;
        }
        let Some(prov) = province(row, prov_idx) else {
            continue;
        };
        let item = item_idx.map(|i| row[i].as_text().trim().to_string()).unwrap_or_default();
        let e = groups.entry((prov, item)).or_insert((0.0, 0.0));
        e.0 += amount(row, qty_idx);
        e.1 += amount(row, taxable_idx);
    }

    groups
        .into_iter()
        .map(|((shipping_province, lineitem_name), (qty, taxable))| ItemSummaryRow {
            shipping_province,
            lineitem_name,
            lineitem_quantity: qty,
            taxable_amount: taxable,
        })
        .collect()
}

pub fn province_table(rows: &[ProvinceSummaryRow]) -> Table {
    let mut t = Table::new(
        [col::SHIPPING_PROVINCE, "HR_Net_Taxable", "UP_Net_Taxable", "Total_Combined"]
            .map(String::from)
            .to_vec(),
    );
    for r in rows {
        t.push_row(vec![
            Cell::text(&r.shipping_province),
            Cell::Number(r.hr_net_taxable),
            Cell::Number(r.up_net_taxable),
            Cell::Number(r.total_combined),
        ]);
    }
    t
}

pub fn itemized_table(rows: &[ItemSummaryRow]) -> Table {
    let mut t = Table::new(
        [col::SHIPPING_PROVINCE, col::LINEITEM_NAME, col::LINEITEM_QUANTITY, col::TAXABLE_AMOUNT]
            .map(String::from)
            .to_vec(),
    );
    for r in rows {
        t.push_row(vec![
            Cell::text(&r.shipping_province),
            Cell::text(&r.lineitem_name),
            Cell::Number(r.lineitem_quantity),
            Cell::Number(r.taxable_amount),
        ]);
    }
    t
}
