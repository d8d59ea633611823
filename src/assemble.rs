use crate::types::{col, Cell, Table, Warehouse};

/// Current-month rows followed by one fully blank row and then the return
/// rows. Without returns the current rows come back unchanged.
pub fn append_with_gap(current: Table, returns: &Table) -> Table {
    if returns.is_empty() {
        return current;
    }
    let mut combined = Table::concat([&current, returns]);
    let blank = vec![Cell::Empty; combined.headers.len()];
    combined.rows.insert(current.len(), blank);
    combined
}

/// Stamp every row with the warehouse it was classified into.
pub fn tag_warehouse(table: &mut Table, warehouse: Warehouse) {
    let tags = vec![Cell::text(warehouse.code()); table.len()];
    table.set_column(col::SOURCE_WAREHOUSE, tags);
}
