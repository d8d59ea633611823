use tracing::{debug, warn};

use crate::types::{col, Table, Warehouse};

const ACTIVE_STATUSES: [&str; 5] = [
    "DELIVERED",
    "INTRANSIT",
    "IN TRANSIT",
    "YET TO BE PICKUP",
    "YET TO PICKUP",
];

const HR_LOCATIONS: [&str; 4] = [
    "FAR_LF",
    "GLAUCUS GURGAON WAREHOUSE 3",
    "YET TO BE PICKUP",
    "YET TO PICKUP",
];

const HR_LOCATION_MARKER: &str = "HARYANA";
const UP_LOCATION: &str = "NOIDA G-202";

/// Rows of a table that belong to one warehouse. Borrows the source table;
/// call [`WarehouseSubset::to_table`] to materialize it.
#[derive(Debug, Clone)]
pub struct WarehouseSubset<'a> {
    pub warehouse: Warehouse,
    source: &'a Table,
    rows: Vec<usize>,
}

impl<'a> WarehouseSubset<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    pub fn to_table(&self) -> Table {
        self.source.select_rows(&self.rows)
    }
}

/// Result of splitting the current month by warehouse.
#[derive(Debug, Clone)]
pub struct Classification<'a> {
    pub hr: WarehouseSubset<'a>,
    pub up: WarehouseSubset<'a>,
    /// Rows that satisfied both warehouse predicates.
    pub overlap: Vec<usize>,
}

fn normalized(s: &str) -> String {
    s.trim().to_uppercase()
}

fn is_active(status: &str) -> bool {
    ACTIVE_STATUSES.contains(&normalized(status).as_str())
}

/// Whether a (status, pickup location) pair ships from `warehouse`.
pub fn matches(warehouse: Warehouse, status: &str, location: &str) -> bool {
    if !is_active(status) {
        return false;
    }
    let location = normalized(location);
    match warehouse {
        Warehouse::Hr => {
            HR_LOCATIONS.contains(&location.as_str()) || location.contains(HR_LOCATION_MARKER)
        }
        Warehouse::Up => location == UP_LOCATION,
    }
}

/// Evaluate one warehouse filter. A table without the status or location
/// column produces an empty subset.
fn subset(table: &Table, warehouse: Warehouse) -> WarehouseSubset<'_> {
    let columns = table
        .column_index(col::COURIER_STATUS)
        .zip(table.column_index(col::PICKUP_LOCATION));
    let rows = match columns {
        Some((status, location)) => table
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| matches(warehouse, &r[status].as_text(), &r[location].as_text()))
            .map(|(i, _)| i)
            .collect(),
        None => {
            warn!(%warehouse, "status or pickup location column missing, warehouse subset is empty");
            Vec::new()
        }
    };
    WarehouseSubset { warehouse, source: table, rows }
}

/// Split normalized current-month rows into the HR and UP subsets. The two
/// filters run independently; rows matching both are reported, not resolved.
pub fn classify(table: &Table) -> Classification<'_> {
    let hr = subset(table, Warehouse::Hr);
    let up = subset(table, Warehouse::Up);
    let overlap: Vec<usize> = hr
        .row_indices()
        .iter()
        .copied()
        .filter(|i| up.row_indices().binary_search(i).is_ok())
        .collect();
    if !overlap.is_empty() {
        warn!(rows = overlap.len(), "rows match both HR and UP warehouse rules");
    }
    debug!(total = table.len(), hr = hr.len(), up = up.len(), "classified current month");
    Classification { hr, up, overlap }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::table;

    fn orders() -> Table {
        table(
            &["Courier_Status", "Pickup_Location", "Total"],
            &[
                &["Delivered", "Noida G-202", "118"],
                &[" in transit ", "FAR_LF", "59"],
                &["Yet to be pickup", "Sector 5 haryana hub", "10"],
                &["RTO", "FAR_LF", "20"],
                &["DELIVERED", "Mumbai DC", "30"],
                &["IntransiT", "yet to pickup", "40"],
            ],
        )
    }

    #[test]
    fn splits_by_status_and_location() {
        let t = orders();
        let c = classify(&t);
        assert_eq!(c.up.row_indices(), &[0]);
        assert_eq!(c.hr.row_indices(), &[1, 2, 5]);
        assert!(c.overlap.is_empty());
    }

    #[test]
    fn materialized_subset_keeps_headers() {
        let t = orders();
        let up = classify(&t).up.to_table();
        assert_eq!(up.headers, t.headers);
        assert_eq!(up.len(), 1);
    }

    #[test]
    fn missing_column_yields_empty_subsets() {
        let t = table(&["Courier_Status", "Total"], &[&["Delivered", "118"]]);
        let c = classify(&t);
        assert!(c.hr.is_empty());
        assert!(c.up.is_empty());
    }

    #[test]
    fn inactive_status_never_matches() {
        assert!(!matches(Warehouse::Up, "Cancelled", "NOIDA G-202"));
        assert!(matches(Warehouse::Up, "delivered", "  noida g-202 "));
        assert!(!matches(Warehouse::Up, "delivered", "NOIDA G-202 B"));
    }
}
