// Column and province normalization.
//
// Both rule sets are fixed lookup tables built once per process; everything
// else in here is a pure function over a `Table`.
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::types::{col, Cell, Table};

/// Tax-inclusive totals carry 18% GST.
pub const TAX_DIVISOR: f64 = 1.18;

/// Header synonyms, keyed by the lowercased, whitespace-collapsed header.
static HEADER_SYNONYMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("courier stauts", col::COURIER_STATUS),
        ("courier status", col::COURIER_STATUS),
        ("pickup location", col::PICKUP_LOCATION),
        ("total", col::TOTAL),
        ("lineitem name", col::LINEITEM_NAME),
        ("lineitem quantity", col::LINEITEM_QUANTITY),
        ("updated status", col::UPDATED_STATUS),
        ("tally hsn", col::HSN),
        ("hsn", col::HSN),
        ("shipping province", col::SHIPPING_PROVINCE),
        ("taxable", col::TAXABLE_AMOUNT),
        ("taxable amount", col::TAXABLE_AMOUNT),
    ])
});

/// State and union-territory codes, plus the legacy aliases still seen in
/// older exports (CT, OR, UA, TS).
static PROVINCE_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("AN", "ANDAMAN AND NICOBAR ISLANDS"),
        ("AP", "ANDHRA PRADESH"),
        ("AR", "ARUNACHAL PRADESH"),
        ("AS", "ASSAM"),
        ("BR", "BIHAR"),
        ("CH", "CHANDIGARH"),
        ("CG", "CHHATTISGARH"),
        ("CT", "CHHATTISGARH"),
        ("DN", "DADRA AND NAGAR HAVELI AND DAMAN AND DIU"),
        ("DD", "DADRA AND NAGAR HAVELI AND DAMAN AND DIU"),
        ("DL", "DELHI"),
        ("GA", "GOA"),
        ("GJ", "GUJARAT"),
        ("HR", "HARYANA"),
        ("HP", "HIMACHAL PRADESH"),
        ("JK", "JAMMU AND KASHMIR"),
        ("JH", "JHARKHAND"),
        ("KA", "KARNATAKA"),
        ("KL", "KERALA"),
        ("LA", "LADAKH"),
        ("LD", "LAKSHADWEEP"),
        ("MP", "MADHYA PRADESH"),
        ("MH", "MAHARASHTRA"),
        ("MN", "MANIPUR"),
        ("ML", "MEGHALAYA"),
        ("MZ", "MIZORAM"),
        ("NL", "NAGALAND"),
        ("OD", "ODISHA"),
        ("OR", "ODISHA"),
        ("PY", "PUDUCHERRY"),
        ("PB", "PUNJAB"),
        ("RJ", "RAJASTHAN"),
        ("SK", "SIKKIM"),
        ("TN", "TAMIL NADU"),
        ("TG", "TELANGANA"),
        ("TS", "TELANGANA"),
        ("TR", "TRIPURA"),
        ("UP", "UTTAR PRADESH"),
        ("UK", "UTTARAKHAND"),
        ("UA", "UTTARAKHAND"),
        ("WB", "WEST BENGAL"),
    ])
});

/// Whether `derive_taxable` may overwrite a taxable column that arrived
/// with the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxablePolicy {
    /// Derive only when no taxable column exists.
    KeepExisting,
    /// Always derive from `Total`.
    Recompute,
}

fn lookup_key(header: &str) -> String {
    header
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Canonical name for a single header.
pub fn canonical_header(header: &str) -> String {
    let trimmed = header.trim();
    match HEADER_SYNONYMS.get(lookup_key(trimmed).as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => trimmed.replace(' ', "_"),
    }
}

/// Map headers onto the canonical schema and drop duplicate columns,
/// keeping the first occurrence. Idempotent.
pub fn normalize_columns(mut table: Table) -> Table {
    let renamed: Vec<String> = table.headers.iter().map(|h| canonical_header(h)).collect();
    let mut seen = HashSet::new();
    let keep: Vec<bool> = renamed.iter().map(|h| seen.insert(h.clone())).collect();
    table.headers = renamed;
    if keep.iter().any(|k| !k) {
        debug!(dropped = keep.iter().filter(|k| !**k).count(), "collapsing duplicate columns");
        table.retain_columns(&keep);
    }
    table
}

/// Coerce `Total` to a number (non-numeric becomes 0) and derive
/// `Taxable_Amount = Total / 1.18` according to `policy`. Unrounded.
pub fn derive_taxable(table: &mut Table, policy: TaxablePolicy) {
    if !table.map_column(col::TOTAL, |c| Cell::Number(c.to_number().unwrap_or(0.0))) {
        debug!("no Total column, skipping taxable derivation");
        return;
    }
    if policy == TaxablePolicy::KeepExisting && table.has_column(col::TAXABLE_AMOUNT) {
        debug!("keeping taxable column supplied by the source");
        return;
    }
    let taxable: Vec<Cell> = table
        .column(col::TOTAL)
        .map(|cells| {
            cells
                .map(|c| Cell::Number(c.to_number().unwrap_or(0.0) / TAX_DIVISOR))
                .collect()
        })
        .unwrap_or_default();
    table.set_column(col::TAXABLE_AMOUNT, taxable);
}

/// Canonical province name for an already trimmed, uppercased value.
pub fn canonical_province(code: &str) -> String {
    let name = PROVINCE_CODES.get(code).copied().unwrap_or(code);
    if name == "NAN" {
        String::new()
    } else {
        name.to_string()
    }
}

/// Forward-fill blank provinces from the nearest earlier row, then map codes
/// to canonical names. Leading blanks have nothing to inherit and stay empty.
pub fn normalize_provinces(table: &mut Table) {
    let Some(idx) = table.column_index(col::SHIPPING_PROVINCE) else {
        debug!("no Shipping_Province column, skipping province normalization");
        return;
    };
    let mut last: Option<String> = None;
    for row in &mut table.rows {
        let cell = &row[idx];
        if !cell.is_blank() {
            last = Some(cell.as_text());
        }
        row[idx] = match &last {
            Some(raw) => Cell::Text(canonical_province(&raw.trim().to_uppercase())),
            None => Cell::Empty,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::table;

    #[test]
    fn maps_synonyms_and_misspellings() {
        assert_eq!(canonical_header("Courier Stauts"), "Courier_Status");
        assert_eq!(canonical_header(" courier   status "), "Courier_Status");
        assert_eq!(canonical_header("Tally HSN"), "HSN");
        assert_eq!(canonical_header("TAXABLE AMOUNT"), "Taxable_Amount");
        assert_eq!(canonical_header("taxable_amount"), "Taxable_Amount");
        assert_eq!(canonical_header("Billing Name"), "Billing_Name");
    }

    #[test]
    fn duplicate_headers_keep_first() {
        let t = table(
            &["Courier Status", "Courier Stauts", "Total"],
            &[&["Delivered", "RTO", "118"]],
        );
        let out = normalize_columns(t);
        assert_eq!(out.headers, vec!["Courier_Status", "Total"]);
        assert_eq!(out.rows[0][0], Cell::text("Delivered"));
        assert_eq!(out.rows[0][1], Cell::Number(118.0));
    }

    #[test]
    fn normalization_is_idempotent() {
        let t = table(
            &["Lineitem name", "Pickup  Location", "TAXABLE", "Shipping Province", "Order Id"],
            &[&["Soap", "Noida G-202", "100", "UP", "1001"]],
        );
        let once = normalize_columns(t);
        let twice = normalize_columns(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn taxable_is_total_over_1_18_unrounded() {
        let mut t = table(&["Total"], &[&["118"], &["59"], &["abc"], &["100"]]);
        derive_taxable(&mut t, TaxablePolicy::KeepExisting);
        let taxable: Vec<f64> = t
            .column(col::TAXABLE_AMOUNT)
            .unwrap()
            .map(|c| c.to_number().unwrap())
            .collect();
        assert!((taxable[0] - 100.0).abs() < 1e-9);
        assert!((taxable[1] - 50.0).abs() < 1e-9);
        assert_eq!(taxable[2], 0.0);
        assert!((taxable[3] - 100.0 / 1.18).abs() < 1e-12);
        assert_eq!(t.rows[2][0], Cell::Number(0.0));
    }

    #[test]
    fn keep_existing_leaves_source_taxable_alone() {
        let mut t = table(&["Total", "Taxable_Amount"], &[&["118", "99"]]);
        derive_taxable(&mut t, TaxablePolicy::KeepExisting);
        assert_eq!(t.rows[0][1], Cell::Number(99.0));

        derive_taxable(&mut t, TaxablePolicy::Recompute);
        assert!((t.rows[0][1].to_number().unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn missing_total_is_a_no_op() {
        let mut t = table(&["Lineitem_name"], &[&["Soap"]]);
        derive_taxable(&mut t, TaxablePolicy::Recompute);
        assert_eq!(t.headers, vec!["Lineitem_name"]);
    }

    #[test]
    fn province_codes_and_aliases() {
        assert_eq!(canonical_province("UP"), "UTTAR PRADESH");
        assert_eq!(canonical_province("CT"), "CHHATTISGARH");
        assert_eq!(canonical_province("CG"), "CHHATTISGARH");
        assert_eq!(canonical_province("OR"), "ODISHA");
        assert_eq!(canonical_province("OD"), "ODISHA");
        assert_eq!(canonical_province("UA"), "UTTARAKHAND");
        assert_eq!(canonical_province("KARNATAKA"), "KARNATAKA");
        assert_eq!(canonical_province("NAN"), "");
    }

    #[test]
    fn blank_provinces_inherit_from_previous_row() {
        let mut t = table(
            &["Shipping_Province"],
            &[&[""], &[" hr "], &[""], &["   "], &["ka"], &["nan"], &[""]],
        );
        normalize_provinces(&mut t);
        let got: Vec<String> = t.column(col::SHIPPING_PROVINCE).unwrap().map(|c| c.as_text()).collect();
        assert_eq!(got, vec!["", "HARYANA", "HARYANA", "HARYANA", "KARNATAKA", "", ""]);
    }
}
