// Utility helpers for parsing, month labels and number formatting.
//
// This module centralizes the forgiving number handling so the rest of the
// pipeline can pick its own default for values that do not parse.
use chrono::{Months, NaiveDate};
use num_format::{Locale, ToFormattedString};

/// Label used when the reporting month cannot be parsed.
pub const PREV_MONTH_FALLBACK: &str = "PREV_MONTH";

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters other than an
///   exponent marker (this also keeps `nan`/`inf` artifacts out).
/// - Accepts scientific notation such as `1.18E+03`.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) {
        return None;
    }
    let s = s.replace(",", "");
    let exponent = s.find(['e', 'E']);
    if let Some(pos) = exponent {
        // The marker must sit between a mantissa digit and the exponent.
        let before = s[..pos].chars().last();
        let after = s[pos + 1..].trim_start_matches(['+', '-']).chars().next();
        if !before.is_some_and(|c| c.is_ascii_digit() || c == '.')
            || !after.is_some_and(|c| c.is_ascii_digit())
        {
            return None;
        }
    }
    s.parse::<f64>().ok()
}

/// Negate an amount without producing `-0.0`.
pub fn negate(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        -v
    }
}

/// Label of the month before `label`, both in `"%b %Y"` form, uppercased
/// (`"DEC 2025"` -> `"NOV 2025"`).
///
/// Unparsable input yields [`PREV_MONTH_FALLBACK`] instead of an error.
pub fn previous_month_label(label: &str) -> String {
    // `NaiveDate` needs a day, so pin the label to the first of the month.
    let parsed = NaiveDate::parse_from_str(&format!("01 {}", label.trim()), "%d %b %Y");
    match parsed.ok().and_then(|d| d.checked_sub_months(Months::new(1))) {
        Some(prev) => prev.format("%b %Y").to_string().to_uppercase(),
        None => PREV_MONTH_FALLBACK.to_string(),
    }
}

/// Month label as used in output file names (`"DEC 2025"` -> `"DEC_2025"`).
pub fn file_label(label: &str) -> String {
    label.replace(' ', "_")
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
