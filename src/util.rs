// Utility helpers for parsing and basic statistics.
//
// This module centralizes all the "dirty" cell/number handling so the
// pipeline stages can assume clean, typed values.
use num_format::{Locale, ToFormattedString};

use crate::types::RawCell;

/// Outcome of coercing one raw numeric cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coercion {
    Parsed(f64),
    /// Absent, blank or a `nan`-like token. Treated as genuinely missing.
    Empty,
    /// Something was there but it is not a finite number.
    Unparseable,
}

impl Coercion {
    pub fn value(self) -> Option<f64> {
        match self {
            Coercion::Parsed(v) => Some(v),
            Coercion::Empty | Coercion::Unparseable => None,
        }
    }
}

/// Tokens that spreadsheet and dataframe exports use for "no value".
pub fn is_null_token(s: &str) -> bool {
    s.is_empty()
        || ["nan", "null", "none", "n/a"]
            .iter()
            .any(|t| s.eq_ignore_ascii_case(t))
}

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports.
///
/// - Drops every whitespace character, including non-breaking spaces,
///   so `" 5 678 "` and `"5\u{a0}678"` both read as `5678`.
/// - Strips `","` thousands separators.
/// - Never fails: anything that is not a finite number is `Unparseable`.
pub fn parse_f64_lenient(s: &str) -> Coercion {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    if is_null_token(&cleaned) {
        return Coercion::Empty;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Coercion::Parsed(v),
        _ => Coercion::Unparseable,
    }
}

/// Resolve a tagged raw cell into a nullable float.
pub fn coerce_cell(cell: &RawCell) -> Coercion {
    match cell {
        // Numbers pass through untouched; NaN is how numeric exports spell null.
        RawCell::Number(v) if v.is_nan() => Coercion::Empty,
        RawCell::Number(v) if v.is_finite() => Coercion::Parsed(*v),
        RawCell::Number(_) => Coercion::Unparseable,
        RawCell::Text(s) => parse_f64_lenient(s),
        RawCell::Missing => Coercion::Empty,
    }
}

pub fn average(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// Sample standard deviation (n - 1 in the denominator).
pub fn sample_std(v: &[f64]) -> Option<f64> {
    if v.len() < 2 {
        return None;
    }
    let mean = average(v)?;
    let ss: f64 = v.iter().map(|x| (x - mean) * (x - mean)).sum();
    Some((ss / (v.len() - 1) as f64).sqrt())
}

pub fn median(v: Vec<f64>) -> Option<f64> {
    // Accept `Vec<f64>` by value so the sort can happen in place.
    quantile(v, 0.5)
}

/// Quantile with linear interpolation between the two closest ranks.
pub fn quantile(mut v: Vec<f64>, q: f64) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    v.sort_by(f64::total_cmp);
    Some(quantile_sorted(&v, q))
}

/// Same as [`quantile`] for data that is already sorted and non-empty.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
    if !n.is_finite() {
        return n.to_string();
    }
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
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
    // Used for counts in console messages (e.g. `250 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

/// `0.5` -> `"50.00%"`.
pub fn format_pct(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_parse_strips_separators_and_spaces() {
        assert_eq!(parse_f64_lenient("1,234"), Coercion::Parsed(1234.0));
        assert_eq!(parse_f64_lenient(" 5 678 "), Coercion::Parsed(5678.0));
        assert_eq!(parse_f64_lenient("12\u{a0}345.5"), Coercion::Parsed(12345.5));
        assert_eq!(parse_f64_lenient("-10"), Coercion::Parsed(-10.0));
        assert_eq!(parse_f64_lenient("1e3"), Coercion::Parsed(1000.0));
    }

    #[test]
    fn lenient_parse_maps_blanks_and_garbage_to_null() {
        assert_eq!(parse_f64_lenient(""), Coercion::Empty);
        assert_eq!(parse_f64_lenient("   "), Coercion::Empty);
        assert_eq!(parse_f64_lenient("NaN"), Coercion::Empty);
        assert_eq!(parse_f64_lenient("Nan"), Coercion::Empty);
        assert_eq!(parse_f64_lenient("abc"), Coercion::Unparseable);
        assert_eq!(parse_f64_lenient("12abc"), Coercion::Unparseable);
        assert_eq!(parse_f64_lenient("inf"), Coercion::Unparseable);
    }

    #[test]
    fn numbers_pass_through_coercion() {
        assert_eq!(coerce_cell(&RawCell::Number(3.5)), Coercion::Parsed(3.5));
        assert_eq!(coerce_cell(&RawCell::Number(f64::NAN)), Coercion::Empty);
        assert_eq!(coerce_cell(&RawCell::Missing), Coercion::Empty);
        assert_eq!(coerce_cell(&RawCell::from("1,000")).value(), Some(1000.0));
    }

    #[test]
    fn median_handles_odd_even_and_empty() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(vec![4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(Vec::new()), None);
    }

    #[test]
    fn quartiles_interpolate_linearly() {
        let v = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(v.clone(), 0.25), Some(1.75));
        assert_eq!(quantile(v.clone(), 0.75), Some(3.25));
        assert_eq!(quantile(v, 1.0), Some(4.0));
    }

    #[test]
    fn sample_std_needs_two_values() {
        assert_eq!(sample_std(&[5.0]), None);
        let s = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((s - 2.138089935299395).abs() < 1e-12);
    }

    #[test]
    fn formats_numbers_with_grouping() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-1500.0, 0), "-1,500");
        assert_eq!(format_int(12345usize), "12,345");
        assert_eq!(format_pct(0.5), "50.00%");
    }
}
