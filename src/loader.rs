use csv::{ByteRecord, ReaderBuilder};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{GroupField, IdField, NumericField, RawCell, RawRecord, RawTable};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Field delimiter; sniffed from the header line when `None`.
    pub delimiter: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub skipped_rows: usize,
    pub delimiter: char,
    /// Fields that were not valid UTF-8 and were decoded as Latin-1.
    pub latin1_fields: usize,
    /// Number of repeated `iso_a2` columns folded into one.
    pub coalesced_iso_columns: usize,
}

/// Guess the delimiter from the first non-empty line.
pub fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let line = bytes
        .split(|b| *b == b'\n')
        .find(|l| l.iter().any(|b| !b.is_ascii_whitespace()))
        .unwrap_or(&[]);
    let mut best = (b',', 0usize);
    for d in DELIMITER_CANDIDATES {
        let n = line.iter().filter(|b| **b == d).count();
        if n > best.1 {
            best = (d, n);
        }
    }
    best.0
}

/// Decode one field, falling back to Latin-1 when it is not valid UTF-8.
fn decode(bytes: &[u8], latin1_fields: &mut usize) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            *latin1_fields += 1;
            bytes.iter().map(|b| char::from(*b)).collect()
        }
    }
}

fn normalize_header(name: &str) -> String {
    name.trim_start_matches('\u{feff}').trim().to_string()
}

/// `iso_a2`, or a repeat of it as spreadsheet tools name them (`iso_a2.1`).
fn is_iso_column(name: &str) -> bool {
    match name.strip_prefix("iso_a2") {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('.')
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit())),
        None => false,
    }
}

fn is_droppable_header(name: &str) -> bool {
    name.is_empty() || name.starts_with("Unnamed:")
}

/// Where each known column lives in the physical record.
struct ColumnPlan {
    iso: Vec<usize>,
    by_name: HashMap<String, usize>,
    columns: Vec<String>,
}

fn plan_columns(headers: &[String]) -> ColumnPlan {
    let mut plan = ColumnPlan {
        iso: Vec::new(),
        by_name: HashMap::new(),
        columns: Vec::new(),
    };
    for (idx, name) in headers.iter().enumerate() {
        if is_droppable_header(name) {
            continue;
        }
        if is_iso_column(name) {
            if plan.iso.is_empty() {
                plan.columns.push(IdField::IsoA2.column().to_string());
            }
            plan.iso.push(idx);
            continue;
        }
        if plan.by_name.contains_key(name) {
            debug!(column = %name, "repeated header; keeping the first occurrence");
            continue;
        }
        plan.by_name.insert(name.clone(), idx);
        plan.columns.push(name.clone());
    }
    plan
}

/// One row with every known column as trimmed, null-normalized text.
#[derive(Default)]
struct TextRow {
    iso_a2: Option<String>,
    name_long: Option<String>,
    groups: [Option<String>; 4],
    numbers: [Option<String>; 4],
}

fn cell_text(fields: &[String], idx: usize) -> Option<String> {
    let s = fields.get(idx)?.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return None;
    }
    Some(s.to_string())
}

fn read_text_row(fields: &[String], plan: &ColumnPlan) -> TextRow {
    let by_name = |name: &str| plan.by_name.get(name).and_then(|idx| cell_text(fields, *idx));
    TextRow {
        iso_a2: plan.iso.iter().find_map(|idx| cell_text(fields, *idx)),
        name_long: by_name(IdField::NameLong.column()),
        groups: GroupField::ALL.map(|g| by_name(g.column())),
        numbers: NumericField::ALL.map(|f| by_name(f.column())),
    }
}

/// A numeric column is "already numeric" when every value parses as a plain float.
fn plain_numeric_columns(rows: &[TextRow]) -> [bool; 4] {
    let mut plain = [true; 4];
    for row in rows {
        for (slot, cell) in row.numbers.iter().enumerate() {
            if let Some(s) = cell {
                if s.parse::<f64>().is_err() {
                    plain[slot] = false;
                }
            }
        }
    }
    plain
}

fn to_raw_cell(cell: Option<String>, plain: bool) -> RawCell {
    match cell {
        None => RawCell::Missing,
        Some(s) if plain => s.parse::<f64>().map_or(RawCell::Text(s), RawCell::Number),
        Some(s) => RawCell::Text(s),
    }
}

fn into_raw_record(row: TextRow, plain: &[bool; 4]) -> RawRecord {
    let [continent, region_un, subregion, kind] = row.groups;
    let [area_km2, pop, life_exp, gdp_percap] = row.numbers;
    RawRecord {
        iso_a2: row.iso_a2,
        name_long: row.name_long,
        continent,
        region_un,
        subregion,
        kind,
        area_km2: to_raw_cell(area_km2, plain[0]),
        pop: to_raw_cell(pop, plain[1]),
        life_exp: to_raw_cell(life_exp, plain[2]),
        gdp_percap: to_raw_cell(gdp_percap, plain[3]),
    }
}

/// Parse CSV bytes into a raw table.
pub fn parse_raw_world_data(bytes: &[u8], options: &LoaderOptions) -> Result<(RawTable, LoadReport)> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let delimiter = options.delimiter.unwrap_or_else(|| sniff_delimiter(bytes));
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let mut latin1_fields = 0usize;
    let headers: Vec<String> = rdr
        .byte_headers()?
        .iter()
        .map(|h| normalize_header(&decode(h, &mut latin1_fields)))
        .collect();
    let plan = plan_columns(&headers);

    let mut total_rows = 0usize;
    let mut skipped_rows = 0usize;
    let mut text_rows: Vec<TextRow> = Vec::new();
    let mut record = ByteRecord::new();
    loop {
        match rdr.read_byte_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                total_rows += 1;
                skipped_rows += 1;
                warn!(error = %e, "skipping unreadable CSV row");
                continue;
            }
        }
        total_rows += 1;
        let fields: Vec<String> = record.iter().map(|f| decode(f, &mut latin1_fields)).collect();
        text_rows.push(read_text_row(&fields, &plan));
    }

    let plain = plain_numeric_columns(&text_rows);
    let rows: Vec<RawRecord> = text_rows
        .into_iter()
        .map(|row| into_raw_record(row, &plain))
        .collect();

    let report = LoadReport {
        total_rows,
        skipped_rows,
        delimiter: char::from(delimiter),
        latin1_fields,
        coalesced_iso_columns: plan.iso.len().saturating_sub(1),
    };
    debug!(?report, columns = plan.columns.len(), "raw table loaded");
    Ok((RawTable::new(plan.columns, rows), report))
}

/// Read a CSV file into a raw table ready for cleaning.
pub fn load_raw_world_data(
    path: impl AsRef<Path>,
    options: &LoaderOptions,
) -> Result<(RawTable, LoadReport)> {
    let bytes = std::fs::read(path)?;
    parse_raw_world_data(&bytes, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_common_delimiters() {
        assert_eq!(sniff_delimiter(b"a;b;c\n1;2;3"), b';');
        assert_eq!(sniff_delimiter(b"\n\na\tb\tc\n"), b'\t');
        assert_eq!(sniff_delimiter(b"a,b,c"), b',');
        assert_eq!(sniff_delimiter(b"single"), b',');
    }

    #[test]
    fn recognizes_repeated_iso_columns() {
        assert!(is_iso_column("iso_a2"));
        assert!(is_iso_column("iso_a2.1"));
        assert!(!is_iso_column("iso_a2.x"));
        assert!(!is_iso_column("iso_a3"));
    }

    #[test]
    fn coalesces_iso_and_drops_unnamed_columns() {
        let csv = "\u{feff}Unnamed: 0,iso_a2, name_long ,iso_a2,pop\n\
                   0,,Alfa,AA,10\n\
                   1,BB,Bravo,XX,20\n";
        let (table, report) = parse_raw_world_data(csv.as_bytes(), &LoaderOptions::default()).unwrap();
        assert_eq!(table.columns, vec!["iso_a2", "name_long", "pop"]);
        assert_eq!(table.rows[0].iso_a2.as_deref(), Some("AA"));
        assert_eq!(table.rows[1].iso_a2.as_deref(), Some("BB"));
        assert_eq!(table.rows[0].name_long.as_deref(), Some("Alfa"));
        assert_eq!(report.coalesced_iso_columns, 1);
        assert_eq!(report.total_rows, 2);
    }

    #[test]
    fn infers_numeric_columns_and_keeps_text_ones() {
        let csv = "iso_a2;pop;area_km2;lifeExp\n\
                   AA;1 000;10;70.5\n\
                   BB;2000;;nan\n";
        let (table, report) = parse_raw_world_data(csv.as_bytes(), &LoaderOptions::default()).unwrap();
        assert_eq!(report.delimiter, ';');
        // One value has an inner space, so the whole column stays text.
        assert_eq!(table.rows[0].pop, RawCell::Text("1 000".to_string()));
        assert_eq!(table.rows[1].pop, RawCell::Text("2000".to_string()));
        assert_eq!(table.rows[0].area_km2, RawCell::Number(10.0));
        assert_eq!(table.rows[1].area_km2, RawCell::Missing);
        assert_eq!(table.rows[1].life_exp, RawCell::Missing);
        assert_eq!(table.rows[0].gdp_percap, RawCell::Missing);
    }

    #[test]
    fn falls_back_to_latin1() {
        let mut bytes = b"iso_a2,name_long\nCI,C".to_vec();
        bytes.push(0xF4); // 'ô' in Latin-1
        bytes.extend_from_slice(b"te d'Ivoire\n");
        let (table, report) = parse_raw_world_data(&bytes, &LoaderOptions::default()).unwrap();
        assert_eq!(table.rows[0].name_long.as_deref(), Some("Côte d'Ivoire"));
        assert_eq!(report.latin1_fields, 1);
    }

    #[test]
    fn short_rows_fill_with_missing() {
        let csv = "iso_a2,name_long,pop\nAA,Alfa\n";
        let (table, _) = parse_raw_world_data(csv.as_bytes(), &LoaderOptions::default()).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].pop, RawCell::Missing);
    }
}
