// Completeness ratios and descriptive statistics over the cleaned table.
use tabled::Tabled;

use crate::report::{ColumnRatio, ColumnStats, SummaryBlock};
use crate::types::{CountryRecord, GroupField, NumericField};
use crate::util::{average, format_number, quantile_sorted, sample_std};

pub fn describe(column: &str, values: &[f64]) -> ColumnStats {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q = |p: f64| (!sorted.is_empty()).then(|| quantile_sorted(&sorted, p));
    ColumnStats {
        column: column.to_string(),
        count: sorted.len(),
        mean: average(&sorted),
        std: sample_std(&sorted),
        min: sorted.first().copied(),
        q25: q(0.25),
        q50: q(0.5),
        q75: q(0.75),
        max: sorted.last().copied(),
    }
}

fn ratio(non_null: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        non_null as f64 / total as f64
    }
}

/// Non-null ratio of every output column, in output column order.
pub fn non_null_ratios(records: &[CountryRecord]) -> Vec<ColumnRatio> {
    let total = records.len();
    let mut out = Vec::new();
    let mut push = |column: &str, non_null: usize| {
        out.push(ColumnRatio {
            column: column.to_string(),
            ratio: ratio(non_null, total),
        });
    };

    // Identifiers are non-null by construction.
    push("iso_a2", total);
    push("name_long", total);
    for group in GroupField::ALL {
        let n = records.iter().filter(|r| r.group(group).is_some()).count();
        push(group.column(), n);
    }
    for field in NumericField::ALL {
        let n = records.iter().filter(|r| r.value(field).is_some()).count();
        push(field.column(), n);
    }
    push("pop_density", total);
    out
}

/// Descriptive statistics for the configured numeric columns plus `pop_density`.
pub fn summarize(records: &[CountryRecord], numeric: &[NumericField]) -> SummaryBlock {
    let mut stats: Vec<ColumnStats> = numeric
        .iter()
        .map(|field| {
            let values: Vec<f64> = records.iter().filter_map(|r| r.value(*field)).collect();
            describe(field.column(), &values)
        })
        .collect();
    let density: Vec<f64> = records.iter().map(|r| r.pop_density).collect();
    stats.push(describe("pop_density", &density));

    SummaryBlock {
        non_null_ratio: non_null_ratios(records),
        stats,
    }
}

#[derive(Debug, Clone, Tabled)]
pub struct StatsPreviewRow {
    #[tabled(rename = "column")]
    pub column: String,
    #[tabled(rename = "count")]
    pub count: usize,
    #[tabled(rename = "mean")]
    pub mean: String,
    #[tabled(rename = "std")]
    pub std: String,
    #[tabled(rename = "min")]
    pub min: String,
    #[tabled(rename = "25%")]
    pub q25: String,
    #[tabled(rename = "50%")]
    pub q50: String,
    #[tabled(rename = "75%")]
    pub q75: String,
    #[tabled(rename = "max")]
    pub max: String,
}

impl From<&ColumnStats> for StatsPreviewRow {
    fn from(s: &ColumnStats) -> Self {
        let f = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format_number(v, 2));
        StatsPreviewRow {
            column: s.column.clone(),
            count: s.count,
            mean: f(s.mean),
            std: f(s.std),
            min: f(s.min),
            q25: f(s.q25),
            q50: f(s.q50),
            q75: f(s.q75),
            max: f(s.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn country(iso: &str, continent: Option<&str>, pop: f64, area: f64, life: Option<f64>) -> CountryRecord {
        CountryRecord {
            iso_a2: iso.to_string(),
            name_long: iso.to_string(),
            continent: continent.map(str::to_string),
            region_un: None,
            subregion: None,
            kind: None,
            area_km2: area,
            pop,
            life_exp: life,
            gdp_percap: Some(1000.0),
            pop_density: pop / area,
            imputed: Vec::new(),
        }
    }

    #[test]
    fn describe_matches_hand_computed_values() {
        let s = describe("pop", &[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(s.count, 4);
        assert_eq!(s.mean, Some(2.5));
        assert_eq!(s.min, Some(1.0));
        assert_eq!(s.q25, Some(1.75));
        assert_eq!(s.q50, Some(2.5));
        assert_eq!(s.q75, Some(3.25));
        assert_eq!(s.max, Some(4.0));
        assert!((s.std.unwrap() - 1.2909944487358056).abs() < 1e-12);
    }

    #[test]
    fn describe_of_nothing_is_all_none() {
        let s = describe("lifeExp", &[]);
        assert_eq!(s.count, 0);
        assert!(s.mean.is_none() && s.min.is_none() && s.q50.is_none() && s.std.is_none());
    }

    #[test]
    fn ratios_cover_every_output_column() {
        let records = vec![
            country("AA", Some("Europe"), 10.0, 5.0, Some(70.0)),
            country("BB", None, 20.0, 4.0, None),
        ];
        let ratios = non_null_ratios(&records);
        assert_eq!(ratios.len(), 11);
        let get = |name: &str| ratios.iter().find(|r| r.column == name).unwrap().ratio;
        assert_eq!(get("iso_a2"), 1.0);
        assert_eq!(get("continent"), 0.5);
        assert_eq!(get("region_un"), 0.0);
        assert_eq!(get("lifeExp"), 0.5);
        assert_eq!(get("pop_density"), 1.0);
    }

    #[test]
    fn empty_table_has_zero_ratios() {
        assert!(non_null_ratios(&[]).iter().all(|r| r.ratio == 0.0));
    }

    #[test]
    fn summary_appends_density_stats() {
        let records = vec![country("AA", None, 10.0, 5.0, Some(70.0))];
        let block = summarize(&records, &NumericField::ALL);
        let columns: Vec<&str> = block.stats.iter().map(|s| s.column.as_str()).collect();
        assert_eq!(columns, vec!["area_km2", "pop", "lifeExp", "gdpPercap", "pop_density"]);
        assert_eq!(block.stats[4].mean, Some(2.0));
    }
}
