// Cleaning report: the audit trail of one pipeline run, plus its text rendering.
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::types::{GroupField, NumericField};
use crate::util::format_pct;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCount {
    pub column: NumericField,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub group: GroupField,
    pub count: usize,
}

/// How the nulls of one column were resolved, tier by tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImputationCounts {
    pub column: NumericField,
    /// One entry per configured group, in priority order.
    pub by_group: Vec<GroupCount>,
    pub by_global: usize,
    /// Still null because the column had no observed value at all.
    pub unresolved: usize,
}

impl ImputationCounts {
    pub fn new(column: NumericField, groups: &[GroupField]) -> Self {
        ImputationCounts {
            column,
            by_group: groups
                .iter()
                .map(|g| GroupCount { group: *g, count: 0 })
                .collect(),
            by_global: 0,
            unresolved: 0,
        }
    }

    pub fn by(&self, group: GroupField) -> usize {
        self.by_group
            .iter()
            .find(|g| g.group == group)
            .map_or(0, |g| g.count)
    }

    pub fn total(&self) -> usize {
        self.by_group.iter().map(|g| g.count).sum::<usize>() + self.by_global
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnRatio {
    pub column: String,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub q50: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Completeness and descriptive statistics of the final table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryBlock {
    pub non_null_ratio: Vec<ColumnRatio>,
    pub stats: Vec<ColumnStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub row_count: usize,
    pub steps: Vec<String>,
    pub dropped_missing_identifiers: usize,
    /// Non-empty text cells that did not parse as a number.
    pub coerced_to_null: Vec<FieldCount>,
    pub dropped_invalid_nonpositive: usize,
    #[serde(rename = "lifeExp_out_of_range_set_nan")]
    pub life_exp_out_of_range_set_nan: usize,
    #[serde(rename = "gdpPercap_nonpositive_set_nan")]
    pub gdp_nonpositive_set_nan: usize,
    pub imputation: Vec<ImputationCounts>,
    pub dropped_missing_area_or_pop: usize,
    pub deduplicated_rows: usize,
    pub summary: Option<SummaryBlock>,
}

impl CleaningReport {
    pub fn new(input_rows: usize) -> Self {
        CleaningReport {
            input_rows,
            ..CleaningReport::default()
        }
    }

    pub fn step(&mut self, description: impl Into<String>) {
        self.steps.push(description.into());
    }

    pub fn imputation_for(&self, column: NumericField) -> Option<&ImputationCounts> {
        self.imputation.iter().find(|c| c.column == column)
    }

    pub fn coerced_for(&self, column: NumericField) -> usize {
        self.coerced_to_null
            .iter()
            .find(|c| c.column == column)
            .map_or(0, |c| c.count)
    }
}

/// Render the report as deterministic, line-oriented text.
pub fn render_report(report: &CleaningReport) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("== Cleaning Report ==".to_string());
    lines.push(format!("Rows before cleaning: {}", report.input_rows));
    lines.push(format!("Rows after cleaning: {}", report.row_count));
    lines.push("Steps:".to_string());
    for s in &report.steps {
        lines.push(format!("- {}", s));
    }

    let counters = [
        ("dropped_missing_identifiers", report.dropped_missing_identifiers),
        ("dropped_invalid_nonpositive", report.dropped_invalid_nonpositive),
        ("lifeExp_out_of_range_set_nan", report.life_exp_out_of_range_set_nan),
        ("gdpPercap_nonpositive_set_nan", report.gdp_nonpositive_set_nan),
        ("dropped_missing_area_or_pop", report.dropped_missing_area_or_pop),
        ("deduplicated_rows", report.deduplicated_rows),
    ];
    for (name, value) in counters {
        lines.push(format!("{}: {}", name, value));
    }

    if !report.coerced_to_null.is_empty() {
        let parts: Vec<String> = report
            .coerced_to_null
            .iter()
            .map(|c| format!("{}={}", c.column, c.count))
            .collect();
        lines.push(format!("Unparseable values set to null: {}", parts.join(", ")));
    }

    for c in &report.imputation {
        let mut parts: Vec<String> = c
            .by_group
            .iter()
            .map(|g| format!("{}={}", g.group, g.count))
            .collect();
        parts.push(format!("global={}", c.by_global));
        if c.unresolved > 0 {
            parts.push(format!("unresolved={}", c.unresolved));
        }
        lines.push(format!("Imputation counts for {}: {}", c.column, parts.join(", ")));
    }

    lines.push(String::new());
    lines.push("Non-null ratios:".to_string());
    if let Some(summary) = &report.summary {
        for r in &summary.non_null_ratio {
            lines.push(format!("  {}: {}", r.column, format_pct(r.ratio)));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Write the rendered report to `path`, replacing any existing file.
pub fn save_cleaning_report(report: &CleaningReport, path: impl AsRef<Path>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(render_report(report).as_bytes())?;
    writer.flush()?;
    Ok(())
}
