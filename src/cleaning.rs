// The cleaning pipeline.
//
// Stages run in a fixed order, each taking the table produced by the one
// before and adding its counters to the running report:
//   A. drop rows missing an identifier
//   B. coerce numeric cells
//   C. drop non-positive measurements, null implausible life expectancy
//   D. group-priority median imputation
//   E. drop rows still missing area or population
//   F. deduplicate by iso_a2
//   G. derive pop_density (and optionally describe the result)
use tracing::{debug, info};

use crate::config::{CleaningConfig, ColumnSchema, NonPositivePolicy};
use crate::dedup::deduplicate_by_iso;
use crate::error::{CleanError, Result};
use crate::impute::impute_groupwise_median;
use crate::report::{CleaningReport, FieldCount};
use crate::stats::summarize;
use crate::types::{CountryRecord, IdField, NumericField, RawRecord, RawTable, Record};
use crate::util::{coerce_cell, Coercion};

/// A raw row whose identifiers are known to be present.
struct Identified<'a> {
    iso_a2: String,
    name_long: String,
    raw: &'a RawRecord,
}

fn non_blank(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Fail fast when the input header lacks a column the schema relies on.
pub fn check_required_columns(raw: &RawTable, schema: &ColumnSchema) -> Result<()> {
    let missing: Vec<String> = schema
        .required_columns()
        .into_iter()
        .filter(|c| !raw.has_column(c))
        .map(str::to_string)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CleanError::MissingColumns(missing))
    }
}

fn drop_missing_identifiers<'a>(
    rows: &'a [RawRecord],
    report: &mut CleaningReport,
) -> Vec<Identified<'a>> {
    let kept: Vec<Identified<'a>> = rows
        .iter()
        .filter_map(|raw| {
            let iso_a2 = non_blank(raw.identifier(IdField::IsoA2))?;
            let name_long = non_blank(raw.identifier(IdField::NameLong))?;
            Some(Identified {
                iso_a2,
                name_long,
                raw,
            })
        })
        .collect();
    report.dropped_missing_identifiers = rows.len() - kept.len();
    report.step(format!(
        "Drop missing identifiers: {}",
        report.dropped_missing_identifiers
    ));
    kept
}

fn coerce_numeric(rows: Vec<Identified<'_>>, report: &mut CleaningReport) -> Vec<Record> {
    let mut unparseable = [0usize; 4];
    let mut coerce = |raw: &RawRecord, slot: usize, field: NumericField| -> Option<f64> {
        let c = coerce_cell(raw.cell(field));
        if c == Coercion::Unparseable {
            unparseable[slot] += 1;
        }
        c.value()
    };

    let records: Vec<Record> = rows
        .into_iter()
        .map(|row| {
            let raw = row.raw;
            Record {
                iso_a2: row.iso_a2,
                name_long: row.name_long,
                continent: non_blank(raw.continent.as_deref()),
                region_un: non_blank(raw.region_un.as_deref()),
                subregion: non_blank(raw.subregion.as_deref()),
                kind: non_blank(raw.kind.as_deref()),
                area_km2: coerce(raw, 0, NumericField::AreaKm2),
                pop: coerce(raw, 1, NumericField::Pop),
                life_exp: coerce(raw, 2, NumericField::LifeExp),
                gdp_percap: coerce(raw, 3, NumericField::GdpPercap),
                imputed: Vec::new(),
            }
        })
        .collect();

    report.coerced_to_null = NumericField::ALL
        .iter()
        .zip(unparseable)
        .map(|(field, count)| FieldCount {
            column: *field,
            count,
        })
        .collect();
    debug!(?unparseable, "numeric coercion finished");
    report.step("Converted numeric columns safely");
    records
}

fn non_positive(v: Option<f64>) -> bool {
    v.is_some_and(|v| v <= 0.0)
}

fn filter_invalid_values(
    records: Vec<Record>,
    config: &CleaningConfig,
    report: &mut CleaningReport,
) -> Vec<Record> {
    let before = records.len();
    let gdp_drops = config.nonpositive_gdp == NonPositivePolicy::Drop;
    let mut kept: Vec<Record> = records
        .into_iter()
        .filter(|r| {
            !(non_positive(r.pop)
                || non_positive(r.area_km2)
                || (gdp_drops && non_positive(r.gdp_percap)))
        })
        .collect();
    report.dropped_invalid_nonpositive = before - kept.len();

    let (lo, hi) = config.life_exp_bounds;
    for r in &mut kept {
        if r.life_exp.is_some_and(|v| v <= lo || v >= hi) {
            r.life_exp = None;
            report.life_exp_out_of_range_set_nan += 1;
        }
        if !gdp_drops && non_positive(r.gdp_percap) {
            r.gdp_percap = None;
            report.gdp_nonpositive_set_nan += 1;
        }
    }
    report.step("Filtered invalid values and bounded life expectancy");
    kept
}

fn impute(records: &mut [Record], schema: &ColumnSchema, report: &mut CleaningReport) {
    for column in &schema.imputed_columns {
        let counts = impute_groupwise_median(records, *column, &schema.group_columns);
        info!(
            column = column.column(),
            filled = counts.total(),
            global = counts.by_global,
            unresolved = counts.unresolved,
            "imputed missing values"
        );
        report.imputation.push(counts);
    }

    let columns: Vec<&str> = schema.imputed_columns.iter().map(|c| c.column()).collect();
    let tiers: Vec<&str> = schema
        .group_columns
        .iter()
        .map(|g| g.column())
        .chain(std::iter::once("global"))
        .collect();
    report.step(format!(
        "Imputed {} via group-wise median ({})",
        columns.join(" & "),
        tiers.join(" > ")
    ));
}

fn drop_missing_critical(records: Vec<Record>, report: &mut CleaningReport) -> Vec<Record> {
    let before = records.len();
    let kept: Vec<Record> = records
        .into_iter()
        .filter(|r| r.area_km2.is_some() && r.pop.is_some())
        .collect();
    report.dropped_missing_area_or_pop = before - kept.len();
    report.step("Drop rows still missing area_km2 or pop");
    kept
}

fn derive_pop_density(records: Vec<Record>) -> Vec<CountryRecord> {
    records
        .into_iter()
        .filter_map(|r| {
            let (area_km2, pop) = (r.area_km2?, r.pop?);
            Some(CountryRecord {
                iso_a2: r.iso_a2,
                name_long: r.name_long,
                continent: r.continent,
                region_un: r.region_un,
                subregion: r.subregion,
                kind: r.kind,
                area_km2,
                pop,
                life_exp: r.life_exp,
                gdp_percap: r.gdp_percap,
                pop_density: pop / area_km2,
                imputed: r.imputed,
            })
        })
        .collect()
}

/// Clean a raw world data table.
///
/// Malformed values never make this fail; they are nulled or dropped and
/// counted in the returned report. The only errors are an invalid `config`
/// and a header missing one of the schema's required columns.
pub fn clean_world_data(
    raw: &RawTable,
    config: &CleaningConfig,
    generate_stats: bool,
) -> Result<(Vec<CountryRecord>, CleaningReport)> {
    config.validate()?;
    check_required_columns(raw, &config.schema)?;
    let schema = &config.schema;
    let mut report = CleaningReport::new(raw.rows.len());

    let identified = drop_missing_identifiers(&raw.rows, &mut report);
    let records = coerce_numeric(identified, &mut report);
    let mut records = filter_invalid_values(records, config, &mut report);
    impute(&mut records, schema, &mut report);
    let records = drop_missing_critical(records, &mut report);

    let (records, dropped) = deduplicate_by_iso(records, &schema.numeric_columns);
    report.deduplicated_rows = dropped;
    report.step("Deduplicated by iso_a2 keeping rows with more non-nulls on key metrics");

    let clean = derive_pop_density(records);
    report.step("Derived pop_density = pop / area_km2");
    report.row_count = clean.len();
    if generate_stats {
        report.summary = Some(summarize(&clean, &schema.numeric_columns));
    }

    info!(
        input_rows = report.input_rows,
        output_rows = report.row_count,
        missing_identifiers = report.dropped_missing_identifiers,
        nonpositive = report.dropped_invalid_nonpositive,
        missing_critical = report.dropped_missing_area_or_pop,
        duplicates = report.deduplicated_rows,
        "cleaning finished"
    );
    Ok((clean, report))
}
