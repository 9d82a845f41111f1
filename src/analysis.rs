// Aggregate answers over the cleaned table, written out as `summary.txt`.
//
// Rows whose group key or measured value is null are left out of the group
// they would belong to.
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::types::{CountryRecord, GroupField};
use crate::util::average;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupValue {
    pub group: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinentCount {
    pub continent: String,
    pub countries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryValue {
    pub name_long: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GdpExtremes {
    pub lowest: GroupValue,
    pub highest: GroupValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub most_countries: Option<ContinentCount>,
    pub largest_region: Option<GroupValue>,
    pub highest_life_exp: Option<CountryValue>,
    pub subregion_gdp: Option<GdpExtremes>,
}

/// Values of `value` per `group` key, groups in first-seen order.
fn grouped_values<'a, F>(
    records: &'a [CountryRecord],
    group: GroupField,
    value: F,
) -> Vec<(&'a str, Vec<f64>)>
where
    F: Fn(&CountryRecord) -> Option<f64>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<f64>)> = Vec::new();
    for r in records {
        let (Some(key), Some(v)) = (r.group(group), value(r)) else {
            continue;
        };
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(v);
    }
    groups
}

// Ties go to the alphabetically first group.
fn by_value_then_key(a: &(&str, f64), b: &(&str, f64)) -> Ordering {
    a.1.partial_cmp(&b.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.0.cmp(a.0))
}

fn to_group_value((group, value): (&str, f64)) -> GroupValue {
    GroupValue {
        group: group.to_string(),
        value,
    }
}

/// Continent holding the most countries. Ties go to the first continent seen.
pub fn most_countries_by_continent(records: &[CountryRecord]) -> Option<ContinentCount> {
    grouped_values(records, GroupField::Continent, |r| Some(r.area_km2))
        .into_iter()
        .map(|(continent, rows)| (continent, rows.len()))
        .reduce(|best, g| if g.1 > best.1 { g } else { best })
        .map(|(continent, countries)| ContinentCount {
            continent: continent.to_string(),
            countries,
        })
}

/// UN region with the largest combined `area_km2`.
pub fn region_with_largest_area(records: &[CountryRecord]) -> Option<GroupValue> {
    grouped_values(records, GroupField::RegionUn, |r| Some(r.area_km2))
        .into_iter()
        .map(|(region, areas)| (region, areas.iter().sum::<f64>()))
        .max_by(by_value_then_key)
        .map(to_group_value)
}

/// Country with the highest `lifeExp`. Ties go to the earlier row.
pub fn country_highest_life_expectancy(records: &[CountryRecord]) -> Option<CountryValue> {
    records
        .iter()
        .filter_map(|r| r.life_exp.map(|v| (r, v)))
        .reduce(|best, c| if c.1 > best.1 { c } else { best })
        .map(|(r, value)| CountryValue {
            name_long: r.name_long.clone(),
            value,
        })
}

/// Subregions with the lowest and the highest mean `gdpPercap`.
pub fn subregion_gdp_extremes(records: &[CountryRecord]) -> Option<GdpExtremes> {
    let means: Vec<(&str, f64)> = grouped_values(records, GroupField::Subregion, |r| r.gdp_percap)
        .into_iter()
        .filter_map(|(subregion, gdp)| average(&gdp).map(|m| (subregion, m)))
        .collect();
    let lowest = means.iter().copied().min_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    })?;
    let highest = means.iter().copied().max_by(by_value_then_key)?;
    Some(GdpExtremes {
        lowest: to_group_value(lowest),
        highest: to_group_value(highest),
    })
}

pub fn analyze(records: &[CountryRecord]) -> AnalysisSummary {
    AnalysisSummary {
        most_countries: most_countries_by_continent(records),
        largest_region: region_with_largest_area(records),
        highest_life_exp: country_highest_life_expectancy(records),
        subregion_gdp: subregion_gdp_extremes(records),
    }
}

pub fn render_summary(summary: &AnalysisSummary) -> String {
    const NONE: &str = "n/a";
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!(
        "Continent with the largest number of countries: {}",
        summary
            .most_countries
            .as_ref()
            .map_or_else(|| NONE.to_string(), |c| format!("{} ({})", c.continent, c.countries))
    ));
    lines.push(format!(
        "Region with largest combined area in sq. km: {}",
        summary
            .largest_region
            .as_ref()
            .map_or_else(|| NONE.to_string(), |r| format!("{} ({:.2} km2)", r.group, r.value))
    ));
    lines.push(format!(
        "Country with highest life expectancy: {}",
        summary
            .highest_life_exp
            .as_ref()
            .map_or_else(|| NONE.to_string(), |c| format!("{} ({:.2} years)", c.name_long, c.value))
    ));
    let extreme = |pick: fn(&GdpExtremes) -> &GroupValue| {
        summary
            .subregion_gdp
            .as_ref()
            .map(pick)
            .map_or_else(|| NONE.to_string(), |g| format!("{} ({:.2})", g.group, g.value))
    };
    lines.push(format!(
        "Subregion with lowest average GDP per capita: {}",
        extreme(|e| &e.lowest)
    ));
    lines.push(format!(
        "Subregion with highest average GDP per capita: {}",
        extreme(|e| &e.highest)
    ));
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn write_summary_txt(summary: &AnalysisSummary, path: impl AsRef<Path>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(render_summary(summary).as_bytes())?;
    writer.flush()?;
    Ok(())
}
