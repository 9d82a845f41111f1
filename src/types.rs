use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

use crate::util::format_number;

/// Identifier columns. Both are text and both are required on every clean record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdField {
    #[serde(rename = "iso_a2")]
    IsoA2,
    #[serde(rename = "name_long")]
    NameLong,
}

impl IdField {
    pub const ALL: [IdField; 2] = [IdField::IsoA2, IdField::NameLong];

    pub fn column(self) -> &'static str {
        match self {
            IdField::IsoA2 => "iso_a2",
            IdField::NameLong => "name_long",
        }
    }
}

/// Measured numeric columns. `pop_density` is derived and deliberately not listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericField {
    #[serde(rename = "area_km2")]
    AreaKm2,
    #[serde(rename = "pop")]
    Pop,
    #[serde(rename = "lifeExp")]
    LifeExp,
    #[serde(rename = "gdpPercap")]
    GdpPercap,
}

impl NumericField {
    pub const ALL: [NumericField; 4] = [
        NumericField::AreaKm2,
        NumericField::Pop,
        NumericField::LifeExp,
        NumericField::GdpPercap,
    ];

    pub fn column(self) -> &'static str {
        match self {
            NumericField::AreaKm2 => "area_km2",
            NumericField::Pop => "pop",
            NumericField::LifeExp => "lifeExp",
            NumericField::GdpPercap => "gdpPercap",
        }
    }

    /// Critical fields are never imputed: the density metric needs them observed.
    pub fn is_critical(self) -> bool {
        matches!(self, NumericField::AreaKm2 | NumericField::Pop)
    }
}

/// Categorical columns usable as imputation groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupField {
    #[serde(rename = "continent")]
    Continent,
    #[serde(rename = "region_un")]
    RegionUn,
    #[serde(rename = "subregion")]
    Subregion,
    #[serde(rename = "type")]
    Kind,
}

impl GroupField {
    pub const ALL: [GroupField; 4] = [
        GroupField::Continent,
        GroupField::RegionUn,
        GroupField::Subregion,
        GroupField::Kind,
    ];

    pub fn column(self) -> &'static str {
        match self {
            GroupField::Continent => "continent",
            GroupField::RegionUn => "region_un",
            GroupField::Subregion => "subregion",
            GroupField::Kind => "type",
        }
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl fmt::Display for GroupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A numeric cell as handed over by the loader, before coercion.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawCell {
    Text(String),
    Number(f64),
    #[default]
    Missing,
}

impl From<&str> for RawCell {
    fn from(s: &str) -> Self {
        RawCell::Text(s.to_string())
    }
}

impl From<f64> for RawCell {
    fn from(v: f64) -> Self {
        RawCell::Number(v)
    }
}

impl From<Option<f64>> for RawCell {
    fn from(v: Option<f64>) -> Self {
        v.map_or(RawCell::Missing, RawCell::Number)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub iso_a2: Option<String>,
    pub name_long: Option<String>,
    pub continent: Option<String>,
    pub region_un: Option<String>,
    pub subregion: Option<String>,
    pub kind: Option<String>,
    pub area_km2: RawCell,
    pub pop: RawCell,
    pub life_exp: RawCell,
    pub gdp_percap: RawCell,
}

impl RawRecord {
    pub fn identifier(&self, field: IdField) -> Option<&str> {
        match field {
            IdField::IsoA2 => self.iso_a2.as_deref(),
            IdField::NameLong => self.name_long.as_deref(),
        }
    }

    pub fn cell(&self, field: NumericField) -> &RawCell {
        match field {
            NumericField::AreaKm2 => &self.area_km2,
            NumericField::Pop => &self.pop,
            NumericField::LifeExp => &self.life_exp,
            NumericField::GdpPercap => &self.gdp_percap,
        }
    }
}

/// Rectangular input: the header names present in the source plus its rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<RawRecord>) -> Self {
        RawTable { columns, rows }
    }

    /// A table that declares every known column, handy for programmatic input.
    pub fn with_all_columns(rows: Vec<RawRecord>) -> Self {
        let columns = IdField::ALL
            .iter()
            .map(|f| f.column())
            .chain(GroupField::ALL.iter().map(|f| f.column()))
            .chain(NumericField::ALL.iter().map(|f| f.column()))
            .map(str::to_string)
            .collect();
        RawTable { columns, rows }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

/// Working record inside the pipeline: identifiers resolved, numerics coerced.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub iso_a2: String,
    pub name_long: String,
    pub continent: Option<String>,
    pub region_un: Option<String>,
    pub subregion: Option<String>,
    pub kind: Option<String>,
    pub area_km2: Option<f64>,
    pub pop: Option<f64>,
    pub life_exp: Option<f64>,
    pub gdp_percap: Option<f64>,
    /// Fields whose current value came from imputation rather than the input.
    pub imputed: Vec<NumericField>,
}

impl Record {
    pub fn value(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::AreaKm2 => self.area_km2,
            NumericField::Pop => self.pop,
            NumericField::LifeExp => self.life_exp,
            NumericField::GdpPercap => self.gdp_percap,
        }
    }

    pub fn value_mut(&mut self, field: NumericField) -> &mut Option<f64> {
        match field {
            NumericField::AreaKm2 => &mut self.area_km2,
            NumericField::Pop => &mut self.pop,
            NumericField::LifeExp => &mut self.life_exp,
            NumericField::GdpPercap => &mut self.gdp_percap,
        }
    }

    pub fn group(&self, field: GroupField) -> Option<&str> {
        match field {
            GroupField::Continent => self.continent.as_deref(),
            GroupField::RegionUn => self.region_un.as_deref(),
            GroupField::Subregion => self.subregion.as_deref(),
            GroupField::Kind => self.kind.as_deref(),
        }
    }

    pub fn is_imputed(&self, field: NumericField) -> bool {
        self.imputed.contains(&field)
    }

    /// Number of `fields` holding a value that was present in the input.
    pub fn observed_count(&self, fields: &[NumericField]) -> usize {
        fields
            .iter()
            .filter(|f| self.value(**f).is_some() && !self.is_imputed(**f))
            .count()
    }
}

/// A fully cleaned row. `area_km2`, `pop` and `pop_density` cannot be null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryRecord {
    pub iso_a2: String,
    pub name_long: String,
    pub continent: Option<String>,
    pub region_un: Option<String>,
    pub subregion: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub area_km2: f64,
    pub pop: f64,
    #[serde(rename = "lifeExp")]
    pub life_exp: Option<f64>,
    #[serde(rename = "gdpPercap")]
    pub gdp_percap: Option<f64>,
    pub pop_density: f64,
    #[serde(skip)]
    pub imputed: Vec<NumericField>,
}

impl CountryRecord {
    pub fn value(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::AreaKm2 => Some(self.area_km2),
            NumericField::Pop => Some(self.pop),
            NumericField::LifeExp => self.life_exp,
            NumericField::GdpPercap => self.gdp_percap,
        }
    }

    pub fn group(&self, field: GroupField) -> Option<&str> {
        match field {
            GroupField::Continent => self.continent.as_deref(),
            GroupField::RegionUn => self.region_un.as_deref(),
            GroupField::Subregion => self.subregion.as_deref(),
            GroupField::Kind => self.kind.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Tabled)]
pub struct RecordPreviewRow {
    #[tabled(rename = "iso_a2")]
    pub iso_a2: String,
    #[tabled(rename = "name_long")]
    pub name_long: String,
    #[tabled(rename = "continent")]
    pub continent: String,
    #[tabled(rename = "pop")]
    pub pop: String,
    #[tabled(rename = "area_km2")]
    pub area_km2: String,
    #[tabled(rename = "lifeExp")]
    pub life_exp: String,
    #[tabled(rename = "gdpPercap")]
    pub gdp_percap: String,
    #[tabled(rename = "pop_density")]
    pub pop_density: String,
}

impl From<&CountryRecord> for RecordPreviewRow {
    fn from(r: &CountryRecord) -> Self {
        let opt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format_number(v, 2));
        RecordPreviewRow {
            iso_a2: r.iso_a2.clone(),
            name_long: r.name_long.clone(),
            continent: r.continent.clone().unwrap_or_else(|| "-".to_string()),
            pop: format_number(r.pop, 0),
            area_km2: format_number(r.area_km2, 0),
            life_exp: opt(r.life_exp),
            gdp_percap: opt(r.gdp_percap),
            pop_density: format_number(r.pop_density, 2),
        }
    }
}
