// Pipeline configuration.
//
// Everything here has a default matching the standard world data export, so
// an empty TOML file (or no file at all) gives the stock behavior.
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CleanError, Result};
use crate::types::{GroupField, IdField, NumericField};

/// Which columns the pipeline treats as identifiers, measurements and groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSchema {
    /// Always both identifiers: records key on `iso_a2` and carry `name_long`.
    /// Listed so the header check and the schema read as one place; any other
    /// value is rejected by [`CleaningConfig::validate`].
    pub identifier_columns: Vec<IdField>,
    /// Counted for duplicate completeness and described in the statistics block.
    pub numeric_columns: Vec<NumericField>,
    /// Imputation groups, narrowest first.
    pub group_columns: Vec<GroupField>,
    pub imputed_columns: Vec<NumericField>,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        ColumnSchema {
            identifier_columns: IdField::ALL.to_vec(),
            numeric_columns: NumericField::ALL.to_vec(),
            group_columns: vec![GroupField::Subregion, GroupField::Continent],
            imputed_columns: vec![NumericField::LifeExp, NumericField::GdpPercap],
        }
    }
}

impl ColumnSchema {
    /// Every column that must be present in the input header, in schema order.
    pub fn required_columns(&self) -> Vec<&'static str> {
        let mut cols: Vec<&'static str> = Vec::new();
        let names = self
            .identifier_columns
            .iter()
            .map(|f| f.column())
            .chain(self.numeric_columns.iter().map(|f| f.column()))
            .chain(self.imputed_columns.iter().map(|f| f.column()))
            .chain(self.group_columns.iter().map(|f| f.column()));
        for name in names {
            if !cols.contains(&name) {
                cols.push(name);
            }
        }
        cols
    }
}

/// What to do with a non-positive `gdpPercap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonPositivePolicy {
    /// Remove the whole record, same as for `pop` and `area_km2`.
    #[default]
    Drop,
    /// Null the value and let imputation fill it.
    Null,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub schema: ColumnSchema,
    /// Exclusive bounds for a plausible life expectancy.
    pub life_exp_bounds: (f64, f64),
    pub nonpositive_gdp: NonPositivePolicy,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        CleaningConfig {
            schema: ColumnSchema::default(),
            life_exp_bounds: (0.0, 120.0),
            nonpositive_gdp: NonPositivePolicy::Drop,
        }
    }
}

impl CleaningConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: CleaningConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let schema = &self.schema;
        for id in IdField::ALL {
            if !schema.identifier_columns.contains(&id) {
                return Err(CleanError::InvalidConfig(format!(
                    "identifier_columns must include {}",
                    id.column()
                )));
            }
        }
        for critical in [NumericField::AreaKm2, NumericField::Pop] {
            if !schema.numeric_columns.contains(&critical) {
                return Err(CleanError::InvalidConfig(format!(
                    "numeric_columns must include {}",
                    critical
                )));
            }
        }
        if let Some(field) = schema.imputed_columns.iter().find(|f| f.is_critical()) {
            return Err(CleanError::InvalidConfig(format!(
                "{} is a critical field and cannot be imputed",
                field
            )));
        }
        let (lo, hi) = self.life_exp_bounds;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(CleanError::InvalidConfig(format!(
                "life_exp_bounds must be an increasing pair, got ({}, {})",
                lo, hi
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = CleaningConfig::from_toml_str("").unwrap();
        assert_eq!(config, CleaningConfig::default());
        assert_eq!(
            config.schema.required_columns(),
            vec![
                "iso_a2",
                "name_long",
                "area_km2",
                "pop",
                "lifeExp",
                "gdpPercap",
                "subregion",
                "continent"
            ]
        );
    }

    #[test]
    fn overrides_group_order_and_policy() {
        let config = CleaningConfig::from_toml_str(
            r#"
            life_exp_bounds = [20.0, 100.0]
            nonpositive_gdp = "null"

            [schema]
            group_columns = ["region_un", "continent"]
            "#,
        )
        .unwrap();
        assert_eq!(
            config.schema.group_columns,
            vec![GroupField::RegionUn, GroupField::Continent]
        );
        assert_eq!(config.nonpositive_gdp, NonPositivePolicy::Null);
        assert_eq!(config.life_exp_bounds, (20.0, 100.0));
        assert_eq!(config.schema.imputed_columns.len(), 2);
    }

    #[test]
    fn rejects_imputing_critical_fields() {
        let err = CleaningConfig::from_toml_str(
            r#"
            [schema]
            imputed_columns = ["pop"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CleanError::InvalidConfig(_)));
    }

    #[test]
    fn identifier_columns_are_fixed() {
        let err = CleaningConfig::from_toml_str(
            r#"
            [schema]
            identifier_columns = ["iso_a2"]
            "#,
        )
        .unwrap_err();
        match err {
            CleanError::InvalidConfig(msg) => assert!(msg.contains("name_long")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = CleaningConfig::from_toml_str("nonpositive_gdp = \"sometimes\"").unwrap_err();
        assert!(matches!(err, CleanError::Config(_)));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let config = CleaningConfig {
            life_exp_bounds: (120.0, 0.0),
            ..CleaningConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
