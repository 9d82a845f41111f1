//! Cleaning pipeline for country-level world statistics.
//!
//! [`loader`] turns a CSV export into a [`RawTable`], [`clean_world_data`]
//! turns that into validated [`CountryRecord`]s plus a [`CleaningReport`],
//! [`analysis`] answers aggregate questions over the clean table, and
//! [`report`] / [`output`] persist the results.
pub mod analysis;
pub mod cleaning;
pub mod config;
pub mod dedup;
pub mod error;
pub mod impute;
pub mod loader;
pub mod logging;
pub mod output;
pub mod report;
pub mod stats;
pub mod types;
pub mod util;

pub use analysis::{analyze, write_summary_txt, AnalysisSummary};
pub use cleaning::clean_world_data;
pub use config::{CleaningConfig, ColumnSchema, NonPositivePolicy};
pub use error::{CleanError, Result};
pub use loader::{load_raw_world_data, LoadReport, LoaderOptions};
pub use report::{render_report, save_cleaning_report, CleaningReport};
pub use types::{CountryRecord, GroupField, IdField, NumericField, RawCell, RawRecord, RawTable};
