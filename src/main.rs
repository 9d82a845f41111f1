// Entry point and high-level CLI flow.
//
// One run loads the raw CSV, cleans it, and writes three artifacts into the
// output directory:
// - the clean table as CSV,
// - the human-readable cleaning report,
// - a JSON summary carrying the full structured report,
// - the aggregate answers as `summary.txt`.
use chrono::Local;
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use world_clean::output::{preview_table, write_csv, write_json};
use world_clean::stats::StatsPreviewRow;
use world_clean::types::RecordPreviewRow;
use world_clean::util::format_int;
use world_clean::{
    analyze, clean_world_data, load_raw_world_data, logging, save_cleaning_report,
    write_summary_txt, AnalysisSummary, CleanError, CleaningConfig, CleaningReport,
    CountryRecord, LoaderOptions,
};

const CLEAN_CSV: &str = "worldData_clean.csv";
const REPORT_TXT: &str = "cleaning_report.txt";
const SUMMARY_JSON: &str = "cleaning_summary.json";
const ANSWERS_TXT: &str = "summary.txt";

#[derive(Parser)]
#[command(name = "world_clean")]
#[command(about = "Validate, impute and deduplicate a world statistics CSV")]
#[command(version)]
struct Cli {
    /// Raw CSV export to clean
    #[arg(long, default_value = "data/worldData.csv")]
    input: PathBuf,
    /// Directory receiving the clean CSV, report and summary
    #[arg(long, default_value = "outputs")]
    out_dir: PathBuf,
    /// TOML file overriding the column schema and validity rules
    #[arg(long)]
    config: Option<PathBuf>,
    /// Single-character field delimiter (sniffed when omitted)
    #[arg(long)]
    delimiter: Option<char>,
    /// Skip completeness ratios and descriptive statistics
    #[arg(long)]
    no_stats: bool,
    /// Number of clean rows to preview on the console
    #[arg(long, default_value_t = 5)]
    preview_rows: usize,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    generated_at: String,
    input: String,
    report: &'a CleaningReport,
    analysis: &'a AnalysisSummary,
}

fn loader_options(cli: &Cli) -> Result<LoaderOptions, CleanError> {
    let delimiter = match cli.delimiter {
        None => None,
        Some(c) if c.is_ascii() => Some(c as u8),
        Some(c) => {
            return Err(CleanError::InvalidConfig(format!(
                "delimiter must be a single ASCII character, got {:?}",
                c
            )))
        }
    };
    Ok(LoaderOptions { delimiter })
}

/// Write the clean CSV, the text report, the JSON summary and the answers.
fn write_outputs(
    cli: &Cli,
    clean: &[CountryRecord],
    report: &CleaningReport,
    analysis: &AnalysisSummary,
) -> Result<(), CleanError> {
    std::fs::create_dir_all(&cli.out_dir)?;
    let out = |name: &str| -> PathBuf { cli.out_dir.join(name) };

    write_csv(out(CLEAN_CSV), clean)?;
    println!("[OK] Saved cleaned CSV -> {}", out(CLEAN_CSV).display());

    save_cleaning_report(report, out(REPORT_TXT))?;
    println!("[OK] Saved cleaning report -> {}", out(REPORT_TXT).display());

    let summary = RunSummary {
        generated_at: Local::now().to_rfc3339(),
        input: cli.input.display().to_string(),
        report,
        analysis,
    };
    write_json(out(SUMMARY_JSON), &summary)?;
    println!("[OK] Saved cleaning summary -> {}", out(SUMMARY_JSON).display());

    write_summary_txt(analysis, out(ANSWERS_TXT))?;
    println!("[OK] Wrote analysis summary -> {}", out(ANSWERS_TXT).display());
    Ok(())
}

/// Print the descriptive statistics and the first few clean rows.
fn print_previews(clean: &[CountryRecord], report: &CleaningReport, max_rows: usize) {
    println!();
    if let Some(summary) = &report.summary {
        let rows: Vec<StatsPreviewRow> = summary.stats.iter().map(StatsPreviewRow::from).collect();
        preview_table("Descriptive statistics (clean table)", &rows, rows.len());
    }
    let rows: Vec<RecordPreviewRow> = clean.iter().take(max_rows).map(RecordPreviewRow::from).collect();
    preview_table("Clean rows (preview)", &rows, max_rows);
}

fn load_config(path: Option<&Path>) -> Result<CleaningConfig, CleanError> {
    match path {
        Some(p) => {
            info!(path = %p.display(), "loading cleaning config");
            CleaningConfig::from_toml_file(p)
        }
        None => Ok(CleaningConfig::default()),
    }
}

fn run(cli: &Cli) -> Result<(), CleanError> {
    let config = load_config(cli.config.as_deref())?;
    let options = loader_options(cli)?;

    let (raw, load_report) = load_raw_world_data(&cli.input, &options)?;
    println!(
        "Processing dataset... ({} rows loaded, {} skipped as unreadable)",
        format_int(load_report.total_rows),
        format_int(load_report.skipped_rows)
    );
    if load_report.coalesced_iso_columns > 0 {
        println!(
            "Info: Merged {} repeated iso_a2 column(s).",
            format_int(load_report.coalesced_iso_columns)
        );
    }
    if load_report.latin1_fields > 0 {
        println!(
            "Info: Decoded {} field(s) as Latin-1.",
            format_int(load_report.latin1_fields)
        );
    }

    let (clean, report) = clean_world_data(&raw, &config, !cli.no_stats)?;
    println!(
        "Cleaning done: {} rows kept of {}.",
        format_int(report.row_count),
        format_int(report.input_rows)
    );

    let analysis = analyze(&clean);
    write_outputs(cli, &clean, &report, &analysis)?;
    print_previews(&clean, &report, cli.preview_rows);
    Ok(())
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        error!(error = %e, "run failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
