//! cohortscope - UA cohort performance reports from warehouse exports.
//!
//! Reads exported warehouse query results (CSV/JSON/JSONL), runs the
//! aggregate -> derive -> compare -> classify pipeline, and prints or
//! exports the health report.

mod render;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use cohortscope_core::alert::{list_rules, Product, ThresholdConfig};
use cohortscope_core::export::{write_report_json, write_sources_csv};
use cohortscope_core::ingest::load_records;
use cohortscope_core::logging;
use cohortscope_core::report::{assemble, HealthReport, PeriodScope};
use cohortscope_core::{aggregate, compare, derive_all, Config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cohortscope")]
#[command(about = "UA cohort performance reports: health checks, comparisons, alerts")]
#[command(version)]
struct Cli {
    /// Path to a config file (defaults to the XDG config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Day-over-day health check across two warehouse exports
    Daily {
        /// Current-day export (CSV/JSON/JSONL)
        #[arg(long)]
        current: PathBuf,
        /// Previous-day export
        #[arg(long)]
        previous: PathBuf,
        /// Report date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Product context (offerwall, non_offerwall) whose KPI targets set
        /// the ROAS floor and horizon
        #[arg(long)]
        product: Option<Product>,
        /// Output format: text (default) or json
        #[arg(short, long, default_value = "text")]
        format: String,
        /// Also write timestamped CSV + JSON exports
        #[arg(long)]
        export: bool,
    },
    /// Week-over-week cohort comparison across two weekly exports
    Weekly {
        /// Current-week export
        #[arg(long)]
        current: PathBuf,
        /// Previous-week export
        #[arg(long)]
        previous: PathBuf,
        /// Report date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Product context (offerwall, non_offerwall) whose KPI targets set
        /// the ROAS floor and horizon
        #[arg(long)]
        product: Option<Product>,
        /// Output format: text (default) or json
        #[arg(short, long, default_value = "text")]
        format: String,
        /// Also write timestamped CSV + JSON exports
        #[arg(long)]
        export: bool,
    },
    /// Aggregate one export and write timestamped CSV + JSON summaries
    Export {
        /// Warehouse export to aggregate
        #[arg(long)]
        input: PathBuf,
        /// Destination directory (defaults to the configured export dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// List classifier rules, KPI targets, and effective thresholds
    Rules {
        /// Product context (offerwall, non_offerwall) whose KPI targets set
        /// the ROAS floor and horizon
        #[arg(long)]
        product: Option<Product>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    Config::ensure_xdg_env();

    let config = match &cli.config {
        Some(path) => Config::load_from(path).context("failed to load configuration")?,
        None => Config::load().context("failed to load configuration")?,
    };

    let _log_guard = logging::init(&config.logging).context("failed to initialize logging")?;

    match cli.command {
        Command::Daily {
            current,
            previous,
            date,
            product,
            format,
            export,
        } => run_report(
            &config,
            PeriodScope::DayOverDay,
            &current,
            &previous,
            date,
            product,
            &format,
            export,
        ),
        Command::Weekly {
            current,
            previous,
            date,
            product,
            format,
            export,
        } => run_report(
            &config,
            PeriodScope::WeekOverWeek,
            &current,
            &previous,
            date,
            product,
            &format,
            export,
        ),
        Command::Export { input, out_dir } => run_export(&config, &input, out_dir),
        Command::Rules { product } => {
            let thresholds = effective_thresholds(&config, product);
            render::print_rules(&list_rules(), &thresholds, &config.targets);
            Ok(())
        }
    }
}

/// Apply the product's KPI targets to the configured thresholds, when a
/// product context was given.
fn effective_thresholds(config: &Config, product: Option<Product>) -> ThresholdConfig {
    match product {
        Some(p) => config
            .thresholds
            .clone()
            .with_kpi_targets(p, &config.targets),
        None => config.thresholds.clone(),
    }
}

fn build_report(
    config: &Config,
    thresholds: &ThresholdConfig,
    scope: PeriodScope,
    current: &PathBuf,
    previous: &PathBuf,
    report_date: NaiveDate,
) -> Result<HealthReport> {
    let horizons = &config.report.horizons;

    let current_rows = load_records(current)
        .with_context(|| format!("failed to load current period from {}", current.display()))?;
    let previous_rows = load_records(previous)
        .with_context(|| format!("failed to load previous period from {}", previous.display()))?;

    tracing::info!(
        current_rows = current_rows.len(),
        previous_rows = previous_rows.len(),
        "loaded warehouse exports"
    );

    let current_period = derive_all(
        &aggregate(&current_rows, &config.schema).context("failed to aggregate current period")?,
        horizons,
    );
    let previous_period = derive_all(
        &aggregate(&previous_rows, &config.schema)
            .context("failed to aggregate previous period")?,
        horizons,
    );

    let records =
        compare(&current_period, &previous_period).context("failed to compare periods")?;

    Ok(assemble(report_date, scope, &records, thresholds))
}

#[allow(clippy::too_many_arguments)]
fn run_report(
    config: &Config,
    scope: PeriodScope,
    current: &PathBuf,
    previous: &PathBuf,
    date: Option<NaiveDate>,
    product: Option<Product>,
    format: &str,
    export: bool,
) -> Result<()> {
    let report_date = date.unwrap_or_else(|| Local::now().date_naive());
    let _span = logging::report_span(scope, report_date).entered();

    let thresholds = effective_thresholds(config, product);
    let report = build_report(config, &thresholds, scope, current, previous, report_date)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "text" => render::print_report(&report),
        other => anyhow::bail!("unsupported output format '{}' (expected text or json)", other),
    }

    if export {
        let dir = config.export_dir();
        let now = Local::now().naive_local();
        let stem = match scope {
            PeriodScope::DayOverDay => "daily_health",
            PeriodScope::WeekOverWeek => "weekly_cohorts",
        };
        let csv_path = write_sources_csv(&report, &dir, stem, now)?;
        let json_path = write_report_json(&report, &dir, stem, now)?;
        println!("\nExported:");
        println!("  {}", csv_path.display());
        println!("  {}", json_path.display());
    }

    Ok(())
}

fn run_export(config: &Config, input: &PathBuf, out_dir: Option<PathBuf>) -> Result<()> {
    let rows = load_records(input)
        .with_context(|| format!("failed to load export from {}", input.display()))?;

    let period = derive_all(
        &aggregate(&rows, &config.schema).context("failed to aggregate input")?,
        &config.report.horizons,
    );
    // Single-period export: no previous side, all deltas stay empty.
    let records = compare(&period, &[]).context("failed to build records")?;
    let report = assemble(
        Local::now().date_naive(),
        PeriodScope::DayOverDay,
        &records,
        &config.thresholds,
    );

    let dir = out_dir.unwrap_or_else(|| config.export_dir());
    let now = Local::now().naive_local();
    let csv_path = write_sources_csv(&report, &dir, "cohort_summary", now)?;
    let json_path = write_report_json(&report, &dir, "cohort_summary", now)?;

    println!("Aggregated {} rows into {} groups.", rows.len(), report.sources.len());
    println!("  {}", csv_path.display());
    println!("  {}", json_path.display());
    Ok(())
}
