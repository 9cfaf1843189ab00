//! Report export: timestamped CSV and JSON files.
//!
//! File naming follows the convention the reporting scripts always used:
//! `<stem>_<YYYYmmdd_HHMMSS>.<ext>`, so repeated runs never clobber each
//! other and a directory listing reads as a timeline.

use crate::error::Result;
use crate::format;
use crate::report::HealthReport;
use chrono::NaiveDateTime;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Build a timestamped export filename, e.g.
/// `daily_health_20260209_143000.csv`.
pub fn timestamped_filename(stem: &str, extension: &str, at: NaiveDateTime) -> String {
    format!("{}_{}.{}", stem, at.format("%Y%m%d_%H%M%S"), extension)
}

/// Write the full report as pretty JSON. Returns the file path.
pub fn write_report_json(
    report: &HealthReport,
    dir: &Path,
    stem: &str,
    at: NaiveDateTime,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(timestamped_filename(stem, "json", at));
    let file = File::create(&path)?;
    serde_json::to_writer_pretty(file, report)?;
    tracing::info!(path = %path.display(), "wrote report JSON");
    Ok(path)
}

/// Write the per-source table as CSV. Returns the file path.
///
/// Missing metrics are written as empty cells (the CSV analogue of "n/a"),
/// never as zeros.
pub fn write_sources_csv(
    report: &HealthReport,
    dir: &Path,
    stem: &str,
    at: NaiveDateTime,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(timestamped_filename(stem, "csv", at));
    let mut writer = csv::Writer::from_path(&path)?;

    let roas_header = format!("{}_roas", report.primary_horizon);
    writer.write_record([
        "key",
        "spend",
        "installs",
        "cpi",
        roas_header.as_str(),
        "spend_share_pct",
        "spend_change_pct",
        "installs_change_pct",
        "cpi_change_pct",
        "roas_change_pct",
        "severity",
    ])?;

    for row in &report.sources {
        writer.write_record([
            row.key.to_string(),
            format!("{:.2}", row.spend),
            row.installs.to_string(),
            optional(row.cpi, 4),
            optional(row.roas, 4),
            optional(row.spend_share_pct, 4),
            optional(row.spend_change_pct, 4),
            optional(row.installs_change_pct, 4),
            optional(row.cpi_change_pct, 4),
            optional(row.roas_change_pct, 4),
            row.severity.as_str().to_string(),
        ])?;
    }

    writer.flush()?;
    tracing::info!(path = %path.display(), rows = report.sources.len(), "wrote sources CSV");
    Ok(path)
}

fn optional(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => String::new(),
    }
}

/// One-line overview summary, shared by CLI output and log lines.
pub fn overview_line(report: &HealthReport) -> String {
    format!(
        "spend {} | installs {} | blended CPI {} | {} ROAS {}",
        format::money(Some(report.overview.total_spend)),
        format::count(report.overview.total_installs),
        format::money(report.overview.blended_cpi),
        report.primary_horizon,
        format::ratio(
            report
                .overview
                .blended_roas
                .get(&report.primary_horizon)
                .copied()
                .flatten()
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::ThresholdConfig;
    use crate::report::{assemble, PeriodScope};
    use crate::types::{ComparisonRecord, DerivedMetricSet, GroupKey, MetricDeltas};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn sample_report() -> HealthReport {
        let mut roas = BTreeMap::new();
        roas.insert("d7".to_string(), Some(0.12));
        let current = DerivedMetricSet {
            key: GroupKey::new(["applovin", "ios"]),
            spend: 1500.0,
            installs: 120,
            cpi: Some(12.5),
            roas,
            arpu: BTreeMap::new(),
            retention: BTreeMap::new(),
        };
        let record = ComparisonRecord {
            key: current.key.clone(),
            current,
            previous: None,
            deltas: MetricDeltas::default(),
        };
        assemble(
            NaiveDate::from_ymd_opt(2026, 2, 9).expect("valid date"),
            PeriodScope::DayOverDay,
            &[record],
            &ThresholdConfig::default(),
        )
    }

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 9)
            .expect("valid date")
            .and_hms_opt(14, 30, 0)
            .expect("valid time")
    }

    #[test]
    fn test_timestamped_filename() {
        assert_eq!(
            timestamped_filename("daily_health", "csv", at()),
            "daily_health_20260209_143000.csv"
        );
    }

    #[test]
    fn test_csv_export_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_sources_csv(&sample_report(), dir.path(), "daily_health", at()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();

        let mut lines = content.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("key,spend,installs,cpi,d7_roas"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("applovin/ios,1500.00,120,12.5000,0.1200"));
        // missing deltas are empty cells, not zeros
        assert!(row.contains(",,"));
    }

    #[test]
    fn test_json_export_parses_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_report_json(&sample_report(), dir.path(), "daily_health", at()).unwrap();
        let value: serde_json::Value =
            serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(value["scope"], "day_over_day");
        assert_eq!(value["overview"]["total_installs"], 120);
    }

    #[test]
    fn test_overview_line_renders_na_for_missing() {
        let mut report = sample_report();
        report.overview.blended_cpi = None;
        let line = overview_line(&report);
        assert!(line.contains("blended CPI n/a"));
    }
}
