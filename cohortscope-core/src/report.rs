//! Report assembly: classified, compared rows into a health report.
//!
//! Turns the pipeline's output (comparison records + alerts) into the
//! structure the daily and weekly reports print and export: overview totals
//! with blended CPI, per-source rows with spend share, actionable alerts
//! sorted by severity, strong performers, and retention decliners.

use crate::alert::{classify, ThresholdConfig};
use crate::ratio::{delta_pct, safe_div};
use crate::types::{Alert, ComparisonRecord, GroupKey, Severity};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Installs growth beyond which a source counts as scaling.
const STRONG_PERFORMER_VOLUME_GAIN: f64 = 0.25;
/// CPI drift a scaling source may show and still count as strong.
const STRONG_PERFORMER_MAX_CPI_DRIFT: f64 = 0.05;

/// What the compared periods represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodScope {
    DayOverDay,
    WeekOverWeek,
}

impl PeriodScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodScope::DayOverDay => "day-over-day",
            PeriodScope::WeekOverWeek => "week-over-week",
        }
    }
}

/// Blended totals across all sources in the current period.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub total_spend: f64,
    pub total_installs: i64,
    /// Total spend over total installs, `None` when no installs
    pub blended_cpi: Option<f64>,
    /// Spend-weighted ROAS per horizon across sources with matured revenue
    pub blended_roas: BTreeMap<String, Option<f64>>,
    /// Change vs. the previous period's totals (only sources present in both)
    pub spend_change_pct: Option<f64>,
    pub installs_change_pct: Option<f64>,
}

/// One source (or other group key) in the report table.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRow {
    pub key: GroupKey,
    pub spend: f64,
    pub installs: i64,
    pub cpi: Option<f64>,
    /// ROAS at the report's primary horizon
    pub roas: Option<f64>,
    /// Share of the current period's total spend
    pub spend_share_pct: Option<f64>,
    pub spend_change_pct: Option<f64>,
    pub installs_change_pct: Option<f64>,
    pub cpi_change_pct: Option<f64>,
    pub roas_change_pct: Option<f64>,
    pub severity: Severity,
}

/// A source that scaled volume without losing efficiency.
#[derive(Debug, Clone, Serialize)]
pub struct StrongPerformer {
    pub key: GroupKey,
    pub installs_change_pct: f64,
    pub cpi_change_pct: f64,
}

/// Assembled health report for one compared period pair.
///
/// Plain data, serializable; rendering (text tables, CSV, JSON files) is the
/// consumer's job.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub report_date: NaiveDate,
    pub scope: PeriodScope,
    pub primary_horizon: String,
    pub overview: Overview,
    /// All sources, ordered by current spend, highest first
    pub sources: Vec<SourceRow>,
    /// Actionable alerts only (CRITICAL and WARNING), most severe first
    pub alerts: Vec<Alert>,
    pub strong_performers: Vec<StrongPerformer>,
    /// Keys whose primary-horizon retention declined beyond retention_drop_pct
    pub retention_decliners: Vec<GroupKey>,
}

/// Assemble a health report from compared records.
///
/// Classifies every record against `cfg`, computes blended totals, and sorts
/// sources by spend. Pure over its inputs; safe to call concurrently for
/// independent report runs.
pub fn assemble(
    report_date: NaiveDate,
    scope: PeriodScope,
    records: &[ComparisonRecord],
    cfg: &ThresholdConfig,
) -> HealthReport {
    let total_spend: f64 = records.iter().map(|r| r.current.spend).sum();
    let total_installs: i64 = records.iter().map(|r| r.current.installs).sum();

    let prev_spend: f64 = records
        .iter()
        .filter_map(|r| r.previous.as_ref())
        .map(|p| p.spend)
        .sum();
    let prev_installs: i64 = records
        .iter()
        .filter_map(|r| r.previous.as_ref())
        .map(|p| p.installs)
        .sum();
    let any_previous = records.iter().any(|r| r.previous.is_some());

    let horizon = cfg.primary_horizon.as_str();

    let mut sources: Vec<SourceRow> = Vec::with_capacity(records.len());
    let mut alerts: Vec<Alert> = Vec::new();
    let mut strong_performers: Vec<StrongPerformer> = Vec::new();
    let mut retention_decliners: Vec<GroupKey> = Vec::new();

    for record in records {
        let alert = classify(record, cfg);

        sources.push(SourceRow {
            key: record.key.clone(),
            spend: record.current.spend,
            installs: record.current.installs,
            cpi: record.current.cpi,
            roas: record.current.roas_at(horizon),
            spend_share_pct: safe_div(Some(record.current.spend), Some(total_spend)),
            spend_change_pct: record.deltas.spend,
            installs_change_pct: record.deltas.installs,
            cpi_change_pct: record.deltas.cpi,
            roas_change_pct: record.deltas.roas_at(horizon),
            severity: alert.severity,
        });

        if let (Some(volume), Some(cpi_drift)) = (record.deltas.installs, record.deltas.cpi) {
            if volume > STRONG_PERFORMER_VOLUME_GAIN && cpi_drift < STRONG_PERFORMER_MAX_CPI_DRIFT
            {
                strong_performers.push(StrongPerformer {
                    key: record.key.clone(),
                    installs_change_pct: volume,
                    cpi_change_pct: cpi_drift,
                });
            }
        }

        if let Some(retention_delta) = record
            .deltas
            .retention
            .get(horizon)
            .copied()
            .flatten()
        {
            if retention_delta < -cfg.retention_drop_pct {
                retention_decliners.push(record.key.clone());
            }
        }

        if matches!(alert.severity, Severity::Critical | Severity::Warning) {
            alerts.push(alert);
        }
    }

    sources.sort_by(|a, b| b.spend.total_cmp(&a.spend));
    alerts.sort_by_key(|a| a.severity);

    let blended_roas = blended_roas(records, horizon);

    HealthReport {
        report_date,
        scope,
        primary_horizon: horizon.to_string(),
        overview: Overview {
            total_spend,
            total_installs,
            blended_cpi: safe_div(Some(total_spend), Some(total_installs as f64)),
            blended_roas,
            spend_change_pct: if any_previous {
                delta_pct(Some(total_spend), Some(prev_spend))
            } else {
                None
            },
            installs_change_pct: if any_previous {
                delta_pct(Some(total_installs as f64), Some(prev_installs as f64))
            } else {
                None
            },
        },
        sources,
        alerts,
        strong_performers,
        retention_decliners,
    }
}

/// Spend-weighted ROAS across sources, per horizon found in the records.
///
/// Equivalent to total revenue over total spend, restricted to sources whose
/// revenue at the horizon has matured; `None` when none have.
fn blended_roas(records: &[ComparisonRecord], primary: &str) -> BTreeMap<String, Option<f64>> {
    let mut horizons: Vec<&String> = records
        .iter()
        .flat_map(|r| r.current.roas.keys())
        .collect();
    horizons.sort();
    horizons.dedup();

    let mut out = BTreeMap::new();
    for horizon in horizons {
        let mut revenue = 0.0;
        let mut spend = 0.0;
        for record in records {
            if let Some(roas) = record.current.roas_at(horizon) {
                revenue += roas * record.current.spend;
                spend += record.current.spend;
            }
        }
        out.insert(horizon.clone(), safe_div(Some(revenue), Some(spend)));
    }
    // The primary horizon always has an entry, even when nothing matured.
    out.entry(primary.to_string()).or_insert(None);
    out
}
