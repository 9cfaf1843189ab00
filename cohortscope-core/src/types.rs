//! Core domain types for cohortscope
//!
//! These types form the pipeline's data model: raw warehouse rows are
//! aggregated into [`CohortRow`]s, derived into [`DerivedMetricSet`]s,
//! joined across periods into [`ComparisonRecord`]s, and classified into
//! [`Alert`]s. All of them are plain, immutable-after-construction
//! structures that any rendering or export layer can consume.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Cohort** | Installs sharing an install date (and typically source/platform/country) |
//! | **Horizon** | Day offset from install at which cumulative metrics are measured (`"d0"`, `"d7"`, ...) |
//! | **CPI** | Cost per install: `spend / installs` |
//! | **ROAS** | Return on ad spend at a horizon: `revenue[h] / spend` |
//! | **ARPU** | Average revenue per install at a horizon: `revenue[h] / installs` |
//! | **Retention rate** | Fraction of a cohort still active at a horizon, in `[0, 1]` |
//!
//! Ratios that cannot be computed (zero denominator, unmatured horizon,
//! missing counterpart period) are `None`, never zero or infinity. See
//! [`crate::ratio`].

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A raw warehouse row: field name to JSON value.
///
/// This is the ingestion contract: numbers, strings, and nulls as exported
/// from the warehouse query result (CSV or JSON, see [`crate::ingest`]).
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Bucket value used when a record is missing a group-by field.
///
/// Records with an absent grouping value are never dropped; they land here.
pub const UNKNOWN_BUCKET: &str = "unknown";

// ============================================
// Group keys
// ============================================

/// Ordered tuple of category values identifying one group
/// (e.g., `["applovin", "ios", "US"]` for source/platform/country).
///
/// Keys are compared position-by-position; the field names that produced the
/// values live in the aggregation spec, not in the key itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey(pub Vec<String>);

impl GroupKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GroupKey(parts.into_iter().map(Into::into).collect())
    }

    /// The key's category values, in group-by order.
    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

// ============================================
// Aggregated rows
// ============================================

/// One grouping-key instance of aggregated performance for a period.
///
/// Constructed fresh per report run by [`crate::aggregate::aggregate`];
/// never persisted by the core.
#[derive(Debug, Clone, Serialize)]
pub struct CohortRow {
    /// Grouping key (ordered tuple of category values)
    pub key: GroupKey,
    /// Total spend, non-negative
    pub spend: f64,
    /// Total installs
    pub installs: i64,
    /// Horizon label to cumulative net revenue; `None` when the horizon has
    /// not matured for any contributing record
    pub revenue: BTreeMap<String, Option<f64>>,
    /// Horizon label to average retention rate in `[0, 1]`; nulls are
    /// excluded from the average, not counted as zero
    pub retention: BTreeMap<String, Option<f64>>,
    /// Additional summed measures declared by the caller
    pub sums: BTreeMap<String, f64>,
    /// Additional averaged measures declared by the caller
    pub avgs: BTreeMap<String, Option<f64>>,
}

// ============================================
// Derived metrics
// ============================================

/// Per-key derived ratios computed from a [`CohortRow`].
///
/// Every ratio is `None` rather than infinite or NaN when its denominator is
/// zero or its numerator is absent.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedMetricSet {
    pub key: GroupKey,
    pub spend: f64,
    pub installs: i64,
    /// `spend / installs`, `None` when installs is zero
    pub cpi: Option<f64>,
    /// Horizon label to `revenue[h] / spend`
    pub roas: BTreeMap<String, Option<f64>>,
    /// Horizon label to `revenue[h] / installs`
    pub arpu: BTreeMap<String, Option<f64>>,
    /// Retention rates carried through from the aggregated row
    pub retention: BTreeMap<String, Option<f64>>,
}

impl DerivedMetricSet {
    /// ROAS at the given horizon, if computed.
    pub fn roas_at(&self, horizon: &str) -> Option<f64> {
        self.roas.get(horizon).copied().flatten()
    }

    /// Retention rate at the given horizon, if known.
    pub fn retention_at(&self, horizon: &str) -> Option<f64> {
        self.retention.get(horizon).copied().flatten()
    }
}

// ============================================
// Period comparison
// ============================================

/// Percentage deltas between two periods, per metric.
///
/// `(current - previous) / previous` for each metric; `None` when either
/// side is missing or the previous value is zero.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricDeltas {
    pub spend: Option<f64>,
    pub installs: Option<f64>,
    pub cpi: Option<f64>,
    pub roas: BTreeMap<String, Option<f64>>,
    pub arpu: BTreeMap<String, Option<f64>>,
    pub retention: BTreeMap<String, Option<f64>>,
}

impl MetricDeltas {
    /// ROAS delta at the given horizon, if computed.
    pub fn roas_at(&self, horizon: &str) -> Option<f64> {
        self.roas.get(horizon).copied().flatten()
    }
}

/// A current-period metric set paired with its previous-period counterpart.
///
/// A key present only in the current period still produces a valid record:
/// `previous` is `None` and every delta is `None`.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRecord {
    pub key: GroupKey,
    pub current: DerivedMetricSet,
    pub previous: Option<DerivedMetricSet>,
    pub deltas: MetricDeltas,
}

// ============================================
// Alerts
// ============================================

/// Alert severity tier, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Monitor,
    None,
}

impl Severity {
    /// Display label used in report output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Warning => "WARNING",
            Severity::Monitor => "MONITOR",
            Severity::None => "NONE",
        }
    }
}

/// Identifier of a threshold rule in the classifier cascade.
///
/// Variant order matches evaluation priority: the first rule that matches a
/// record wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertRule {
    /// Day-over-day CPI increase beyond threshold on meaningful spend
    CpiSpike,
    /// Day-over-day install volume drop beyond threshold on meaningful spend
    VolumeDrop,
    /// Absolute CPI above threshold while spend is high
    HighCpi,
    /// ROAS at the primary horizon below the product's minimum
    LowRoas,
    /// Day-over-day ROAS decline beyond threshold on meaningful spend
    RoasDecline,
}

impl AlertRule {
    /// Stable identifier used in exports and the rule registry.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertRule::CpiSpike => "cpi_spike",
            AlertRule::VolumeDrop => "volume_drop",
            AlertRule::HighCpi => "high_cpi_on_high_spend",
            AlertRule::LowRoas => "low_roas",
            AlertRule::RoasDecline => "roas_decline",
        }
    }

    /// Severity tier this rule emits.
    pub fn severity(&self) -> Severity {
        match self {
            AlertRule::CpiSpike | AlertRule::VolumeDrop => Severity::Critical,
            AlertRule::HighCpi | AlertRule::LowRoas | AlertRule::RoasDecline => Severity::Warning,
        }
    }

    /// Recommended action for the UA team when this rule fires.
    pub fn action(&self) -> &'static str {
        match self {
            AlertRule::CpiSpike => "Reduce spend or investigate targeting",
            AlertRule::VolumeDrop => "Check campaign status and bid adjustments",
            AlertRule::HighCpi => "Consider pausing or reducing budget",
            AlertRule::LowRoas => "Immediate optimization needed",
            AlertRule::RoasDecline => "Review creative and targeting",
        }
    }
}

/// Classification of one [`ComparisonRecord`] against the thresholds.
///
/// Ephemeral: recomputed every run, never mutated after creation. Exactly one
/// alert is produced per record (first matching rule wins).
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub key: GroupKey,
    pub severity: Severity,
    /// The rule that fired, or `None` for MONITOR/NONE outcomes
    pub rule: Option<AlertRule>,
    pub action: String,
    /// Human-readable description of what triggered the alert
    pub detail: String,
}
