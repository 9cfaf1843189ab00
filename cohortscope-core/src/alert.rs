//! Threshold-based alert classification for UA source performance.
//!
//! This is the rule cascade the daily health check runs over every compared
//! source/campaign row. Rules are evaluated in a fixed priority order and the
//! first match wins: a row that spikes CPI *and* has low ROAS reports the
//! CPI spike only. Exactly one [`Alert`] is produced per record.
//!
//! ## Rules (priority order)
//!
//! | # | Rule | Severity | Condition |
//! |---|------|----------|-----------|
//! | 1 | `cpi_spike` | CRITICAL | CPI delta > `cpi_spike_pct` on eligible spend |
//! | 2 | `volume_drop` | CRITICAL | install delta < -`volume_drop_pct` on eligible spend |
//! | 3 | `high_cpi_on_high_spend` | WARNING | CPI > `high_cpi_threshold` and spend >= `high_spend_threshold` |
//! | 4 | `low_roas` | WARNING | ROAS at primary horizon < `min_roas_threshold` and spend >= `min_spend_for_roas_alert` |
//! | 5 | `roas_decline` | WARNING | ROAS delta < -`roas_drop_pct` on eligible spend |
//! | - | (no rule) | MONITOR | spend > 0, nothing matched |
//! | - | (no rule) | NONE | zero spend, nothing to evaluate |
//!
//! "Eligible spend" is `spend >= min_spend_for_alert`, boundary inclusive.
//! A `None` operand never matches a rule; missing deltas (first day of a new
//! source) fall through to MONITOR instead of crashing or alerting.

use crate::types::{Alert, AlertRule, ComparisonRecord, Severity};
use serde::Deserialize;

// ============================================
// Threshold configuration
// ============================================

/// Process-wide rule thresholds. Loaded once per run, never mutated during a
/// run; pass one per report so concurrent runs for different products or date
/// ranges cannot interfere.
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdConfig {
    /// Day-over-day CPI increase that counts as a spike (fraction)
    #[serde(default = "default_cpi_spike_pct")]
    pub cpi_spike_pct: f64,

    /// Day-over-day install decrease that counts as a volume drop (fraction)
    #[serde(default = "default_volume_drop_pct")]
    pub volume_drop_pct: f64,

    /// Retention decline flagged by weekly reports (fraction)
    #[serde(default = "default_retention_drop_pct")]
    pub retention_drop_pct: f64,

    /// Day-over-day ROAS decline that counts as a decline (fraction)
    #[serde(default = "default_roas_drop_pct")]
    pub roas_drop_pct: f64,

    /// Minimum spend for delta-based alerts to fire
    #[serde(default = "default_min_spend_for_alert")]
    pub min_spend_for_alert: f64,

    /// Spend level considered "high" for the absolute-CPI rule
    #[serde(default = "default_high_spend_threshold")]
    pub high_spend_threshold: f64,

    /// Absolute CPI considered too expensive on high spend
    #[serde(default = "default_high_cpi_threshold")]
    pub high_cpi_threshold: f64,

    /// Minimum spend for the low-ROAS rule to fire
    #[serde(default = "default_min_spend_for_roas_alert")]
    pub min_spend_for_roas_alert: f64,

    /// ROAS floor at the primary horizon. Product-specific (offerwall and
    /// non-offerwall targets differ); the low-ROAS rule is skipped when unset.
    #[serde(default)]
    pub min_roas_threshold: Option<f64>,

    /// Horizon the ROAS rules evaluate (e.g., "d0", "d7")
    #[serde(default = "default_primary_horizon")]
    pub primary_horizon: String,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpi_spike_pct: default_cpi_spike_pct(),
            volume_drop_pct: default_volume_drop_pct(),
            retention_drop_pct: default_retention_drop_pct(),
            roas_drop_pct: default_roas_drop_pct(),
            min_spend_for_alert: default_min_spend_for_alert(),
            high_spend_threshold: default_high_spend_threshold(),
            high_cpi_threshold: default_high_cpi_threshold(),
            min_spend_for_roas_alert: default_min_spend_for_roas_alert(),
            min_roas_threshold: None,
            primary_horizon: default_primary_horizon(),
        }
    }
}

fn default_cpi_spike_pct() -> f64 {
    0.20
}

fn default_volume_drop_pct() -> f64 {
    0.30
}

fn default_retention_drop_pct() -> f64 {
    0.10
}

fn default_roas_drop_pct() -> f64 {
    0.15
}

fn default_min_spend_for_alert() -> f64 {
    1000.0
}

fn default_high_spend_threshold() -> f64 {
    5000.0
}

fn default_high_cpi_threshold() -> f64 {
    8.0
}

fn default_min_spend_for_roas_alert() -> f64 {
    2000.0
}

fn default_primary_horizon() -> String {
    "d7".to_string()
}

impl ThresholdConfig {
    /// Derive the product-specific ROAS floor from KPI targets.
    ///
    /// Replaces the per-product target lookups the reporting scripts used to
    /// hard-code; the resulting config is explicit and immutable for the run.
    pub fn with_kpi_targets(mut self, product: Product, targets: &KpiTargets) -> Self {
        let (horizon, floor) = match product {
            Product::Offerwall => ("d90", targets.offerwall.roas_d90),
            Product::NonOfferwall => ("d365", targets.non_offerwall.roas_d365),
        };
        self.primary_horizon = horizon.to_string();
        self.min_roas_threshold = Some(floor);
        self
    }
}

// ============================================
// KPI targets
// ============================================

/// Product context for KPI targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    Offerwall,
    NonOfferwall,
}

impl Product {
    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Offerwall => "offerwall",
            Product::NonOfferwall => "non_offerwall",
        }
    }
}

impl std::str::FromStr for Product {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offerwall" => Ok(Product::Offerwall),
            "non_offerwall" | "non-offerwall" => Ok(Product::NonOfferwall),
            _ => Err(format!("unknown product context: {}", s)),
        }
    }
}

/// Offerwall product targets.
#[derive(Debug, Clone, Deserialize)]
pub struct OfferwallTargets {
    /// 100% net ROAS by day 90
    #[serde(default = "default_one")]
    pub roas_d90: f64,
    /// Minimum conversion rate to chapter 3
    #[serde(default = "default_chapter3_cvr")]
    pub min_chapter3_cvr: f64,
}

/// Non-offerwall product targets.
#[derive(Debug, Clone, Deserialize)]
pub struct NonOfferwallTargets {
    /// 100% net ROAS by day 365
    #[serde(default = "default_one")]
    pub roas_d365: f64,
    /// 90% net ROAS by day 180 counts as on track
    #[serde(default = "default_roas_d180")]
    pub roas_d180: f64,
    /// Minimum acceptable D7 retention
    #[serde(default = "default_min_d7_retention")]
    pub min_d7_retention: f64,
    /// Healthy D7 retention
    #[serde(default = "default_target_d7_retention")]
    pub target_d7_retention: f64,
}

/// Per-product KPI targets, passed explicitly into report runs.
#[derive(Debug, Clone, Deserialize)]
pub struct KpiTargets {
    #[serde(default)]
    pub offerwall: OfferwallTargets,
    #[serde(default)]
    pub non_offerwall: NonOfferwallTargets,
}

impl Default for KpiTargets {
    fn default() -> Self {
        Self {
            offerwall: OfferwallTargets::default(),
            non_offerwall: NonOfferwallTargets::default(),
        }
    }
}

impl Default for OfferwallTargets {
    fn default() -> Self {
        Self {
            roas_d90: default_one(),
            min_chapter3_cvr: default_chapter3_cvr(),
        }
    }
}

impl Default for NonOfferwallTargets {
    fn default() -> Self {
        Self {
            roas_d365: default_one(),
            roas_d180: default_roas_d180(),
            min_d7_retention: default_min_d7_retention(),
            target_d7_retention: default_target_d7_retention(),
        }
    }
}

fn default_one() -> f64 {
    1.00
}

fn default_chapter3_cvr() -> f64 {
    0.08
}

fn default_roas_d180() -> f64 {
    0.90
}

fn default_min_d7_retention() -> f64 {
    0.15
}

fn default_target_d7_retention() -> f64 {
    0.20
}

// ============================================
// Classifier
// ============================================

/// Classify one compared record against the thresholds.
///
/// First matching rule wins; see the module docs for the cascade.
pub fn classify(record: &ComparisonRecord, cfg: &ThresholdConfig) -> Alert {
    let spend = record.current.spend;
    let horizon = cfg.primary_horizon.as_str();

    if spend <= 0.0 {
        return outcome(record, Severity::None, None, "No spend to evaluate");
    }

    let spend_eligible = spend >= cfg.min_spend_for_alert;

    // 1. CRITICAL: CPI spike
    if spend_eligible && exceeds(record.deltas.cpi, cfg.cpi_spike_pct) {
        let detail = format!(
            "CPI spiked {} to {}",
            fmt_pct(record.deltas.cpi),
            fmt_money(record.current.cpi)
        );
        return fired(record, AlertRule::CpiSpike, detail);
    }

    // 2. CRITICAL: volume drop
    if spend_eligible && falls_below(record.deltas.installs, -cfg.volume_drop_pct) {
        let detail = format!(
            "Install volume dropped {} to {} installs",
            fmt_pct(record.deltas.installs.map(f64::abs)),
            record.current.installs
        );
        return fired(record, AlertRule::VolumeDrop, detail);
    }

    // 3. WARNING: high CPI on high spend
    if spend >= cfg.high_spend_threshold && exceeds(record.current.cpi, cfg.high_cpi_threshold) {
        let detail = format!(
            "CPI {} on {} spend",
            fmt_money(record.current.cpi),
            fmt_money(Some(spend))
        );
        return fired(record, AlertRule::HighCpi, detail);
    }

    // 4. WARNING: low ROAS (skipped when no product floor is configured)
    if let Some(floor) = cfg.min_roas_threshold {
        if spend >= cfg.min_spend_for_roas_alert
            && falls_below(record.current.roas_at(horizon), floor)
        {
            let detail = format!(
                "{} ROAS {} below target {:.2}",
                horizon,
                fmt_ratio(record.current.roas_at(horizon)),
                floor
            );
            return fired(record, AlertRule::LowRoas, detail);
        }
    }

    // 5. WARNING: ROAS decline
    if spend_eligible && falls_below(record.deltas.roas_at(horizon), -cfg.roas_drop_pct) {
        let detail = format!(
            "{} ROAS declined {}",
            horizon,
            fmt_pct(record.deltas.roas_at(horizon).map(f64::abs))
        );
        return fired(record, AlertRule::RoasDecline, detail);
    }

    outcome(record, Severity::Monitor, None, "Within thresholds")
}

/// Classify a whole batch, preserving input order.
pub fn classify_all(records: &[ComparisonRecord], cfg: &ThresholdConfig) -> Vec<Alert> {
    records.iter().map(|r| classify(r, cfg)).collect()
}

// Null never matches: a missing delta or metric cannot trigger a rule.
fn exceeds(value: Option<f64>, threshold: f64) -> bool {
    value.map_or(false, |v| v > threshold)
}

fn falls_below(value: Option<f64>, threshold: f64) -> bool {
    value.map_or(false, |v| v < threshold)
}

fn fired(record: &ComparisonRecord, rule: AlertRule, detail: String) -> Alert {
    Alert {
        key: record.key.clone(),
        severity: rule.severity(),
        rule: Some(rule),
        action: rule.action().to_string(),
        detail,
    }
}

fn outcome(record: &ComparisonRecord, severity: Severity, rule: Option<AlertRule>, detail: &str) -> Alert {
    let action = match severity {
        Severity::Monitor => "Continue monitoring",
        _ => "No action required",
    };
    Alert {
        key: record.key.clone(),
        severity,
        rule,
        action: action.to_string(),
        detail: detail.to_string(),
    }
}

fn fmt_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "n/a".to_string(),
    }
}

fn fmt_money(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("${:.2}", v),
        None => "n/a".to_string(),
    }
}

fn fmt_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.3}", v),
        None => "n/a".to_string(),
    }
}

// ============================================
// Rule registry
// ============================================

/// Descriptor for one classifier rule, for discovery and documentation.
#[derive(Debug, Clone)]
pub struct RuleDescriptor {
    pub rule: AlertRule,
    pub severity: Severity,
    pub condition: &'static str,
    pub action: &'static str,
}

const ALL_RULES: &[RuleDescriptor] = &[
    RuleDescriptor {
        rule: AlertRule::CpiSpike,
        severity: Severity::Critical,
        condition: "CPI delta > cpi_spike_pct and spend >= min_spend_for_alert",
        action: "Reduce spend or investigate targeting",
    },
    RuleDescriptor {
        rule: AlertRule::VolumeDrop,
        severity: Severity::Critical,
        condition: "install delta < -volume_drop_pct and spend >= min_spend_for_alert",
        action: "Check campaign status and bid adjustments",
    },
    RuleDescriptor {
        rule: AlertRule::HighCpi,
        severity: Severity::Warning,
        condition: "CPI > high_cpi_threshold and spend >= high_spend_threshold",
        action: "Consider pausing or reducing budget",
    },
    RuleDescriptor {
        rule: AlertRule::LowRoas,
        severity: Severity::Warning,
        condition: "ROAS[primary_horizon] < min_roas_threshold and spend >= min_spend_for_roas_alert",
        action: "Immediate optimization needed",
    },
    RuleDescriptor {
        rule: AlertRule::RoasDecline,
        severity: Severity::Warning,
        condition: "ROAS delta < -roas_drop_pct and spend >= min_spend_for_alert",
        action: "Review creative and targeting",
    },
];

/// List all classifier rules in evaluation order.
pub fn list_rules() -> Vec<RuleDescriptor> {
    ALL_RULES.to_vec()
}
