//! Plain-text rendering of health reports.
//!
//! Keeps the layout of the old report scripts: overview block, per-source
//! table sorted by spend, alert list with recommended actions, then the
//! positive signals. Missing metrics render as `n/a`, never as zero.

use cohortscope_core::alert::{KpiTargets, RuleDescriptor, ThresholdConfig};
use cohortscope_core::format;
use cohortscope_core::report::HealthReport;
use cohortscope_core::Severity;

const RULE_WIDTH: usize = 24;

pub fn print_report(report: &HealthReport) {
    let title = format!(
        "{} report for {}",
        report.scope.as_str(),
        report.report_date
    );
    println!("{}", title);
    println!("{}", "=".repeat(title.len().max(40)));

    print_overview(report);
    print_sources(report);
    print_alerts(report);
    print_highlights(report);
}

fn print_overview(report: &HealthReport) {
    let o = &report.overview;
    println!("\nOverview");
    println!(
        "  Spend:    {} ({})",
        format::money(Some(o.total_spend)),
        format::signed_pct(o.spend_change_pct)
    );
    println!(
        "  Installs: {} ({})",
        format::count(o.total_installs),
        format::signed_pct(o.installs_change_pct)
    );
    println!("  Blended CPI: {}", format::money(o.blended_cpi));
    for (horizon, roas) in &o.blended_roas {
        println!("  Blended {} ROAS: {}", horizon, format::ratio(*roas));
    }
}

fn print_sources(report: &HealthReport) {
    if report.sources.is_empty() {
        println!("\nNo sources in the current period.");
        return;
    }

    let key_width = report
        .sources
        .iter()
        .map(|r| r.key.to_string().len())
        .max()
        .unwrap_or(6)
        .max(6);

    println!("\nSources (by spend)");
    println!(
        "  {:<key_width$}  {:>12}  {:>9}  {:>8}  {:>8}  {:>7}  {:>8}  {}",
        "source", "spend", "installs", "cpi", "roas", "share", "chg", "status",
    );
    for row in &report.sources {
        println!(
            "  {:<key_width$}  {:>12}  {:>9}  {:>8}  {:>8}  {:>7}  {:>8}  {}",
            row.key.to_string(),
            format::money(Some(row.spend)),
            format::count(row.installs),
            format::money(row.cpi),
            format::ratio(row.roas),
            format::pct(row.spend_share_pct),
            format::signed_pct(row.spend_change_pct),
            row.severity.as_str(),
        );
    }
}

fn print_alerts(report: &HealthReport) {
    println!("\nAlerts");
    if report.alerts.is_empty() {
        println!("  none, all sources within thresholds");
        return;
    }
    for alert in &report.alerts {
        let rule = alert.rule.map(|r| r.as_str()).unwrap_or("-");
        println!(
            "  [{}] {} ({}): {}",
            alert.severity.as_str(),
            alert.key,
            rule,
            alert.detail
        );
        println!("    -> {}", alert.action);
    }
}

fn print_highlights(report: &HealthReport) {
    if !report.strong_performers.is_empty() {
        println!("\nStrong performers");
        for p in &report.strong_performers {
            println!(
                "  {} scaled installs {} while CPI moved {}",
                p.key,
                format::signed_pct(Some(p.installs_change_pct)),
                format::signed_pct(Some(p.cpi_change_pct)),
            );
        }
    }

    if !report.retention_decliners.is_empty() {
        println!("\nRetention decliners ({} retention)", report.primary_horizon);
        for key in &report.retention_decliners {
            println!("  {}", key);
        }
    }
}

pub fn print_rules(rules: &[RuleDescriptor], thresholds: &ThresholdConfig, targets: &KpiTargets) {
    println!("Classifier rules (evaluated in order, first match wins):\n");
    for (i, desc) in rules.iter().enumerate() {
        println!(
            "  {}. {:<RULE_WIDTH$} {:<8}  {}",
            i + 1,
            desc.rule.as_str(),
            desc.severity.as_str(),
            desc.condition
        );
        println!("     {:<RULE_WIDTH$} {:<8}  -> {}", "", "", desc.action);
    }
    println!(
        "  -. {:<RULE_WIDTH$} {:<8}  spend > 0 and nothing matched",
        "(monitor)",
        Severity::Monitor.as_str()
    );
    println!(
        "  -. {:<RULE_WIDTH$} {:<8}  zero spend, nothing to evaluate",
        "(none)",
        Severity::None.as_str()
    );

    println!("\nEffective thresholds:");
    println!("  cpi_spike_pct            = {}", thresholds.cpi_spike_pct);
    println!("  volume_drop_pct          = {}", thresholds.volume_drop_pct);
    println!("  retention_drop_pct       = {}", thresholds.retention_drop_pct);
    println!("  roas_drop_pct            = {}", thresholds.roas_drop_pct);
    println!("  min_spend_for_alert      = {}", thresholds.min_spend_for_alert);
    println!("  high_spend_threshold     = {}", thresholds.high_spend_threshold);
    println!("  high_cpi_threshold       = {}", thresholds.high_cpi_threshold);
    println!("  min_spend_for_roas_alert = {}", thresholds.min_spend_for_roas_alert);
    match thresholds.min_roas_threshold {
        Some(floor) => println!("  min_roas_threshold       = {}", floor),
        None => println!("  min_roas_threshold       = unset (low_roas rule skipped)"),
    }
    println!("  primary_horizon          = {}", thresholds.primary_horizon);

    println!("\nKPI targets (select with --product to derive the ROAS floor):");
    println!(
        "  offerwall: roas_d90 = {}, min_chapter3_cvr = {}",
        targets.offerwall.roas_d90, targets.offerwall.min_chapter3_cvr
    );
    println!(
        "  non_offerwall: roas_d365 = {}, roas_d180 = {}, min_d7_retention = {}, target_d7_retention = {}",
        targets.non_offerwall.roas_d365,
        targets.non_offerwall.roas_d180,
        targets.non_offerwall.min_d7_retention,
        targets.non_offerwall.target_d7_retention
    );
}
