//! Derived metrics: CPI, ROAS, and ARPU from aggregated cohort rows.
//!
//! Pure functions with no side effects, deterministic for identical input.
//! Every ratio goes through [`safe_div`], so a zero-install row yields
//! `cpi = None` and a zero-spend row yields `roas = None` instead of a
//! division panic or an infinity leaking into a report.

use crate::ratio::safe_div;
use crate::types::{CohortRow, DerivedMetricSet};
use std::collections::BTreeMap;

/// Compute the derived metric set for one aggregated row.
///
/// `horizons` selects which revenue horizons get ROAS/ARPU; a horizon with no
/// revenue column in the row simply derives to `None`.
pub fn derive(row: &CohortRow, horizons: &[String]) -> DerivedMetricSet {
    let spend = Some(row.spend);
    let installs = Some(row.installs as f64);

    let mut roas = BTreeMap::new();
    let mut arpu = BTreeMap::new();
    for horizon in horizons {
        let revenue = row.revenue.get(horizon).copied().flatten();
        roas.insert(horizon.clone(), safe_div(revenue, spend));
        arpu.insert(horizon.clone(), safe_div(revenue, installs));
    }

    DerivedMetricSet {
        key: row.key.clone(),
        spend: row.spend,
        installs: row.installs,
        cpi: safe_div(spend, installs),
        roas,
        arpu,
        retention: row.retention.clone(),
    }
}

/// Derive metrics for a whole period of aggregated rows, preserving order.
pub fn derive_all(rows: &[CohortRow], horizons: &[String]) -> Vec<DerivedMetricSet> {
    rows.iter().map(|row| derive(row, horizons)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GroupKey;

    fn row(spend: f64, installs: i64, d0_revenue: Option<f64>) -> CohortRow {
        let mut revenue = BTreeMap::new();
        revenue.insert("d0".to_string(), d0_revenue);
        CohortRow {
            key: GroupKey::new(["applovin"]),
            spend,
            installs,
            revenue,
            retention: BTreeMap::new(),
            sums: BTreeMap::new(),
            avgs: BTreeMap::new(),
        }
    }

    fn horizons() -> Vec<String> {
        vec!["d0".to_string()]
    }

    #[test]
    fn test_cpi_roas_arpu() {
        let m = derive(&row(1000.0, 100, Some(50.0)), &horizons());
        assert_eq!(m.cpi, Some(10.0));
        assert_eq!(m.roas["d0"], Some(0.05));
        assert_eq!(m.arpu["d0"], Some(0.5));
    }

    #[test]
    fn test_zero_installs_null_cpi() {
        let m = derive(&row(1000.0, 0, Some(50.0)), &horizons());
        assert_eq!(m.cpi, None);
        assert_eq!(m.arpu["d0"], None);
        assert_eq!(m.roas["d0"], Some(0.05));
    }

    #[test]
    fn test_zero_spend_null_roas() {
        let m = derive(&row(0.0, 100, Some(50.0)), &horizons());
        assert_eq!(m.roas["d0"], None);
        assert_eq!(m.cpi, Some(0.0));
    }

    #[test]
    fn test_unmatured_revenue_propagates_null() {
        let m = derive(&row(1000.0, 100, None), &horizons());
        assert_eq!(m.roas["d0"], None);
        assert_eq!(m.arpu["d0"], None);
    }

    #[test]
    fn test_derive_is_deterministic() {
        let input = row(1234.5, 67, Some(89.0));
        let a = derive(&input, &horizons());
        let b = derive(&input, &horizons());
        assert_eq!(a.cpi, b.cpi);
        assert_eq!(a.roas, b.roas);
        assert_eq!(a.arpu, b.arpu);
    }
}
