//! Period comparison: day-over-day and week-over-week metric deltas.
//!
//! Joins two derived periods on the grouping key with left-outer semantics
//! from the current period's side: every current key yields exactly one
//! [`ComparisonRecord`]; keys present only in the previous period are dropped
//! (an entity absent today is not reportable as "changed").
//!
//! ## Duplicate-key policy
//!
//! A key appearing more than once in either input means the caller skipped
//! aggregation; the comparator rejects it with [`Error::DuplicateKey`] rather
//! than silently letting the last occurrence win. This is deliberate and
//! covered by tests.

use crate::error::{Error, Result};
use crate::ratio::delta_pct;
use crate::types::{ComparisonRecord, DerivedMetricSet, GroupKey, MetricDeltas};
use std::collections::HashMap;

/// Compare a current period against a previous one.
///
/// A current key with no previous counterpart still produces a valid record
/// with all deltas `None`, never a lookup failure.
pub fn compare(
    current: &[DerivedMetricSet],
    previous: &[DerivedMetricSet],
) -> Result<Vec<ComparisonRecord>> {
    reject_duplicates(current, "current")?;
    reject_duplicates(previous, "previous")?;

    let prev_by_key: HashMap<&GroupKey, &DerivedMetricSet> =
        previous.iter().map(|m| (&m.key, m)).collect();

    Ok(current
        .iter()
        .map(|cur| {
            let prev = prev_by_key.get(&cur.key).copied();
            ComparisonRecord {
                key: cur.key.clone(),
                current: cur.clone(),
                previous: prev.cloned(),
                deltas: deltas(cur, prev),
            }
        })
        .collect())
}

fn reject_duplicates(period: &[DerivedMetricSet], side: &'static str) -> Result<()> {
    let mut seen: HashMap<&GroupKey, ()> = HashMap::with_capacity(period.len());
    for m in period {
        if seen.insert(&m.key, ()).is_some() {
            return Err(Error::DuplicateKey {
                key: m.key.to_string(),
                side,
            });
        }
    }
    Ok(())
}

fn deltas(current: &DerivedMetricSet, previous: Option<&DerivedMetricSet>) -> MetricDeltas {
    let Some(prev) = previous else {
        return MetricDeltas::default();
    };

    let mut out = MetricDeltas {
        spend: delta_pct(Some(current.spend), Some(prev.spend)),
        installs: delta_pct(Some(current.installs as f64), Some(prev.installs as f64)),
        cpi: delta_pct(current.cpi, prev.cpi),
        ..MetricDeltas::default()
    };
    for (horizon, &cur) in &current.roas {
        let prev_v = prev.roas.get(horizon).copied().flatten();
        out.roas.insert(horizon.clone(), delta_pct(cur, prev_v));
    }
    for (horizon, &cur) in &current.arpu {
        let prev_v = prev.arpu.get(horizon).copied().flatten();
        out.arpu.insert(horizon.clone(), delta_pct(cur, prev_v));
    }
    for (horizon, &cur) in &current.retention {
        let prev_v = prev.retention.get(horizon).copied().flatten();
        out.retention.insert(horizon.clone(), delta_pct(cur, prev_v));
    }
    out
}
