//! Metric aggregation: raw warehouse rows into [`CohortRow`]s.
//!
//! Mirrors the `GROUP BY` stage that every report starts with. The caller
//! describes the warehouse schema once in a [`SchemaMap`] (group-by columns,
//! spend/installs columns, per-horizon revenue and retention columns) and
//! the aggregator folds any row set into one [`CohortRow`] per distinct key.
//!
//! ## Null semantics
//!
//! - Summed measures treat null/missing as zero.
//! - A per-horizon revenue sum where every contributing value was null stays
//!   `None` (the horizon has not matured).
//! - Averaged measures (retention rates) exclude nulls from both numerator
//!   and count; a null never drags an average toward zero.
//! - Install counts must be whole numbers; a fractional value in the
//!   installs column is malformed, not rounded.
//! - A record missing a group-by field lands in the [`UNKNOWN_BUCKET`],
//!   never silently dropped.
//! - A non-numeric value in a declared numeric column is an
//!   [`Error::MalformedInput`]; coercion to zero applies to declared
//!   summable nulls only, never to garbage.

use crate::error::{Error, Result};
use crate::types::{CohortRow, GroupKey, RawRecord, UNKNOWN_BUCKET};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Maps warehouse column names onto the cohort data model.
///
/// Column names vary across exports (`cost` vs `spend`, `mediasource` vs
/// `source`); reports configure them here instead of re-deriving the same
/// aggregation with renamed fields each time.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct SchemaMap {
    /// Ordered group-by columns; their values form the [`GroupKey`]
    pub group_by: Vec<String>,
    /// Column holding spend (summed)
    pub spend: String,
    /// Column holding install counts (summed)
    pub installs: String,
    /// Horizon label to cumulative-revenue column (summed, null-tolerant)
    pub revenue: BTreeMap<String, String>,
    /// Horizon label to retention-rate column (averaged, nulls excluded)
    pub retention: BTreeMap<String, String>,
    /// Additional columns to sum (null as zero)
    pub sum_fields: Vec<String>,
    /// Additional columns to average (nulls excluded)
    pub avg_fields: Vec<String>,
}

impl Default for SchemaMap {
    /// Column names of the `ua_cohort` warehouse table.
    fn default() -> Self {
        let mut revenue = BTreeMap::new();
        for h in ["d0", "d1", "d7"] {
            revenue.insert(h.to_string(), format!("{h}_total_net_revenue"));
        }
        let mut retention = BTreeMap::new();
        for h in ["d1", "d7"] {
            retention.insert(h.to_string(), format!("{h}_retention"));
        }
        Self {
            group_by: vec!["mediasource".to_string()],
            spend: "cost".to_string(),
            installs: "installs".to_string(),
            revenue,
            retention,
            sum_fields: Vec::new(),
            avg_fields: Vec::new(),
        }
    }
}

impl SchemaMap {
    /// Replace the group-by columns, keeping the measure mapping.
    pub fn grouped_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Horizon labels with a revenue column, in label order.
    pub fn horizons(&self) -> Vec<String> {
        self.revenue.keys().cloned().collect()
    }
}

/// Running sums for one group key.
#[derive(Default)]
struct Accumulator {
    spend: f64,
    installs: i64,
    /// (sum, saw a non-null value)
    revenue: BTreeMap<String, (f64, bool)>,
    /// (sum, non-null count)
    retention: BTreeMap<String, (f64, u64)>,
    sums: BTreeMap<String, f64>,
    avgs: BTreeMap<String, (f64, u64)>,
}

/// Group `rows` by the schema's key columns and fold measures.
///
/// Empty input produces empty output. Result order is insertion order of the
/// first-seen key; callers wanting sorted output sort afterward.
pub fn aggregate(rows: &[RawRecord], schema: &SchemaMap) -> Result<Vec<CohortRow>> {
    let mut order: Vec<GroupKey> = Vec::new();
    let mut groups: HashMap<GroupKey, Accumulator> = HashMap::new();

    for record in rows {
        let key = group_key(record, &schema.group_by);
        let acc = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            Accumulator::default()
        });

        acc.spend += numeric_field(record, &schema.spend)?.unwrap_or(0.0);
        acc.installs += count_field(record, &schema.installs)?.unwrap_or(0);

        for (horizon, column) in &schema.revenue {
            let slot = acc.revenue.entry(horizon.clone()).or_insert((0.0, false));
            if let Some(v) = numeric_field(record, column)? {
                slot.0 += v;
                slot.1 = true;
            }
        }
        for (horizon, column) in &schema.retention {
            let slot = acc.retention.entry(horizon.clone()).or_insert((0.0, 0));
            if let Some(v) = numeric_field(record, column)? {
                slot.0 += v;
                slot.1 += 1;
            }
        }
        for column in &schema.sum_fields {
            *acc.sums.entry(column.clone()).or_insert(0.0) +=
                numeric_field(record, column)?.unwrap_or(0.0);
        }
        for column in &schema.avg_fields {
            let slot = acc.avgs.entry(column.clone()).or_insert((0.0, 0));
            if let Some(v) = numeric_field(record, column)? {
                slot.0 += v;
                slot.1 += 1;
            }
        }
    }

    let mut out = Vec::with_capacity(order.len());
    for key in order {
        let acc = groups.remove(&key).expect("accumulator exists for key");
        out.push(CohortRow {
            key,
            spend: acc.spend,
            installs: acc.installs,
            revenue: acc
                .revenue
                .into_iter()
                .map(|(h, (sum, seen))| (h, seen.then_some(sum)))
                .collect(),
            retention: acc
                .retention
                .into_iter()
                .map(|(h, (sum, n))| (h, average(sum, n)))
                .collect(),
            sums: acc.sums,
            avgs: acc
                .avgs
                .into_iter()
                .map(|(f, (sum, n))| (f, average(sum, n)))
                .collect(),
        });
    }
    Ok(out)
}

fn average(sum: f64, count: u64) -> Option<f64> {
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Build the group key for a record. Missing or null group-by values map to
/// the unknown bucket.
fn group_key(record: &RawRecord, group_by: &[String]) -> GroupKey {
    GroupKey(
        group_by
            .iter()
            .map(|field| match record.get(field) {
                None | Some(Value::Null) => UNKNOWN_BUCKET.to_string(),
                Some(Value::String(s)) if s.is_empty() => UNKNOWN_BUCKET.to_string(),
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::Bool(b)) => b.to_string(),
                Some(other) => other.to_string(),
            })
            .collect(),
    )
}

/// Read a declared count column. Counts must be whole numbers; a fractional
/// value is malformed, not rounded.
fn count_field(record: &RawRecord, field: &str) -> Result<Option<i64>> {
    match numeric_field(record, field)? {
        None => Ok(None),
        Some(v) if v.fract() == 0.0 => Ok(Some(v as i64)),
        Some(v) => Err(Error::MalformedInput {
            field: field.to_string(),
            message: format!("expected a whole count, got {v}"),
        }),
    }
}

/// Read a declared numeric column. Null/missing is `None`; anything that is
/// present but not a number is malformed input.
fn numeric_field(record: &RawRecord, field: &str) -> Result<Option<f64>> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(Error::MalformedInput {
            field: field.to_string(),
            message: format!("expected a number, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: serde_json::Value) -> RawRecord {
        fields.as_object().expect("test record is an object").clone()
    }

    fn us_schema() -> SchemaMap {
        SchemaMap::default().grouped_by(["mediasource", "platform"])
    }

    #[test]
    fn test_empty_input_empty_output() {
        let rows = aggregate(&[], &us_schema()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_groups_and_sums() {
        let rows = vec![
            record(json!({"mediasource": "applovin", "platform": "ios", "cost": 100.0, "installs": 10, "d0_total_net_revenue": 5.0})),
            record(json!({"mediasource": "applovin", "platform": "ios", "cost": 50.0, "installs": 5, "d0_total_net_revenue": 2.5})),
            record(json!({"mediasource": "unity", "platform": "android", "cost": 30.0, "installs": 12, "d0_total_net_revenue": null})),
        ];
        let out = aggregate(&rows, &us_schema()).unwrap();
        assert_eq!(out.len(), 2);

        let applovin = &out[0];
        assert_eq!(applovin.key, GroupKey::new(["applovin", "ios"]));
        assert_eq!(applovin.spend, 150.0);
        assert_eq!(applovin.installs, 15);
        assert_eq!(applovin.revenue["d0"], Some(7.5));

        // d0 revenue was null on every unity record: unmatured, not zero.
        let unity = &out[1];
        assert_eq!(unity.revenue["d0"], None);
    }

    #[test]
    fn test_sum_preservation() {
        let rows: Vec<RawRecord> = (0..20)
            .map(|i| {
                record(json!({
                    "mediasource": if i % 3 == 0 { "a" } else { "b" },
                    "platform": if i % 2 == 0 { "ios" } else { "android" },
                    "cost": i as f64 * 1.5,
                    "installs": i,
                }))
            })
            .collect();
        let input_spend: f64 = (0..20).map(|i| i as f64 * 1.5).sum();

        let out = aggregate(&rows, &us_schema()).unwrap();
        let output_spend: f64 = out.iter().map(|r| r.spend).sum();
        assert!((input_spend - output_spend).abs() < 1e-9);
    }

    #[test]
    fn test_missing_group_field_goes_to_unknown_bucket() {
        let rows = vec![
            record(json!({"platform": "ios", "cost": 10.0, "installs": 1})),
            record(json!({"mediasource": null, "platform": "ios", "cost": 5.0, "installs": 1})),
        ];
        let out = aggregate(&rows, &us_schema()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, GroupKey::new([UNKNOWN_BUCKET, "ios"]));
        assert_eq!(out[0].spend, 15.0);
    }

    #[test]
    fn test_non_numeric_measure_is_rejected() {
        let rows = vec![record(
            json!({"mediasource": "a", "platform": "ios", "cost": "12,5", "installs": 1}),
        )];
        let err = aggregate(&rows, &us_schema()).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { ref field, .. } if field == "cost"));
    }

    #[test]
    fn test_fractional_installs_rejected() {
        let rows = vec![record(
            json!({"mediasource": "a", "platform": "ios", "cost": 10.0, "installs": 2.5}),
        )];
        let err = aggregate(&rows, &us_schema()).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { ref field, .. } if field == "installs"));
    }

    #[test]
    fn test_retention_average_excludes_nulls() {
        let rows = vec![
            record(json!({"mediasource": "a", "platform": "ios", "cost": 1.0, "installs": 1, "d7_retention": 0.2})),
            record(json!({"mediasource": "a", "platform": "ios", "cost": 1.0, "installs": 1, "d7_retention": null})),
            record(json!({"mediasource": "a", "platform": "ios", "cost": 1.0, "installs": 1, "d7_retention": 0.4})),
        ];
        let out = aggregate(&rows, &us_schema()).unwrap();
        // (0.2 + 0.4) / 2, the null row does not count as zero.
        let d7 = out[0].retention["d7"].unwrap();
        assert!((d7 - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let rows = vec![
            record(json!({"mediasource": "z", "platform": "ios", "cost": 1.0, "installs": 1})),
            record(json!({"mediasource": "a", "platform": "ios", "cost": 1.0, "installs": 1})),
            record(json!({"mediasource": "z", "platform": "ios", "cost": 1.0, "installs": 1})),
        ];
        let out = aggregate(&rows, &us_schema()).unwrap();
        assert_eq!(out[0].key, GroupKey::new(["z", "ios"]));
        assert_eq!(out[1].key, GroupKey::new(["a", "ios"]));
    }

    #[test]
    fn test_extra_sum_and_avg_fields() {
        let mut schema = us_schema();
        schema.sum_fields = vec!["clicks".to_string()];
        schema.avg_fields = vec!["ecpm".to_string()];

        let rows = vec![
            record(json!({"mediasource": "a", "platform": "ios", "cost": 1.0, "installs": 1, "clicks": 100, "ecpm": 4.0})),
            record(json!({"mediasource": "a", "platform": "ios", "cost": 1.0, "installs": 1, "clicks": null, "ecpm": 6.0})),
        ];
        let out = aggregate(&rows, &schema).unwrap();
        assert_eq!(out[0].sums["clicks"], 100.0);
        assert_eq!(out[0].avgs["ecpm"], Some(5.0));
    }
}
