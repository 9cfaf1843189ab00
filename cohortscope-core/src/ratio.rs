//! Null-propagating arithmetic for report metrics.
//!
//! Every ratio in a UA report can hit a zero denominator (no installs, no
//! spend) or an immature numerator (revenue horizon not yet reached). Those
//! cases are represented as `None`, never as `0`, `inf`, or `NaN`, so that a
//! missing value renders as "n/a" downstream instead of silently skewing a
//! total. This is the foundation every derived metric and delta builds on.

/// Divide `numerator / denominator`, returning `None` when either operand is
/// absent or the denominator is zero (or non-finite).
pub fn safe_div(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let n = numerator?;
    let d = denominator?;
    if d == 0.0 || !d.is_finite() || !n.is_finite() {
        return None;
    }
    Some(n / d)
}

/// Percentage change from `previous` to `current`:
/// `(current - previous) / previous`.
///
/// `None` when either side is absent or `previous` is zero.
pub fn delta_pct(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    let c = current?;
    let p = previous?;
    safe_div(Some(c - p), Some(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_div_basic() {
        assert_eq!(safe_div(Some(10.0), Some(4.0)), Some(2.5));
    }

    #[test]
    fn test_safe_div_zero_denominator() {
        assert_eq!(safe_div(Some(10.0), Some(0.0)), None);
        assert_eq!(safe_div(Some(0.0), Some(0.0)), None);
        assert_eq!(safe_div(Some(-3.0), Some(0.0)), None);
    }

    #[test]
    fn test_safe_div_missing_operands() {
        assert_eq!(safe_div(None, Some(5.0)), None);
        assert_eq!(safe_div(Some(5.0), None), None);
        assert_eq!(safe_div(None, None), None);
    }

    #[test]
    fn test_safe_div_never_nan_or_inf() {
        assert_eq!(safe_div(Some(f64::NAN), Some(2.0)), None);
        assert_eq!(safe_div(Some(1.0), Some(f64::INFINITY)), None);
    }

    #[test]
    fn test_delta_pct() {
        assert_eq!(delta_pct(Some(10.0), Some(8.0)), Some(0.25));
        assert_eq!(delta_pct(Some(8.0), Some(10.0)), Some(-0.2));
        assert_eq!(delta_pct(Some(5.0), Some(5.0)), Some(0.0));
    }

    #[test]
    fn test_delta_pct_null_previous() {
        assert_eq!(delta_pct(Some(10.0), None), None);
        assert_eq!(delta_pct(Some(10.0), Some(0.0)), None);
        assert_eq!(delta_pct(None, Some(8.0)), None);
    }
}
