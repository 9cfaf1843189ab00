//! Formatting helpers shared by report renderers.
//!
//! Missing metrics always render as `n/a`, never `0`, `inf`, or `NaN`,
//! so an unmatured horizon or an undefined ratio is visibly "no data".

/// Format a money amount (e.g., "$1,234.56").
pub fn money(value: Option<f64>) -> String {
    match value {
        Some(v) if v < 0.0 => format!("-${}", thousands(-v, 2)),
        Some(v) => format!("${}", thousands(v, 2)),
        None => "n/a".to_string(),
    }
}

/// Format a fraction as a signed percentage (e.g., "+25.0%", "-12.3%").
pub fn signed_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:+.1}%", v * 100.0),
        None => "n/a".to_string(),
    }
}

/// Format a fraction as an unsigned percentage (e.g., "18.2%").
pub fn pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "n/a".to_string(),
    }
}

/// Format a ratio such as ROAS (e.g., "0.117").
pub fn ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.3}", v),
        None => "n/a".to_string(),
    }
}

/// Format an integer count with thousands separators.
pub fn count(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let grouped = group_thousands(&digits);
    if negative {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted, None),
    };
    let mut out = group_thousands(&int_part);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(&frac);
    }
    if value < 0.0 {
        out.insert(0, '-');
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let chars: Vec<char> = digits.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}
