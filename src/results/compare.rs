//! Cross-snapshot comparison helpers
//!
//! Relative change and number formatting shared by every report section.

/// Placeholder for values that cannot be computed
pub const NOT_APPLICABLE: &str = "N/A";

/// Relative improvement of `improved` over `baseline`, in percent
///
/// `(baseline - improved) / baseline * 100`. A leading `+` means the
/// improved side is lower (better), `-` means it regressed.
pub fn pct_change(baseline: Option<f64>, improved: Option<f64>) -> String {
    match relative_change(baseline, improved) {
        Some(change) => {
            let sign = if change >= 0.0 { '+' } else { '-' };
            format!("{sign}{:.1}%", change.abs())
        }
        None => NOT_APPLICABLE.to_string(),
    }
}

/// Raw relative change, `None` when the baseline is zero or either side is
/// missing or not finite
pub fn relative_change(baseline: Option<f64>, improved: Option<f64>) -> Option<f64> {
    let (baseline, improved) = (baseline?, improved?);
    if baseline == 0.0 || !baseline.is_finite() || !improved.is_finite() {
        return None;
    }
    Some((baseline - improved) / baseline * 100.0)
}

/// Format a value with fixed decimals, `N/A` when absent
pub fn fmt_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => NOT_APPLICABLE.to_string(),
    }
}

/// `numerator / denominator`, `None` on a zero or missing denominator
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 {
        None
    } else {
        Some(n / d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_change_direction() {
        assert_eq!(pct_change(Some(100.0), Some(50.0)), "+50.0%");
        assert_eq!(pct_change(Some(50.0), Some(100.0)), "-100.0%");
        assert_eq!(pct_change(Some(80.0), Some(80.0)), "+0.0%");
    }

    #[test]
    fn test_pct_change_not_applicable() {
        assert_eq!(pct_change(Some(0.0), Some(50.0)), "N/A");
        assert_eq!(pct_change(None, Some(50.0)), "N/A");
        assert_eq!(pct_change(Some(50.0), None), "N/A");
        assert_eq!(pct_change(Some(f64::NAN), Some(1.0)), "N/A");
    }

    #[test]
    fn test_fmt_value() {
        assert_eq!(fmt_value(Some(12.3456), 2), "12.35");
        assert_eq!(fmt_value(Some(1024.4), 0), "1024");
        assert_eq!(fmt_value(None, 2), "N/A");
        assert_eq!(fmt_value(Some(f64::NAN), 2), "N/A");
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(Some(50.0), Some(10.0)), Some(5.0));
        assert_eq!(ratio(Some(50.0), Some(0.0)), None);
        assert_eq!(ratio(None, Some(1.0)), None);
    }
}
