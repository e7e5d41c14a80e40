//! Summary statistics applied to low-level descriptor tracks.
//!
//! All helpers return 0.0 for an empty series so that a degenerate segment
//! still yields a complete, finite feature row.

pub(crate) fn amean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = amean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Coefficient of variation: standard deviation normalized by the mean
/// magnitude. Zero when the mean vanishes.
pub(crate) fn stddev_norm(values: &[f64]) -> f64 {
    let mean = amean(values).abs();
    if mean <= f64::EPSILON {
        return 0.0;
    }
    stddev(values) / mean
}

/// Percentile with linear interpolation between adjacent ranks.
pub(crate) fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite descriptor values"));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn empty_series_default_to_zero() {
        assert_eq!(amean(&[]), 0.0);
        assert_eq!(stddev(&[]), 0.0);
        assert_eq!(stddev_norm(&[]), 0.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn constant_series_has_zero_spread() {
        let values = [3.5; 10];
        assert_abs_diff_eq!(amean(&values), 3.5);
        assert_eq!(stddev(&values), 0.0);
        assert_eq!(stddev_norm(&values), 0.0);
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(percentile(&values, 0.0), 0.0);
        assert_abs_diff_eq!(percentile(&values, 50.0), 2.0);
        assert_abs_diff_eq!(percentile(&values, 100.0), 4.0);
        assert_abs_diff_eq!(percentile(&values, 20.0), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn percentile_is_order_independent() {
        let shuffled = [4.0, 0.0, 3.0, 1.0, 2.0];
        assert_abs_diff_eq!(percentile(&shuffled, 50.0), 2.0);
    }

    #[test]
    fn stddev_norm_scales_with_spread() {
        let narrow = [9.0, 10.0, 11.0];
        let wide = [5.0, 10.0, 15.0];
        assert!(stddev_norm(&wide) > stddev_norm(&narrow));
    }
}
