//! Descriptive statistics over plain value slices.

use crate::models::PopulationSummary;

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Middle value, or the mean of the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Quantile with linear interpolation between closest ranks.
///
/// `q` is clamped to `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted = sorted(values);
    let position = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Sample standard deviation (n - 1 denominator).
///
/// Fewer than two values have no spread and report 0.0.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Scale `value` into `[0, 1]` relative to `min..=max`.
///
/// A degenerate range (`max == min`) maps everything to the midpoint 0.5.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range == 0.0 || !range.is_finite() {
        return 0.5;
    }
    (value - min) / range
}

/// Pearson correlation coefficient over paired samples.
///
/// `None` for fewer than two pairs or when either series is constant.
/// Deviations are scaled by their largest magnitude before squaring, so
/// very large values do not overflow.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let (first_a, first_b) = pairs[0];
    if pairs.iter().all(|(a, _)| *a == first_a) || pairs.iter().all(|(_, b)| *b == first_b) {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let scale_a = max_deviation(pairs.iter().map(|(a, _)| *a), mean_a);
    let scale_b = max_deviation(pairs.iter().map(|(_, b)| *b), mean_b);
    if scale_a == 0.0 || scale_b == 0.0 || !scale_a.is_finite() || !scale_b.is_finite() {
        return None;
    }

    let mut covariance = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (a, b) in pairs {
        let da = (a - mean_a) / scale_a;
        let db = (b - mean_b) / scale_b;
        covariance += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denominator = (var_a * var_b).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    Some((covariance / denominator).clamp(-1.0, 1.0))
}

fn max_deviation(values: impl Iterator<Item = f64>, mean: f64) -> f64 {
    values.map(|v| (v - mean).abs()).fold(0.0, f64::max)
}

/// Summary statistics; `None` for an empty slice.
pub fn summarize(values: &[f64]) -> Option<PopulationSummary> {
    let mean = mean(values)?;
    let sorted = sorted(values);

    Some(PopulationSummary {
        count: values.len(),
        mean,
        median: median(&sorted)?,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        std_dev: std_dev(values),
        p75: quantile(&sorted, 0.75)?,
    })
}
