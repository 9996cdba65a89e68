use chrono::NaiveDateTime;

/// Arithmetic mean. `NaN` for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator) given a pre-computed mean.
/// `NaN` for fewer than two values.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;

    variance.sqrt()
}

/// Quantile with linear interpolation between closest ranks.
///
/// `sorted` must be in ascending order. `NaN` for empty input.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return f64::NAN;
    };

    let pos = q.clamp(0.0, 1.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;

    match (sorted.get(lo), sorted.get(hi)) {
        (Some(a), Some(b)) => a + (b - a) * (pos - lo as f64),
        _ => f64::NAN,
    }
}

/// Median of unsorted values. `NaN` for empty input.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile(&sorted, 0.5)
}

/// `part / total * 100`, or `NaN` when `total` is zero.
pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        f64::NAN
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Signed minutes from `from` to `to`.
pub fn minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

/// Minutes between two optional timestamps, when both are present.
pub fn span_minutes(from: Option<NaiveDateTime>, to: Option<NaiveDateTime>) -> Option<f64> {
    Some(minutes_between(from?, to?))
}
