pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Sample standard deviation (n - 1 denominator). `None` below two samples.
pub fn sample_std(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs)?;
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    Some(var.sqrt())
}

/// Successive relative changes: `p[i] / p[i-1] - 1`.
pub fn daily_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Percentile with linear interpolation between closest ranks, `pct` in [0, 100].
pub fn percentile(xs: &[f64], pct: f64) -> Option<f64> {
    if xs.is_empty() || !pct.is_finite() {
        return None;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// `(x - mean) / std`, degrading to 0 when the spread is zero or undefined.
pub fn z_score(x: f64, xs: &[f64]) -> f64 {
    match (mean(xs), sample_std(xs)) {
        (Some(m), Some(s)) if s > 0.0 && s.is_finite() => (x - m) / s,
        _ => 0.0,
    }
}
