//! Poisson helpers for corner counts in a time window.
//!
//! All pmf values are built with the recurrence `pmf(i) = pmf(i-1) * lambda / i`,
//! so nothing here computes a factorial.

/// Per-minute corner rate used when the match clock has not started yet.
/// ~0.06/min is roughly 2.7 corners per half.
pub const FALLBACK_CORNER_RATE: f64 = 0.06;

/// Observed corners per minute, or `fallback` when `elapsed_minute == 0`.
pub fn estimate_corner_rate(total_corners: u32, elapsed_minute: u32, fallback: f64) -> f64 {
    if elapsed_minute == 0 {
        return fallback.max(0.0);
    }
    total_corners as f64 / elapsed_minute as f64
}

/// Mean of the Poisson distribution of corners over the remaining minutes.
pub fn expected_remaining(rate: f64, minutes_remaining: i64) -> f64 {
    rate.max(0.0) * minutes_remaining.max(0) as f64
}

/// P(X = k) for X ~ Poisson(lambda).
pub fn poisson_pmf(k: u32, lambda: f64) -> f64 {
    let lambda = sanitize(lambda);
    let mut pmf = (-lambda).exp();
    for i in 1..=k {
        pmf = pmf * lambda / i as f64;
    }
    pmf
}

/// P(X >= k) for X ~ Poisson(lambda), clamped to [0, 1].
pub fn probability_at_least(k: u32, lambda: f64) -> f64 {
    if k == 0 {
        return 1.0;
    }
    let lambda = sanitize(lambda);
    let mut pmf = (-lambda).exp();
    let mut below = pmf;
    for i in 1..k {
        pmf = pmf * lambda / i as f64;
        below += pmf;
    }
    (1.0 - below).clamp(0.0, 1.0)
}

fn sanitize(lambda: f64) -> f64 {
    if lambda.is_finite() && lambda > 0.0 {
        lambda
    } else {
        0.0
    }
}
