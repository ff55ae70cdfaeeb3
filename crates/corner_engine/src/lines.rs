//! Asian corner-line outcome probabilities.

use serde::Serialize;

use crate::poisson::{poisson_pmf, probability_at_least};

/// Offsets above the current corner count that get priced for an alert.
pub const CANDIDATE_OFFSETS: [f64; 5] = [0.5, 1.0, 1.5, 2.0, 2.5];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineMetrics {
    pub line: f64,
    pub p_win: f64,
    pub p_push: f64,
    pub p_lose: f64,
}

/// Win/push/lose probabilities of an "over `line`" corner bet, given
/// `current_total` corners already taken and `lambda` expected in the rest
/// of the window.
///
/// Half lines (4.5) cannot push. Whole lines (5.0) push when the final total
/// lands exactly on the line.
pub fn line_metrics(current_total: u32, lambda: f64, line: f64) -> LineMetrics {
    let is_half = line.fract() != 0.0;
    let base = line.floor().max(0.0) as u32;
    let needed = (base + 1).saturating_sub(current_total);
    let p_win = probability_at_least(needed, lambda);

    let p_push = if is_half || base < current_total {
        0.0
    } else {
        poisson_pmf(base - current_total, lambda)
    };

    LineMetrics {
        line,
        p_win,
        p_push,
        p_lose: (1.0 - p_win - p_push).clamp(0.0, 1.0),
    }
}

/// Prices the lines just above `current_total`, best win chance first.
pub fn candidate_lines(current_total: u32, lambda: f64) -> Vec<LineMetrics> {
    let mut lines: Vec<LineMetrics> = CANDIDATE_OFFSETS
        .iter()
        .map(|offset| line_metrics(current_total, lambda, current_total as f64 + offset))
        .collect();
    lines.sort_by(|a, b| b.p_win.total_cmp(&a.p_win));
    lines
}
