//! Attacking-pressure heuristic.
//!
//! Hand-tuned weights, not a calibrated model: the score only ranks how one
//! side is dominating the other right now.

use serde::{Deserialize, Serialize};

const W_ATTACK_DIFF: f64 = 0.35;
const W_DANGER_DIFF: f64 = 0.55;
const W_ACTIVITY: f64 = 0.10;

#[derive(Debug, Clone, PartialEq)]
pub struct PressureConfig {
    /// Below this many attacks (both sides together) there is no signal.
    pub min_combined_attacks: u32,
    /// Attack lead that maps to a full attack-differential component.
    pub attack_diff_scale: f64,
    /// Dangerous-attack lead that maps to a full danger-differential component.
    pub danger_diff_scale: f64,
    /// Own attacks + dangerous attacks that map to a full activity component.
    pub activity_scale: f64,
    /// A side qualifies when its score is strictly above this.
    pub threshold: f64,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            min_combined_attacks: 10,
            attack_diff_scale: 4.0,
            danger_diff_scale: 3.0,
            activity_scale: 20.0,
            threshold: 0.5,
        }
    }
}

/// Cumulative attacking numbers for one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideStats {
    pub attacks: u32,
    pub dangerous_attacks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureSide {
    None,
    Home,
    Away,
    Both,
}

impl PressureSide {
    pub fn from_flags(home: bool, away: bool) -> Self {
        match (home, away) {
            (true, true) => PressureSide::Both,
            (true, false) => PressureSide::Home,
            (false, true) => PressureSide::Away,
            (false, false) => PressureSide::None,
        }
    }

    pub fn is_some(&self) -> bool {
        !matches!(self, PressureSide::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PressureSide::None => "none",
            PressureSide::Home => "home",
            PressureSide::Away => "away",
            PressureSide::Both => "both",
        }
    }
}

/// Score of `side` against `opponent` in [0, 1].
pub fn side_pressure(side: SideStats, opponent: SideStats, cfg: &PressureConfig) -> f64 {
    if side.attacks.saturating_add(opponent.attacks) < cfg.min_combined_attacks {
        return 0.0;
    }
    let attack_diff = side.attacks as f64 - opponent.attacks as f64;
    let danger_diff = side.dangerous_attacks as f64 - opponent.dangerous_attacks as f64;
    let activity = side.attacks as f64 + side.dangerous_attacks as f64;

    let score = W_ATTACK_DIFF * unit(attack_diff / cfg.attack_diff_scale)
        + W_DANGER_DIFF * unit(danger_diff / cfg.danger_diff_scale)
        + W_ACTIVITY * unit(activity / cfg.activity_scale);
    score.clamp(0.0, 1.0)
}

/// `(home, away)` pressure scores.
pub fn pressure_score(home: SideStats, away: SideStats, cfg: &PressureConfig) -> (f64, f64) {
    (side_pressure(home, away, cfg), side_pressure(away, home, cfg))
}

/// Which sides are above the pressure threshold.
pub fn pressure_side(scores: (f64, f64), cfg: &PressureConfig) -> PressureSide {
    PressureSide::from_flags(scores.0 > cfg.threshold, scores.1 > cfg.threshold)
}

fn unit(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
