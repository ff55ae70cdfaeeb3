//! Corner Engine - corner-kick signals for live football matches.
//!
//! Poisson estimate of corners left in a strategy window, venue/league
//! bonuses, an attacking-pressure heuristic, and a fired-signal memory so
//! that each match/window pair alerts at most once per process.

pub mod evaluator;
pub mod lines;
pub mod poisson;
pub mod pressure;
pub mod window;

use serde::{Deserialize, Serialize};

pub use evaluator::{FiredSignals, Signal, SignalEvaluator, WindowState};
pub use lines::{candidate_lines, line_metrics, LineMetrics};
pub use poisson::{estimate_corner_rate, expected_remaining, poisson_pmf, probability_at_least, FALLBACK_CORNER_RATE};
pub use pressure::{pressure_score, pressure_side, PressureConfig, PressureSide, SideStats};
pub use window::{EngineConfig, StrategyWindow};

/// API-Football fixture id.
pub type MatchId = u64;

/// One poll's view of a live match. Statistics the source did not report are 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSnapshot {
    pub match_id: MatchId,
    pub elapsed_minute: u32,
    pub home_score: u32,
    pub away_score: u32,
    pub home_corners: u32,
    pub away_corners: u32,
    pub home_attacks: u32,
    pub away_attacks: u32,
    pub home_dangerous_attacks: u32,
    pub away_dangerous_attacks: u32,
    /// Ball possession in percent, display only.
    pub home_possession: u32,
    pub away_possession: u32,
    pub venue_name: Option<String>,
    pub league_id: Option<u64>,
}

impl MatchSnapshot {
    pub fn total_corners(&self) -> u32 {
        self.home_corners.saturating_add(self.away_corners)
    }

    pub fn home_side(&self) -> SideStats {
        SideStats {
            attacks: self.home_attacks,
            dangerous_attacks: self.home_dangerous_attacks,
        }
    }

    pub fn away_side(&self) -> SideStats {
        SideStats {
            attacks: self.away_attacks,
            dangerous_attacks: self.away_dangerous_attacks,
        }
    }
}
