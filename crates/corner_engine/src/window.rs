//! Strategy windows and engine tuning.

use std::collections::HashMap;

use crate::poisson::FALLBACK_CORNER_RATE;
use crate::pressure::PressureConfig;

/// A named minute range with its corner target and probability cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyWindow {
    pub tag: String,
    pub start_minute: u32,
    pub end_minute: u32,
    /// Corners needed inside the rest of the window (`k`).
    pub min_corners: u32,
    /// Boosted probability that fires the window on its own.
    pub min_probability: f64,
}

impl StrategyWindow {
    pub fn new(tag: impl Into<String>, start_minute: u32, end_minute: u32, min_corners: u32, min_probability: f64) -> Self {
        Self {
            tag: tag.into(),
            start_minute,
            end_minute,
            min_corners,
            min_probability,
        }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, minute: u32) -> bool {
        self.start_minute <= minute && minute <= self.end_minute
    }

    pub fn minutes_remaining(&self, minute: u32) -> i64 {
        self.end_minute as i64 - minute as i64
    }
}

pub fn default_windows() -> Vec<StrategyWindow> {
    vec![
        StrategyWindow::new("HT", 35, 40, 1, 0.60),
        StrategyWindow::new("FT", 80, 90, 1, 0.60),
    ]
}

pub fn default_small_venues() -> Vec<String> {
    ["loftus road", "vitality stadium", "kenilworth road", "turf moor", "bramall lane", "ewood park"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Premier League, Bundesliga, La Liga, Ligue 1, Serie A (API-Football ids).
pub fn default_priority_leagues() -> HashMap<u64, f64> {
    HashMap::from([(39, 0.05), (78, 0.05), (140, 0.04), (61, 0.04), (135, 0.03)])
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub windows: Vec<StrategyWindow>,
    pub fallback_rate: f64,
    pub small_venue_bonus: f64,
    /// Lower-case substrings matched against the venue name.
    pub small_venues: Vec<String>,
    /// league_id -> additive probability bonus
    pub priority_leagues: HashMap<u64, f64>,
    pub pressure: PressureConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            windows: default_windows(),
            fallback_rate: FALLBACK_CORNER_RATE,
            small_venue_bonus: 0.15,
            small_venues: default_small_venues(),
            priority_leagues: default_priority_leagues(),
            pressure: PressureConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn is_small_venue(&self, venue: Option<&str>) -> bool {
        let Some(name) = venue else { return false };
        let name = name.to_lowercase();
        self.small_venues
            .iter()
            .any(|v| !v.is_empty() && name.contains(v.as_str()))
    }

    pub fn league_bonus(&self, league_id: Option<u64>) -> f64 {
        league_id
            .and_then(|id| self.priority_leagues.get(&id).copied())
            .unwrap_or(0.0)
    }
}
