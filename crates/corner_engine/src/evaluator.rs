//! Window evaluation and fired-signal memory.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::debug;

use crate::poisson::{estimate_corner_rate, expected_remaining, probability_at_least};
use crate::pressure::{pressure_score, pressure_side, PressureSide};
use crate::window::{EngineConfig, StrategyWindow};
use crate::{MatchId, MatchSnapshot};

/// One qualifying window for one match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub match_id: MatchId,
    pub tag: String,
    pub minute: u32,
    /// P(>= min_corners) after venue/league bonuses, clamped to 1.0.
    pub probability: f64,
    /// Poisson estimate before bonuses.
    pub raw_probability: f64,
    pub lambda: f64,
    pub total_corners: u32,
    pub min_corners: u32,
    pub small_venue: bool,
    pub league_bonus: f64,
    pub pressure_home: f64,
    pub pressure_away: f64,
    pub pressure_side: PressureSide,
}

/// Per match, per window tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// Clock has not reached the window yet.
    NotYetEligible,
    /// Inside the window, threshold not met so far.
    Evaluating,
    /// Notification already produced. Terminal.
    Fired,
    /// Window passed without firing.
    Closed,
}

/// Tags already fired per match. Lives as long as the process.
#[derive(Debug, Default)]
pub struct FiredSignals {
    fired: HashMap<MatchId, HashSet<String>>,
}

impl FiredSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_fired(&self, match_id: MatchId, tag: &str) -> bool {
        self.fired
            .get(&match_id)
            .is_some_and(|tags| tags.contains(tag))
    }

    /// Marks `(match_id, tag)` and returns true only on the first call.
    pub fn try_mark(&mut self, match_id: MatchId, tag: &str) -> bool {
        let tags = self.fired.entry(match_id).or_default();
        if tags.contains(tag) {
            return false;
        }
        tags.insert(tag.to_string())
    }

    /// Number of fired `(match, tag)` pairs.
    pub fn len(&self) -> usize {
        self.fired.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct SignalEvaluator {
    config: EngineConfig,
    fired: Mutex<FiredSignals>,
}

impl SignalEvaluator {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            fired: Mutex::new(FiredSignals::new()),
        }
    }

    /// Evaluates every window that covers the snapshot's minute and returns
    /// the ones that fire now. Each `(match_id, tag)` fires at most once, so
    /// calling this again on later polls is safe.
    pub fn evaluate(&self, snapshot: &MatchSnapshot) -> Vec<Signal> {
        let cfg = &self.config;
        let minute = snapshot.elapsed_minute;
        let total_corners = snapshot.total_corners();

        let rate = estimate_corner_rate(total_corners, minute, cfg.fallback_rate);
        let small_venue = cfg.is_small_venue(snapshot.venue_name.as_deref());
        let league_bonus = cfg.league_bonus(snapshot.league_id);
        let bonus = league_bonus + if small_venue { cfg.small_venue_bonus } else { 0.0 };

        let (pressure_home, pressure_away) =
            pressure_score(snapshot.home_side(), snapshot.away_side(), &cfg.pressure);
        let side = pressure_side((pressure_home, pressure_away), &cfg.pressure);

        let mut signals = Vec::new();
        for window in &cfg.windows {
            if !window.contains(minute) {
                continue;
            }
            if self.fired().has_fired(snapshot.match_id, &window.tag) {
                continue;
            }

            let lambda = expected_remaining(rate, window.minutes_remaining(minute));
            let raw_probability = probability_at_least(window.min_corners, lambda);
            let probability = (raw_probability + bonus).clamp(0.0, 1.0);

            debug!(
                match_id = snapshot.match_id,
                tag = %window.tag,
                minute,
                lambda,
                p = probability,
                pressure = side.as_str(),
                "window evaluated"
            );

            if probability < window.min_probability && !side.is_some() {
                continue;
            }

            // check-then-mark under one lock; a concurrent caller may have won
            if !self.fired().try_mark(snapshot.match_id, &window.tag) {
                continue;
            }

            signals.push(Signal {
                match_id: snapshot.match_id,
                tag: window.tag.clone(),
                minute,
                probability,
                raw_probability,
                lambda,
                total_corners,
                min_corners: window.min_corners,
                small_venue,
                league_bonus,
                pressure_home,
                pressure_away,
                pressure_side: side,
            });
        }
        signals
    }

    pub fn has_fired(&self, match_id: MatchId, tag: &str) -> bool {
        self.fired().has_fired(match_id, tag)
    }

    /// True when some window is in `Evaluating` for this match. Lets the
    /// poller skip the statistics request otherwise.
    pub fn has_open_window(&self, match_id: MatchId, minute: u32) -> bool {
        self.config
            .windows
            .iter()
            .any(|w| self.window_state(match_id, minute, w) == WindowState::Evaluating)
    }

    pub fn fired_count(&self) -> usize {
        self.fired().len()
    }

    pub fn window_state(&self, match_id: MatchId, minute: u32, window: &StrategyWindow) -> WindowState {
        if self.has_fired(match_id, &window.tag) {
            WindowState::Fired
        } else if minute < window.start_minute {
            WindowState::NotYetEligible
        } else if window.contains(minute) {
            WindowState::Evaluating
        } else {
            WindowState::Closed
        }
    }

    fn fired(&self) -> MutexGuard<'_, FiredSignals> {
        // the set stays consistent even if a holder panicked
        self.fired.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
