//! API-Football JSON -> `MatchSnapshot`.
//!
//! The feed is loosely typed: ids and numbers sometimes come as strings,
//! possession comes as "54%", missing statistics are `null`. Everything here
//! is total; a field that cannot be read becomes 0 (or `None`), only a
//! fixture without id or elapsed minute is dropped.

use corner_engine::MatchSnapshot;
use serde_json::Value;

/// Upper bound for any single feed counter. Real values are far below it,
/// anything larger is garbage and must not reach the engine's arithmetic.
pub const MAX_STAT_VALUE: u32 = 10_000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamRef {
    pub id: Option<u64>,
    pub name: String,
}

/// A live fixture as seen by one poll, plus the display data for alerts.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveFixture {
    pub snapshot: MatchSnapshot,
    pub home_team: TeamRef,
    pub away_team: TeamRef,
    pub league_name: String,
    pub season: Option<u64>,
    pub status_long: String,
}

/// Parses one item of `/fixtures?live=all` `response[]`.
pub fn parse_fixture(item: &Value) -> Option<LiveFixture> {
    let fixture = item.get("fixture")?;
    let match_id = opt_u64(fixture.get("id"))?;
    let elapsed = opt_u64(fixture.pointer("/status/elapsed"))?;

    let league = item.get("league");
    let snapshot = MatchSnapshot {
        match_id,
        elapsed_minute: elapsed.min(u32::MAX as u64) as u32,
        home_score: lenient_u32(item.pointer("/goals/home")),
        away_score: lenient_u32(item.pointer("/goals/away")),
        venue_name: str_field(fixture.pointer("/venue/name")),
        league_id: opt_u64(league.and_then(|l| l.get("id"))),
        ..MatchSnapshot::default()
    };

    Some(LiveFixture {
        snapshot,
        home_team: team_ref(item.pointer("/teams/home"), "Home"),
        away_team: team_ref(item.pointer("/teams/away"), "Away"),
        league_name: str_field(league.and_then(|l| l.get("name"))).unwrap_or_default(),
        season: opt_u64(league.and_then(|l| l.get("season"))),
        status_long: str_field(fixture.pointer("/status/long")).unwrap_or_default(),
    })
}

/// Which counter a statistic label feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Corners,
    Possession,
    DangerousAttacks,
    /// Shots on goal/target, the stand-in for dangerous attacks.
    ShotsOnGoal,
    Attacks,
}

pub fn classify_stat(label: &str) -> Option<StatKind> {
    let label = label.to_lowercase();
    if label.contains("corner") {
        Some(StatKind::Corners)
    } else if label.contains("possession") {
        Some(StatKind::Possession)
    } else if label.contains("danger") {
        Some(StatKind::DangerousAttacks)
    } else if label.contains("on goal") || label.contains("on target") {
        Some(StatKind::ShotsOnGoal)
    } else if label.contains("attack") {
        Some(StatKind::Attacks)
    } else {
        None
    }
}

/// Fills the per-side counters from `/fixtures/statistics` `response[]`.
///
/// Entries are matched to the home side by team id; when ids are missing
/// the first entry is home and the rest away. A "Dangerous Attacks" value
/// wins over shots on goal regardless of the order the feed lists them.
pub fn apply_statistics(snapshot: &mut MatchSnapshot, home_team_id: Option<u64>, stats: &Value) {
    let Some(entries) = stats.as_array() else { return };
    // (home, away) dangerous attacks seen as such
    let mut danger_seen = (false, false);

    for (idx, entry) in entries.iter().enumerate() {
        let team_id = opt_u64(entry.pointer("/team/id"));
        let is_home = match (home_team_id, team_id) {
            (Some(home), Some(team)) => home == team,
            _ => idx == 0,
        };

        let Some(list) = entry.get("statistics").and_then(Value::as_array) else { continue };
        for stat in list {
            let Some(kind) = stat.get("type").and_then(Value::as_str).and_then(classify_stat) else {
                continue;
            };
            let value = lenient_u32(stat.get("value"));
            let seen = if is_home { &mut danger_seen.0 } else { &mut danger_seen.1 };
            match kind {
                StatKind::DangerousAttacks => *seen = true,
                StatKind::ShotsOnGoal if *seen => continue,
                _ => {}
            }
            let slot = match (kind, is_home) {
                (StatKind::Corners, true) => &mut snapshot.home_corners,
                (StatKind::Corners, false) => &mut snapshot.away_corners,
                (StatKind::Possession, true) => &mut snapshot.home_possession,
                (StatKind::Possession, false) => &mut snapshot.away_possession,
                (StatKind::DangerousAttacks | StatKind::ShotsOnGoal, true) => &mut snapshot.home_dangerous_attacks,
                (StatKind::DangerousAttacks | StatKind::ShotsOnGoal, false) => &mut snapshot.away_dangerous_attacks,
                (StatKind::Attacks, true) => &mut snapshot.home_attacks,
                (StatKind::Attacks, false) => &mut snapshot.away_attacks,
            };
            *slot = value;
        }
    }
}

/// Fixture ids of a `/fixtures?team=..&last=..` body, in feed order.
pub fn fixture_ids(body: &Value) -> Vec<u64> {
    body.get("response")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(|item| opt_u64(item.pointer("/fixture/id")))
        .collect()
}

/// Corners one team took in a finished match, from a statistics
/// `response[]`. `None` when the team or a usable corner count is missing.
pub fn team_corners(stats: &Value, team_id: u64) -> Option<u32> {
    let entry = stats
        .as_array()?
        .iter()
        .find(|entry| opt_u64(entry.pointer("/team/id")) == Some(team_id))?;
    entry
        .get("statistics")?
        .as_array()?
        .iter()
        .find(|stat| {
            stat.get("type")
                .and_then(Value::as_str)
                .and_then(classify_stat)
                == Some(StatKind::Corners)
        })
        .and_then(|stat| stat.get("value"))
        .filter(|value| !value.is_null())
        .map(|value| lenient_u32(Some(value)))
}

/// Mean of the counted matches, `None` when nothing was counted.
pub fn average_corners(samples: &[u32]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let total: u64 = samples.iter().map(|&c| c as u64).sum();
    Some(total as f64 / samples.len() as f64)
}

/// Team rank from a `/standings` body. Handles grouped tables.
pub fn rank_from_standings(body: &Value, team_id: u64) -> Option<u32> {
    let response = body.get("response")?.as_array()?;
    response
        .iter()
        .filter_map(|entry| entry.pointer("/league/standings").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
        .find(|row| opt_u64(row.pointer("/team/id")) == Some(team_id))
        .and_then(|row| opt_u64(row.get("rank")))
        .map(|rank| rank as u32)
}

/// API-Football reports quota and auth problems in an `errors` field with a
/// 200 status. Returns the joined messages when it is non-empty.
pub fn api_errors(body: &Value) -> Option<String> {
    let messages: Vec<String> = match body.get("errors")? {
        Value::Array(items) => items.iter().map(value_text).collect(),
        Value::Object(map) => map.iter().map(|(k, v)| format!("{k}: {}", value_text(v))).collect(),
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    };
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

/// Non-negative integer from a number, numeric string or percentage,
/// capped at `MAX_STAT_VALUE`. Anything else is 0.
pub fn lenient_u32(value: Option<&Value>) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() && v > 0.0 => v.min(MAX_STAT_VALUE as f64) as u32,
        _ => 0,
    }
}

fn opt_u64(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn str_field(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn team_ref(value: Option<&Value>, fallback: &str) -> TeamRef {
    TeamRef {
        id: opt_u64(value.and_then(|t| t.get("id"))),
        name: str_field(value.and_then(|t| t.get("name"))).unwrap_or_else(|| fallback.to_string()),
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn live_item() -> Value {
        json!({
            "fixture": {
                "id": 1208021,
                "venue": { "id": 562, "name": "Turf Moor" },
                "status": { "long": "First Half", "short": "1H", "elapsed": 37 }
            },
            "league": { "id": 39, "name": "Premier League", "season": 2024 },
            "teams": {
                "home": { "id": 44, "name": "Burnley" },
                "away": { "id": 50, "name": "Manchester City" }
            },
            "goals": { "home": 0, "away": 1 }
        })
    }

    fn stats_response() -> Value {
        json!([
            {
                "team": { "id": 50, "name": "Manchester City" },
                "statistics": [
                    { "type": "Shots on Goal", "value": 5 },
                    { "type": "Corner Kicks", "value": 4 },
                    { "type": "Ball Possession", "value": "68%" },
                    { "type": "Attacks", "value": "41" },
                    { "type": "Dangerous Attacks", "value": 22 }
                ]
            },
            {
                "team": { "id": 44, "name": "Burnley" },
                "statistics": [
                    { "type": "Shots on Goal", "value": null },
                    { "type": "Corner Kicks", "value": 1 },
                    { "type": "Ball Possession", "value": "32%" },
                    { "type": "Attacks", "value": "n/a" }
                ]
            }
        ])
    }

    #[test]
    fn parses_live_fixture() {
        let fx = parse_fixture(&live_item()).unwrap();
        assert_eq!(fx.snapshot.match_id, 1208021);
        assert_eq!(fx.snapshot.elapsed_minute, 37);
        assert_eq!((fx.snapshot.home_score, fx.snapshot.away_score), (0, 1));
        assert_eq!(fx.snapshot.venue_name.as_deref(), Some("Turf Moor"));
        assert_eq!(fx.snapshot.league_id, Some(39));
        assert_eq!(fx.home_team, TeamRef { id: Some(44), name: "Burnley".to_string() });
        assert_eq!(fx.league_name, "Premier League");
        assert_eq!(fx.season, Some(2024));
        assert_eq!(fx.status_long, "First Half");
    }

    #[test]
    fn fixture_without_minute_or_id_is_skipped() {
        let mut item = live_item();
        item["fixture"]["status"]["elapsed"] = Value::Null;
        assert!(parse_fixture(&item).is_none());

        let mut item = live_item();
        item["fixture"].as_object_mut().unwrap().remove("id");
        assert!(parse_fixture(&item).is_none());

        assert!(parse_fixture(&json!({ "teams": {} })).is_none());
    }

    #[test]
    fn sparse_fixture_defaults() {
        let fx = parse_fixture(&json!({
            "fixture": { "id": "77", "status": { "elapsed": "12" } }
        }))
        .unwrap();
        assert_eq!(fx.snapshot.match_id, 77);
        assert_eq!(fx.snapshot.elapsed_minute, 12);
        assert_eq!(fx.snapshot.home_score, 0);
        assert_eq!(fx.snapshot.venue_name, None);
        assert_eq!(fx.snapshot.league_id, None);
        assert_eq!(fx.home_team.name, "Home");
        assert_eq!(fx.away_team.id, None);
    }

    #[test]
    fn statistics_matched_by_team_id() {
        let mut snap = parse_fixture(&live_item()).unwrap().snapshot;
        apply_statistics(&mut snap, Some(44), &stats_response());

        assert_eq!((snap.home_corners, snap.away_corners), (1, 4));
        assert_eq!((snap.home_possession, snap.away_possession), (32, 68));
        assert_eq!((snap.home_attacks, snap.away_attacks), (0, 41));
        assert_eq!(snap.away_dangerous_attacks, 22);
        assert_eq!(snap.home_dangerous_attacks, 0);
    }

    #[test]
    fn dangerous_attacks_win_over_shots_in_any_order() {
        for stats in [
            json!([{ "team": { "id": 44 }, "statistics": [
                { "type": "Dangerous Attacks", "value": 22 },
                { "type": "Shots on Goal", "value": 5 }
            ]}]),
            json!([{ "team": { "id": 44 }, "statistics": [
                { "type": "Shots on Goal", "value": 5 },
                { "type": "Dangerous Attacks", "value": 22 }
            ]}]),
        ] {
            let mut snap = MatchSnapshot::default();
            apply_statistics(&mut snap, Some(44), &stats);
            assert_eq!(snap.home_dangerous_attacks, 22);
        }

        // shots alone still count
        let mut snap = MatchSnapshot::default();
        apply_statistics(
            &mut snap,
            Some(44),
            &json!([{ "team": { "id": 44 }, "statistics": [{ "type": "Shots on Target", "value": 6 }] }]),
        );
        assert_eq!(snap.home_dangerous_attacks, 6);
    }

    #[test]
    fn oversized_counters_are_capped() {
        let mut snap = MatchSnapshot { elapsed_minute: 36, ..MatchSnapshot::default() };
        let stats = json!([
            { "team": { "id": 44 }, "statistics": [
                { "type": "Corner Kicks", "value": "4294967295" },
                { "type": "Attacks", "value": 1e300 }
            ]},
            { "team": { "id": 50 }, "statistics": [{ "type": "Corner Kicks", "value": 1 }] }
        ]);
        apply_statistics(&mut snap, Some(44), &stats);
        assert_eq!(snap.home_corners, MAX_STAT_VALUE);
        assert_eq!(snap.home_attacks, MAX_STAT_VALUE);
        assert_eq!(snap.total_corners(), MAX_STAT_VALUE + 1);

        // the engine takes it without complaint
        let evaluator = corner_engine::SignalEvaluator::new(corner_engine::EngineConfig::default());
        let signals = evaluator.evaluate(&snap);
        assert_eq!(signals.len(), 1);
        assert!(signals[0].probability <= 1.0);
    }

    #[test]
    fn statistics_fall_back_to_position() {
        let mut snap = MatchSnapshot::default();
        let stats = json!([
            { "statistics": [{ "type": "Corner Kicks", "value": 3 }] },
            { "statistics": [{ "type": "Corner Kicks", "value": 2 }] }
        ]);
        apply_statistics(&mut snap, None, &stats);
        assert_eq!((snap.home_corners, snap.away_corners), (3, 2));
    }

    #[test]
    fn malformed_statistics_are_ignored() {
        let mut snap = MatchSnapshot::default();
        apply_statistics(&mut snap, Some(1), &json!({ "unexpected": true }));
        apply_statistics(&mut snap, Some(1), &json!([{ "team": { "id": 1 }, "statistics": null }]));
        assert_eq!(snap, MatchSnapshot::default());
    }

    #[test]
    fn stat_labels() {
        assert_eq!(classify_stat("Corner Kicks"), Some(StatKind::Corners));
        assert_eq!(classify_stat("Dangerous Attacks"), Some(StatKind::DangerousAttacks));
        assert_eq!(classify_stat("Shots on Goal"), Some(StatKind::ShotsOnGoal));
        assert_eq!(classify_stat("Shots on Target"), Some(StatKind::ShotsOnGoal));
        assert_eq!(classify_stat("Shots off Goal"), None);
        assert_eq!(classify_stat("attacks"), Some(StatKind::Attacks));
        assert_eq!(classify_stat("Ball Possession"), Some(StatKind::Possession));
        assert_eq!(classify_stat("Yellow Cards"), None);
    }

    #[test]
    fn lenient_numbers() {
        assert_eq!(lenient_u32(Some(&json!(7))), 7);
        assert_eq!(lenient_u32(Some(&json!(" 54% "))), 54);
        assert_eq!(lenient_u32(Some(&json!("3.0"))), 3);
        assert_eq!(lenient_u32(Some(&json!(-2))), 0);
        assert_eq!(lenient_u32(Some(&json!("abc"))), 0);
        assert_eq!(lenient_u32(Some(&Value::Null)), 0);
        assert_eq!(lenient_u32(None), 0);
        assert_eq!(lenient_u32(Some(&json!("4294967295"))), MAX_STAT_VALUE);
    }

    #[test]
    fn standings_rank_lookup() {
        let body = json!({
            "response": [{
                "league": {
                    "id": 39,
                    "standings": [
                        [
                            { "rank": 1, "team": { "id": 50 } },
                            { "rank": 2, "team": { "id": 42 } }
                        ],
                        [
                            { "rank": 1, "team": { "id": 44 } }
                        ]
                    ]
                }
            }]
        });
        assert_eq!(rank_from_standings(&body, 42), Some(2));
        assert_eq!(rank_from_standings(&body, 44), Some(1));
        assert_eq!(rank_from_standings(&body, 99), None);
        assert_eq!(rank_from_standings(&json!({}), 42), None);
    }

    #[test]
    fn team_form_helpers() {
        let last = json!({ "response": [
            { "fixture": { "id": 11 } },
            { "fixture": {} },
            { "fixture": { "id": "12" } }
        ]});
        assert_eq!(fixture_ids(&last), vec![11, 12]);
        assert!(fixture_ids(&json!({ "errors": [] })).is_empty());

        let stats = stats_response();
        assert_eq!(team_corners(&stats, 50), Some(4));
        assert_eq!(team_corners(&stats, 44), Some(1));
        assert_eq!(team_corners(&stats, 7), None);
        let no_count = json!([{ "team": { "id": 44 }, "statistics": [{ "type": "Corner Kicks", "value": null }] }]);
        assert_eq!(team_corners(&no_count, 44), None);

        assert_eq!(average_corners(&[4, 6, 5]), Some(5.0));
        assert_eq!(average_corners(&[]), None);
    }

    #[test]
    fn api_error_shapes() {
        assert_eq!(api_errors(&json!({ "errors": [] })), None);
        assert_eq!(api_errors(&json!({ "errors": {} })), None);
        assert_eq!(api_errors(&json!({ "response": [] })), None);
        assert_eq!(
            api_errors(&json!({ "errors": { "requests": "limit reached" } })),
            Some("requests: limit reached".to_string())
        );
        assert_eq!(api_errors(&json!({ "errors": ["bad key"] })), Some("bad key".to_string()));
    }
}
