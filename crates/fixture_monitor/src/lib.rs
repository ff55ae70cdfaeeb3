/// CornerLive - Fixture Monitor
///
/// Live football data from API-Football v3 (api-sports.io):
/// - /fixtures?live=all          live matches with minute, score, venue, league
/// - /fixtures/statistics        corners, attacks, dangerous attacks, possession
/// - /standings                  league table, only for alert text
/// - /fixtures?team=&last=       recent matches, for the optional team form line
///
/// Every request is logged as "API_STATUS" through the Logger.

pub mod error;
pub mod parse;

use logger::{now_iso, ApiStatusEvent, EventLogger};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use error::{MonitorError, Result};
pub use parse::{apply_statistics, parse_fixture, LiveFixture, TeamRef};

pub const DEFAULT_API_URL: &str = "https://v3.football.api-sports.io";
const SOURCE: &str = "api-football";

pub struct FixtureMonitor {
    client: reqwest::Client,
    base_url: String,
    logger: EventLogger,
}

impl FixtureMonitor {
    pub fn new(
        base_url: impl Into<String>,
        api_key: &str,
        timeout: Duration,
        log_dir: impl Into<std::path::PathBuf>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("x-apisports-key", HeaderValue::from_str(api_key)?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            logger: EventLogger::new(log_dir),
        })
    }

    /// Live fixtures. Items without id or elapsed minute are dropped here.
    pub async fn poll_live(&self) -> Result<Vec<LiveFixture>> {
        let body = match self.get_json("/fixtures", &[("live", "all".to_string())]).await {
            Ok(body) => body,
            Err(e) => {
                self.log_api_error("live", &e);
                return Err(e);
            }
        };

        let items = body
            .get("response")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut fixtures = Vec::with_capacity(items.len());
        for item in items {
            match parse_fixture(item) {
                Some(fx) => fixtures.push(fx),
                None => debug!("skipping live item without fixture id/elapsed: {}", short(item)),
            }
        }

        info!("Live fixtures: {} ({} unusable)", fixtures.len(), items.len() - fixtures.len());
        self.log_api_ok("live", fixtures.len());
        Ok(fixtures)
    }

    /// Raw `response[]` of /fixtures/statistics, fed to `apply_statistics`.
    pub async fn fetch_statistics(&self, fixture_id: u64) -> Result<Value> {
        let query = [("fixture", fixture_id.to_string())];
        match self.get_json("/fixtures/statistics", &query).await {
            Ok(mut body) => {
                let stats = body.get_mut("response").map(Value::take).unwrap_or(Value::Null);
                self.log_api_ok("statistics", stats.as_array().map_or(0, Vec::len));
                Ok(stats)
            }
            Err(e) => {
                self.log_api_error("statistics", &e);
                Err(e)
            }
        }
    }

    /// League position of a team, best effort.
    pub async fn team_rank(&self, league_id: u64, season: u64, team_id: u64) -> Option<u32> {
        let query = [("league", league_id.to_string()), ("season", season.to_string())];
        match self.get_json("/standings", &query).await {
            Ok(body) => parse::rank_from_standings(&body, team_id),
            Err(e) => {
                debug!("standings lookup failed for league {league_id}: {e}");
                self.log_api_error("standings", &e);
                None
            }
        }
    }

    /// Average corners a team took over its last `last` matches, best
    /// effort. Costs one request for the list plus one per match.
    pub async fn team_corner_average(&self, team_id: u64, last: u32) -> Option<f64> {
        let query = [("team", team_id.to_string()), ("last", last.to_string())];
        let body = match self.get_json("/fixtures", &query).await {
            Ok(body) => body,
            Err(e) => {
                debug!("recent fixtures lookup failed for team {team_id}: {e}");
                self.log_api_error("team_form", &e);
                return None;
            }
        };

        let mut samples = Vec::new();
        for fixture_id in parse::fixture_ids(&body) {
            match self.fetch_statistics(fixture_id).await {
                Ok(stats) => samples.extend(parse::team_corners(&stats, team_id)),
                Err(e) => debug!("statistics for past fixture {fixture_id} unavailable: {e}"),
            }
        }
        self.log_api_ok("team_form", samples.len());
        parse::average_corners(&samples)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).query(query).send().await?;

        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            warn!("API-Football {path} failed {status}: {}", &raw[..floor_char_boundary(&raw, 200)]);
            return Err(MonitorError::Status {
                status: status.as_u16(),
                body: raw[..floor_char_boundary(&raw, 200)].to_string(),
            });
        }

        let body: Value = serde_json::from_str(&raw)?;
        if let Some(msg) = parse::api_errors(&body) {
            return Err(MonitorError::Api(msg));
        }
        Ok(body)
    }

    fn log_api_error(&self, scope: &str, err: &MonitorError) {
        let _ = self.logger.log(&ApiStatusEvent {
            ts: now_iso(),
            event: "API_STATUS",
            source: SOURCE.to_string(),
            scope: scope.to_string(),
            ok: false,
            status_code: err.status_code(),
            message: err.to_string(),
            items: 0,
        });
    }

    fn log_api_ok(&self, scope: &str, count: usize) {
        let _ = self.logger.log(&ApiStatusEvent {
            ts: now_iso(),
            event: "API_STATUS",
            source: SOURCE.to_string(),
            scope: scope.to_string(),
            ok: true,
            status_code: Some(200),
            message: "ok".to_string(),
            items: count,
        });
    }
}

fn short(v: &Value) -> String {
    let s = v.to_string();
    let end = floor_char_boundary(&s, 120);
    s[..end].to_string()
}

/// Largest char boundary <= `max`, so slicing never splits a UTF-8 sequence.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_utf8() {
        let s = "é".repeat(150); // 2 bytes each
        let end = floor_char_boundary(&s, 201);
        assert_eq!(end, 200);
        assert!(s.is_char_boundary(end));
        assert_eq!(floor_char_boundary("short", 200), 5);
    }

    #[test]
    fn rejects_key_with_newline() {
        let err = FixtureMonitor::new(DEFAULT_API_URL, "bad\nkey", Duration::from_secs(5), std::env::temp_dir())
            .err()
            .unwrap();
        assert!(matches!(err, MonitorError::InvalidKey(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let monitor = FixtureMonitor::new(
            "http://127.0.0.1:9/",
            "key",
            Duration::from_secs(1),
            std::env::temp_dir().join("corner-live-monitor-test"),
        )
        .unwrap();
        assert_eq!(monitor.base_url, "http://127.0.0.1:9");
    }
}
