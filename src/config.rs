use std::collections::{HashMap, HashSet};

use corner_engine::{EngineConfig, StrategyWindow};
use fixture_monitor::DEFAULT_API_URL;
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 20;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STATS_CONCURRENCY: usize = 4;
/// Each enabled team-form lookup costs one request per past match.
pub const MAX_TEAM_FORM_MATCHES: u32 = 20;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_url: String,
    /// Empty in dry-run mode.
    pub telegram_token: String,
    /// Numeric chat id or @channel name.
    pub telegram_chat_id: String,
    /// Log alerts instead of sending them (DRY_RUN).
    pub dry_run: bool,
    pub poll_interval_secs: u64,
    pub http_timeout_secs: u64,
    pub stats_concurrency: usize,
    /// Past matches averaged per team for the alert text, 0 disables it.
    pub team_form_matches: u32,
    pub log_dir: String,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key -> value source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let dry_run = match get("DRY_RUN") {
            Some(v) => parse_bool("DRY_RUN", &v)?,
            None => false,
        };

        let api_key = get("API_FOOTBALL_KEY").ok_or(ConfigError::Missing("API_FOOTBALL_KEY"))?;

        let telegram_token = get("TELEGRAM_BOT_TOKEN").or_else(|| get("TOKEN"));
        let telegram_chat_id = get("TELEGRAM_CHAT_ID");
        let (telegram_token, telegram_chat_id) = if dry_run {
            (telegram_token.unwrap_or_default(), telegram_chat_id.unwrap_or_default())
        } else {
            (
                telegram_token.ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?,
                telegram_chat_id.ok_or(ConfigError::Missing("TELEGRAM_CHAT_ID"))?,
            )
        };

        let mut engine = EngineConfig::default();
        if let Some(v) = get("STRATEGY_WINDOWS") {
            engine.windows = parse_windows(&v)?;
        }
        if let Some(v) = get("SMALL_VENUES") {
            engine.small_venues = parse_small_venues(&v);
        }
        if let Some(v) = get("PRIORITY_LEAGUES") {
            engine.priority_leagues = parse_priority_leagues(&v)?;
        }
        if let Some(v) = get("FALLBACK_CORNER_RATE") {
            engine.fallback_rate = parse_unit_f64("FALLBACK_CORNER_RATE", &v)?;
        }
        if let Some(v) = get("PRESSURE_THRESHOLD") {
            engine.pressure.threshold = parse_unit_f64("PRESSURE_THRESHOLD", &v)?;
        }
        if let Some(v) = get("PRESSURE_MIN_ATTACKS") {
            engine.pressure.min_combined_attacks = parse_num("PRESSURE_MIN_ATTACKS", &v)?;
        }

        let poll_interval_secs = match get("POLL_INTERVAL_SECS") {
            Some(v) => parse_num("POLL_INTERVAL_SECS", &v)?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };
        if poll_interval_secs == 0 {
            return Err(invalid("POLL_INTERVAL_SECS", "must be at least 1 second"));
        }

        let stats_concurrency = match get("STATS_CONCURRENCY") {
            Some(v) => parse_num("STATS_CONCURRENCY", &v)?,
            None => DEFAULT_STATS_CONCURRENCY,
        };

        let team_form_matches = match get("TEAM_FORM_MATCHES") {
            Some(v) => parse_num("TEAM_FORM_MATCHES", &v)?,
            None => 0,
        };
        if team_form_matches > MAX_TEAM_FORM_MATCHES {
            return Err(invalid("TEAM_FORM_MATCHES", format!("at most {MAX_TEAM_FORM_MATCHES}")));
        }

        Ok(Self {
            api_key,
            api_url: get("API_FOOTBALL_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            telegram_token,
            telegram_chat_id,
            dry_run,
            poll_interval_secs,
            http_timeout_secs: match get("HTTP_TIMEOUT_SECS") {
                Some(v) => parse_num("HTTP_TIMEOUT_SECS", &v)?,
                None => DEFAULT_HTTP_TIMEOUT_SECS,
            },
            stats_concurrency: stats_concurrency.max(1),
            team_form_matches,
            log_dir: get("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            engine,
        })
    }
}

/// `tag,start,end,k,p_min` entries separated by `;`,
/// e.g. `HT,35,40,1,0.60;FT,80,90,1,0.60`.
pub fn parse_windows(raw: &str) -> Result<Vec<StrategyWindow>> {
    const KEY: &str = "STRATEGY_WINDOWS";
    let mut windows = Vec::new();
    let mut tags = HashSet::new();

    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let fields: Vec<&str> = entry.split(',').map(str::trim).collect();
        let [tag, start, end, k, p_min] = fields.as_slice() else {
            return Err(invalid(KEY, format!("`{entry}` needs 5 fields: tag,start,end,k,p_min")));
        };
        if tag.is_empty() {
            return Err(invalid(KEY, format!("`{entry}` has an empty tag")));
        }
        let start: u32 = parse_num(KEY, start)?;
        let end: u32 = parse_num(KEY, end)?;
        if start > end {
            return Err(invalid(KEY, format!("`{entry}` starts after it ends")));
        }
        let window = StrategyWindow::new(*tag, start, end, parse_num(KEY, k)?, parse_unit_f64(KEY, p_min)?);
        if !tags.insert(window.tag.clone()) {
            return Err(invalid(KEY, format!("duplicate tag `{tag}`")));
        }
        windows.push(window);
    }

    if windows.is_empty() {
        return Err(invalid(KEY, "no windows defined"));
    }
    Ok(windows)
}

/// Comma list of venue name fragments, matched case-insensitively.
pub fn parse_small_venues(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// `league_id=bonus` pairs, e.g. `39=0.05,78=0.05`.
pub fn parse_priority_leagues(raw: &str) -> Result<HashMap<u64, f64>> {
    const KEY: &str = "PRIORITY_LEAGUES";
    raw.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|entry| {
            let (id, bonus) = entry
                .split_once('=')
                .ok_or_else(|| invalid(KEY, format!("`{entry}` is not id=bonus")))?;
            let id: u64 = parse_num(KEY, id.trim())?;
            Ok((id, parse_unit_f64(KEY, bonus.trim())?))
        })
        .collect()
}

fn parse_num<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| invalid(key, format!("`{raw}` is not a valid number")))
}

fn parse_unit_f64(key: &'static str, raw: &str) -> Result<f64> {
    let v: f64 = parse_num(key, raw)?;
    if !(0.0..=1.0).contains(&v) {
        return Err(invalid(key, format!("`{raw}` must be between 0 and 1")));
    }
    Ok(v)
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, format!("`{raw}` is not a boolean"))),
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { key, reason: reason.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("API_FOOTBALL_KEY", "k"),
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("TELEGRAM_CHAT_ID", "-100200"),
    ];

    #[test]
    fn defaults_with_required_settings() {
        let cfg = Config::from_lookup(lookup(&BASE)).unwrap();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert_eq!(cfg.stats_concurrency, DEFAULT_STATS_CONCURRENCY);
        assert!(!cfg.dry_run);
        assert_eq!(cfg.engine.windows.len(), 2);
        assert_eq!(cfg.engine.windows[0].tag, "HT");
        assert_eq!(cfg.log_dir, "logs");
        assert_eq!(cfg.team_form_matches, 0);
    }

    #[test]
    fn missing_credentials_refuse_to_start() {
        let err = Config::from_lookup(lookup(&[("API_FOOTBALL_KEY", "k")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("TELEGRAM_BOT_TOKEN"));

        let err = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "t"), ("TELEGRAM_CHAT_ID", "1")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("API_FOOTBALL_KEY"));

        let err = Config::from_lookup(lookup(&[("API_FOOTBALL_KEY", "  "), ("DRY_RUN", "1")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("API_FOOTBALL_KEY"));
    }

    #[test]
    fn dry_run_needs_no_telegram() {
        let cfg = Config::from_lookup(lookup(&[("API_FOOTBALL_KEY", "k"), ("DRY_RUN", "true")])).unwrap();
        assert!(cfg.dry_run);
        assert!(cfg.telegram_token.is_empty());
    }

    #[test]
    fn legacy_token_name_is_accepted() {
        let cfg = Config::from_lookup(lookup(&[
            ("API_FOOTBALL_KEY", "k"),
            ("TOKEN", "999:xyz"),
            ("TELEGRAM_CHAT_ID", "42"),
        ]))
        .unwrap();
        assert_eq!(cfg.telegram_token, "999:xyz");
    }

    #[test]
    fn strategy_overrides() {
        let mut pairs = BASE.to_vec();
        pairs.push(("STRATEGY_WINDOWS", "HT:1,35,40,1,0.6; HT:2,35,40,2,0.55 ;"));
        pairs.push(("SMALL_VENUES", "Kenilworth Road, ,Vitality Stadium"));
        pairs.push(("PRIORITY_LEAGUES", "39=0.05, 71=0.02"));
        pairs.push(("PRESSURE_MIN_ATTACKS", "8"));
        pairs.push(("TEAM_FORM_MATCHES", "5"));
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();

        let tags: Vec<&str> = cfg.engine.windows.iter().map(|w| w.tag.as_str()).collect();
        assert_eq!(tags, vec!["HT:1", "HT:2"]);
        assert_eq!(cfg.engine.windows[1].min_corners, 2);
        assert_eq!(cfg.engine.small_venues, vec!["kenilworth road", "vitality stadium"]);
        assert_eq!(cfg.engine.league_bonus(Some(71)), 0.02);
        assert_eq!(cfg.engine.league_bonus(Some(39)), 0.05);
        assert_eq!(cfg.engine.pressure.min_combined_attacks, 8);
        assert_eq!(cfg.team_form_matches, 5);
    }

    #[test]
    fn malformed_values_are_fatal() {
        for (key, value) in [
            ("STRATEGY_WINDOWS", "HT,40,35,1,0.6"),
            ("STRATEGY_WINDOWS", "HT,35,40,1"),
            ("STRATEGY_WINDOWS", "HT,35,40,1,1.5"),
            ("STRATEGY_WINDOWS", "HT,35,40,1,0.6;HT,80,90,1,0.6"),
            ("PRIORITY_LEAGUES", "39:0.05"),
            ("POLL_INTERVAL_SECS", "0"),
            ("POLL_INTERVAL_SECS", "soon"),
            ("DRY_RUN", "maybe"),
            ("PRESSURE_THRESHOLD", "-0.1"),
            ("TEAM_FORM_MATCHES", "50"),
        ] {
            let mut pairs = BASE.to_vec();
            pairs.push((key, value));
            let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{key}={value} gave {err:?}");
        }
    }
}
