/// CornerLive - Logger
/// JSONL event stream, one file per UTC day

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open event log {}", path.display()))?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event types ──────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct SignalFiredEvent {
    pub ts:             String,
    pub event:          &'static str,   // "SIGNAL_FIRED"
    pub match_id:       u64,
    pub tag:            String,
    pub minute:         u32,
    pub home:           String,
    pub away:           String,
    pub league:         String,
    pub total_corners:  u32,
    pub lambda:         f64,
    pub probability:    f64,
    pub raw_probability: f64,
    pub pressure_side:  String,
    pub dry_run:        bool,
}

#[derive(Serialize, Debug)]
pub struct NotifyFailedEvent {
    pub ts:       String,
    pub event:    &'static str,   // "NOTIFY_FAILED"
    pub match_id: u64,
    pub tag:      String,
    pub error:    String,
}

#[derive(Serialize, Debug)]
pub struct ApiStatusEvent {
    pub ts:           String,
    pub event:        &'static str,   // "API_STATUS"
    pub source:       String,
    pub scope:        String,         // "live" | "statistics" | "standings" | "team_form"
    pub ok:           bool,
    pub status_code:  Option<u16>,
    pub message:      String,
    pub items:        usize,
}

#[derive(Serialize, Debug)]
pub struct SystemHeartbeatEvent {
    pub ts:                 String,
    pub event:              &'static str,   // "SYSTEM_HEARTBEAT"
    pub poll_interval_secs: u64,
    pub live_fixtures:      usize,
    pub in_window:          usize,
    pub evaluated:          usize,
    pub signals:            usize,
    pub fetch_errors:       usize,
    pub notify_failures:    usize,
    pub fired_total:        usize,
}
