//! Summary of the JSONL event log written by corner-live.
//!
//!   LOG_DIR=logs cargo run --bin signal-log-stats

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct LogLine {
    event: String,
    #[serde(default)]
    ts: String,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    live_fixtures: Option<u64>,
    #[serde(default)]
    fired_total: Option<u64>,
}

#[derive(Debug, Default)]
struct Summary {
    files: usize,
    malformed: usize,
    by_event: BTreeMap<String, usize>,
    signals_by_tag: BTreeMap<String, usize>,
    last_heartbeat: Option<(String, u64, u64)>,
}

impl Summary {
    fn ingest(&mut self, raw: &str) {
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            let Ok(ev) = serde_json::from_str::<LogLine>(line) else {
                self.malformed += 1;
                continue;
            };
            *self.by_event.entry(ev.event.clone()).or_default() += 1;
            match ev.event.as_str() {
                "SIGNAL_FIRED" => {
                    let tag = ev.tag.unwrap_or_else(|| "?".to_string());
                    *self.signals_by_tag.entry(tag).or_default() += 1;
                }
                "SYSTEM_HEARTBEAT" => {
                    self.last_heartbeat = Some((
                        ev.ts,
                        ev.live_fixtures.unwrap_or(0),
                        ev.fired_total.unwrap_or(0),
                    ));
                }
                _ => {}
            }
        }
    }
}

fn jsonl_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("read log dir {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "jsonl"))
        .collect();
    // YYYY-MM-DD names, so this is chronological
    files.sort();
    Ok(files)
}

fn main() -> Result<()> {
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    let mut summary = Summary::default();

    for path in jsonl_files(Path::new(&log_dir))? {
        let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        summary.files += 1;
        summary.ingest(&raw);
    }

    println!("log_dir={log_dir} files={} malformed_lines={}", summary.files, summary.malformed);
    for (event, count) in &summary.by_event {
        println!("{event}: {count}");
    }
    for (tag, count) in &summary.signals_by_tag {
        println!("signals[{tag}]: {count}");
    }
    match &summary.last_heartbeat {
        Some((ts, live, fired)) => println!("last_heartbeat: ts={ts} live_fixtures={live} fired_total={fired}"),
        None => println!("last_heartbeat: <none>"),
    }

    Ok(())
}
