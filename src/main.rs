/// CornerLive - live corner-kick signals
///
/// What it does:
///   1. Every POLL_INTERVAL_SECS polls live football fixtures (API-Football)
///   2. Fixtures inside a strategy window (HT 35-40, FT 80-90 by default) get statistics
///   3. Poisson estimate of corners left in the window + venue/league bonus + pressure
///   4. Each match/window fires at most once -> Telegram alert
///
/// DRY_RUN=1 logs alerts instead of sending them.
///
/// Run:
///   cargo run --bin corner-live

mod alert;
mod config;
mod poller;
mod telegram;

use anyhow::{Context, Result};
use corner_engine::SignalEvaluator;
use dotenv::dotenv;
use fixture_monitor::FixtureMonitor;
use logger::EventLogger;
use std::env;
use std::fs::File;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::poller::Poller;
use crate::telegram::{AlertSink, TelegramNotifier};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {e}");
            return Err(e).context("refusing to start");
        }
    };

    info!("=== CornerLive - corner signals ===");
    info!("Mode: {}", if cfg.dry_run { "DRY RUN (alerts logged only)" } else { "LIVE (Telegram)" });
    for w in &cfg.engine.windows {
        info!(
            "Window {}: {}'-{}' | >= {} corner(s) | p >= {:.2}",
            w.tag, w.start_minute, w.end_minute, w.min_corners, w.min_probability
        );
    }
    info!("Poll interval: {}s | Logs: ./{}/", cfg.poll_interval_secs, cfg.log_dir);
    if cfg.team_form_matches > 0 {
        info!("Team form: last {} matches per team on each alert", cfg.team_form_matches);
    }

    // Single instance lock
    let lock_file_path = env::temp_dir().join("cornerlive.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of corner-live is already running! Exiting.");
            return Ok(());
        }
    };

    let timeout = Duration::from_secs(cfg.http_timeout_secs);
    let monitor = FixtureMonitor::new(&cfg.api_url, &cfg.api_key, timeout, &cfg.log_dir)
        .context("building API-Football client")?;

    let http = reqwest::Client::builder().timeout(timeout).build()?;
    let notifier = TelegramNotifier::new(http, &cfg.telegram_token, &cfg.telegram_chat_id, cfg.dry_run);
    let bot_id = notifier.verify().await.context("Telegram bot check failed")?;
    if !notifier.is_dry_run() {
        info!("Telegram bot ready, bot_id={}", bot_id);
    }

    let poller = Poller::new(
        monitor,
        SignalEvaluator::new(cfg.engine.clone()),
        notifier,
        EventLogger::new(&cfg.log_dir),
        cfg.poll_interval_secs,
        cfg.stats_concurrency,
        cfg.team_form_matches,
    );

    info!("🚀 READY: starting live poll loop.");
    poller
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}
