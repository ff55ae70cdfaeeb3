//! Poll -> score -> notify cycle.

use std::future::Future;

use anyhow::Result;
use corner_engine::{Signal, SignalEvaluator};
use fixture_monitor::{apply_statistics, FixtureMonitor, LiveFixture};
use futures_util::{stream, StreamExt};
use serde_json::Value;
use logger::{now_iso, EventLogger, NotifyFailedEvent, SignalFiredEvent, SystemHeartbeatEvent};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::alert::{format_signal_alert, Ranks, TeamForm};
use crate::telegram::AlertSink;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub live: usize,
    pub in_window: usize,
    pub evaluated: usize,
    pub signals: usize,
    pub fetch_errors: usize,
    pub notify_failures: usize,
}

pub struct Poller<N: AlertSink> {
    monitor: FixtureMonitor,
    evaluator: SignalEvaluator,
    notifier: N,
    logger: EventLogger,
    poll_interval_secs: u64,
    stats_concurrency: usize,
    team_form_matches: u32,
}

impl<N: AlertSink> Poller<N> {
    pub fn new(
        monitor: FixtureMonitor,
        evaluator: SignalEvaluator,
        notifier: N,
        logger: EventLogger,
        poll_interval_secs: u64,
        stats_concurrency: usize,
        team_form_matches: u32,
    ) -> Self {
        Self {
            monitor,
            evaluator,
            notifier,
            logger,
            poll_interval_secs,
            stats_concurrency: stats_concurrency.max(1),
            team_form_matches,
        }
    }

    /// Runs cycles until `shutdown` resolves. Shutdown is only observed
    /// between cycles, a cycle in progress always finishes.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            match self.run_cycle().await {
                Ok(report) => info!(
                    "Cycle done: live={} in_window={} evaluated={} signals={} fetch_errors={} notify_failures={}",
                    report.live, report.in_window, report.evaluated, report.signals,
                    report.fetch_errors, report.notify_failures
                ),
                Err(e) => warn!("Poll cycle skipped: {e:#}"),
            }

            tokio::select! {
                _ = sleep(Duration::from_secs(self.poll_interval_secs)) => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping poll loop");
                    break;
                }
            }
        }
    }

    /// One poll. Only a failed live-fixture request fails the whole cycle;
    /// per-match problems are counted and skipped.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let fixtures = self.monitor.poll_live().await?;
        let live = fixtures.len();

        let candidates = select_for_statistics(&self.evaluator, fixtures);
        let fetched: Vec<_> = stream::iter(candidates)
            .map(|fx| async move {
                let stats = self.monitor.fetch_statistics(fx.snapshot.match_id).await;
                (fx, stats)
            })
            .buffer_unordered(self.stats_concurrency)
            .collect()
            .await;

        let report = CycleReport { live, ..self.process_fetched(fetched).await };
        self.log_heartbeat(&report);
        Ok(report)
    }

    /// Evaluates fixtures whose statistics request has finished. A failed
    /// request skips that fixture only.
    async fn process_fetched(&self, fetched: Vec<(LiveFixture, fixture_monitor::Result<Value>)>) -> CycleReport {
        let mut report = CycleReport { in_window: fetched.len(), ..CycleReport::default() };

        for (mut fx, stats) in fetched {
            let stats = match stats {
                Ok(stats) => stats,
                Err(e) => {
                    report.fetch_errors += 1;
                    warn!("Statistics for fixture {} unavailable, skipping this cycle: {}", fx.snapshot.match_id, e);
                    continue;
                }
            };
            apply_statistics(&mut fx.snapshot, fx.home_team.id, &stats);

            report.evaluated += 1;
            for signal in self.evaluator.evaluate(&fx.snapshot) {
                report.signals += 1;
                if !self.dispatch(&fx, &signal).await {
                    report.notify_failures += 1;
                }
            }
        }
        report
    }

    fn log_heartbeat(&self, report: &CycleReport) {
        let _ = self.logger.log(&SystemHeartbeatEvent {
            ts:                 now_iso(),
            event:              "SYSTEM_HEARTBEAT",
            poll_interval_secs: self.poll_interval_secs,
            live_fixtures:      report.live,
            in_window:          report.in_window,
            evaluated:          report.evaluated,
            signals:            report.signals,
            fetch_errors:       report.fetch_errors,
            notify_failures:    report.notify_failures,
            fired_total:        self.evaluator.fired_count(),
        });
    }

    /// Sends one fired signal. The signal is already marked fired, a failed
    /// send is logged and the alert is lost.
    async fn dispatch(&self, fx: &LiveFixture, signal: &Signal) -> bool {
        info!(
            match_id = signal.match_id,
            tag = %signal.tag,
            minute = signal.minute,
            p = signal.probability,
            pressure = signal.pressure_side.as_str(),
            "🚨 {} x {} signal fired",
            fx.home_team.name, fx.away_team.name
        );

        let _ = self.logger.log(&SignalFiredEvent {
            ts:              now_iso(),
            event:           "SIGNAL_FIRED",
            match_id:        signal.match_id,
            tag:             signal.tag.clone(),
            minute:          signal.minute,
            home:            fx.home_team.name.clone(),
            away:            fx.away_team.name.clone(),
            league:          fx.league_name.clone(),
            total_corners:   signal.total_corners,
            lambda:          signal.lambda,
            probability:     signal.probability,
            raw_probability: signal.raw_probability,
            pressure_side:   signal.pressure_side.as_str().to_string(),
            dry_run:         self.notifier.is_dry_run(),
        });

        let (ranks, form) = tokio::join!(self.lookup_ranks(fx), self.lookup_team_form(fx));
        let text = format_signal_alert(fx, signal, ranks, form);

        match self.notifier.send(&text).await {
            Ok(message_id) => {
                debug!("Alert delivered, message_id={message_id}");
                true
            }
            Err(e) => {
                warn!("Alert for fixture {} ({}) not delivered: {e:#}", signal.match_id, signal.tag);
                let _ = self.logger.log(&NotifyFailedEvent {
                    ts:       now_iso(),
                    event:    "NOTIFY_FAILED",
                    match_id: signal.match_id,
                    tag:      signal.tag.clone(),
                    error:    format!("{e:#}"),
                });
                false
            }
        }
    }

    async fn lookup_ranks(&self, fx: &LiveFixture) -> Ranks {
        let (Some(league_id), Some(season)) = (fx.snapshot.league_id, fx.season) else {
            return (None, None);
        };
        let rank = |team_id: Option<u64>| async move {
            match team_id {
                Some(id) => self.monitor.team_rank(league_id, season, id).await,
                None => None,
            }
        };
        tokio::join!(rank(fx.home_team.id), rank(fx.away_team.id))
    }

    async fn lookup_team_form(&self, fx: &LiveFixture) -> TeamForm {
        if self.team_form_matches == 0 {
            return (None, None);
        }
        let last = self.team_form_matches;
        let average = |team_id: Option<u64>| async move {
            match team_id {
                Some(id) => self.monitor.team_corner_average(id, last).await,
                None => None,
            }
        };
        tokio::join!(average(fx.home_team.id), average(fx.away_team.id))
    }
}

/// Fixtures worth a statistics request: some window covers the current
/// minute and has not fired for that match yet.
pub fn select_for_statistics(evaluator: &SignalEvaluator, fixtures: Vec<LiveFixture>) -> Vec<LiveFixture> {
    fixtures
        .into_iter()
        .filter(|fx| evaluator.has_open_window(fx.snapshot.match_id, fx.snapshot.elapsed_minute))
        .collect()
}
