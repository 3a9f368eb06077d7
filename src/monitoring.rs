//! Self-monitoring counters for the watcher
//!
//! Tracks how much of the log the watcher has processed and what happened to
//! the alerts it raised, and periodically reports a one-line summary.

use crate::alerts::{DispatchOutcome, SuppressReason};
use log::info;
use std::time::{Duration, Instant};

/// How often the watcher logs its counters while running
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(300);

/// Counters describing the watcher's activity since start
#[derive(Debug, Clone)]
pub struct WatcherStats {
    /// Lines handed to the parser
    pub lines_read: u64,
    /// Lines that decoded into a log event
    pub events_parsed: u64,
    /// Lines discarded as malformed
    pub lines_skipped: u64,
    /// Pool transitions observed
    pub failovers_detected: u64,
    /// Alerts accepted by the sink
    pub alerts_sent: u64,
    /// Alerts held back by cooldown
    pub alerts_cooldown: u64,
    /// Alerts held back by maintenance mode
    pub alerts_maintenance: u64,
    /// Alerts the sink failed to deliver
    pub alerts_failed: u64,
    report_interval: Duration,
    last_report: Instant,
}

impl Default for WatcherStats {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_INTERVAL)
    }
}

impl WatcherStats {
    pub fn new(report_interval: Duration) -> Self {
        Self {
            lines_read: 0,
            events_parsed: 0,
            lines_skipped: 0,
            failovers_detected: 0,
            alerts_sent: 0,
            alerts_cooldown: 0,
            alerts_maintenance: 0,
            alerts_failed: 0,
            report_interval,
            last_report: Instant::now(),
        }
    }

    /// Record one line read from the log and whether it parsed
    pub fn record_line(&mut self, parsed: bool) {
        self.lines_read += 1;
        if parsed {
            self.events_parsed += 1;
        } else {
            self.lines_skipped += 1;
        }
    }

    pub fn record_failover(&mut self) {
        self.failovers_detected += 1;
    }

    /// Record what happened to one candidate alert
    pub fn record_dispatch(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Sent => self.alerts_sent += 1,
            DispatchOutcome::Suppressed(SuppressReason::Cooldown) => self.alerts_cooldown += 1,
            DispatchOutcome::Suppressed(SuppressReason::Maintenance) => {
                self.alerts_maintenance += 1
            }
            DispatchOutcome::Failed => self.alerts_failed += 1,
        }
    }

    /// Percentage of delivery attempts the sink accepted
    ///
    /// Returns 100.0 when nothing has been attempted yet.
    pub fn delivery_success_rate(&self) -> f64 {
        let attempts = self.alerts_sent + self.alerts_failed;
        if attempts == 0 {
            return 100.0;
        }
        100.0 * self.alerts_sent as f64 / attempts as f64
    }

    /// One-line summary of all counters
    pub fn summary(&self) -> String {
        format!(
            "lines={} parsed={} skipped={} failovers={} alerts: sent={} cooldown={} maintenance={} failed={} (delivery {:.1}%)",
            self.lines_read,
            self.events_parsed,
            self.lines_skipped,
            self.failovers_detected,
            self.alerts_sent,
            self.alerts_cooldown,
            self.alerts_maintenance,
            self.alerts_failed,
            self.delivery_success_rate()
        )
    }

    /// Log the summary if the report interval has elapsed since the last one
    pub fn maybe_report(&mut self) {
        if self.last_report.elapsed() >= self.report_interval {
            self.report();
        }
    }

    /// Log the summary now
    pub fn report(&mut self) {
        info!("Watcher stats: {}", self.summary());
        self.last_report = Instant::now();
    }
}
