//! Orchestrator that turns access log lines into alerts
//!
//! The watcher runs on a single thread and exclusively owns all detection
//! state: the rolling window, the pool tracker and (through the alert
//! manager) the cooldown state. For every accepted log event it:
//!
//! 1. pushes the request outcome into the rolling window,
//! 2. checks for a pool transition and raises a failover alert,
//! 3. checks the rolling error rate and raises an error-rate alert.
//!
//! Every candidate alert goes through the alert manager, which applies the
//! cooldown and maintenance policy before calling the sink.

use crate::aggregator::RollingWindow;
use crate::alerts::{AlertGate, AlertManager, AlertSink, DispatchOutcome, SuppressReason};
use crate::collectors::parse_line;
use crate::config::Config;
use crate::error::TailError;
use crate::events::{AlertEvent, AlertKind, LogEvent, Timestamp};
use crate::monitoring::WatcherStats;
use crate::triggers::{ErrorRateRule, FailoverRule, PoolTracker, PoolTransition};
use chrono::Utc;
use log::{debug, info, warn};

/// Single-threaded failover and error-rate detector
pub struct Watcher {
    window: RollingWindow,
    pools: PoolTracker,
    failover_rule: FailoverRule,
    error_rate_rule: ErrorRateRule,
    alerts: AlertManager,
    stats: WatcherStats,
}

impl Watcher {
    /// Create a watcher from validated configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Thresholds, window size and alert policy
    /// * `sink` - Destination for alerts that pass the gate
    pub fn new(config: &Config, sink: Box<dyn AlertSink>) -> Self {
        info!(
            "Watcher started with threshold={}%, window={}, min_samples={}, cooldown={}s, maintenance={}",
            config.error_threshold,
            config.window_size,
            config.min_sample_size,
            config.cooldown_seconds,
            config.maintenance_mode
        );

        Self {
            window: RollingWindow::new(config.window_size),
            pools: PoolTracker::new(),
            failover_rule: FailoverRule::new(),
            error_rate_rule: ErrorRateRule::new(config.error_threshold, config.min_sample_size),
            alerts: AlertManager::new(
                AlertGate::new(config.cooldown_seconds, config.maintenance_mode),
                sink,
            ),
            stats: WatcherStats::default(),
        }
    }

    /// Process lines until the sequence ends or a read fails
    ///
    /// # Errors
    ///
    /// Returns the first `TailError` produced by `lines`; malformed lines and
    /// alert delivery failures never end the loop.
    pub fn run<I>(&mut self, lines: I) -> Result<(), TailError>
    where
        I: IntoIterator<Item = Result<String, TailError>>,
    {
        for line in lines {
            let line = line?;
            self.process_line(&line);
            self.stats.maybe_report();
        }
        Ok(())
    }

    /// Process one raw log line at the current time
    pub fn process_line(&mut self, line: &str) -> Vec<(AlertKind, DispatchOutcome)> {
        self.process_line_at(line, Utc::now())
    }

    /// Process one raw log line, using `now` for alert timestamps and cooldowns
    ///
    /// Returns the outcome of every alert the line raised, in evaluation
    /// order. Malformed lines return an empty list.
    pub fn process_line_at(
        &mut self,
        line: &str,
        now: Timestamp,
    ) -> Vec<(AlertKind, DispatchOutcome)> {
        let event = parse_line(line);
        self.stats.record_line(event.is_some());
        match event {
            Some(event) => self.process_event_at(event, now),
            None => Vec::new(),
        }
    }

    /// Apply one decoded log event to the detection state
    pub fn process_event_at(
        &mut self,
        event: LogEvent,
        now: Timestamp,
    ) -> Vec<(AlertKind, DispatchOutcome)> {
        let mut outcomes = Vec::new();
        self.window.push(event.had_error);

        let transition = self.pools.observe(event.pool.as_deref());
        match &transition {
            PoolTransition::Initial(pool) => info!("Initial pool detected: {}", pool),
            PoolTransition::Transition { .. } => self.stats.record_failover(),
            PoolTransition::NoChange => {}
        }
        if let Some(alert) = self.failover_rule.evaluate(&transition, now) {
            outcomes.push(self.raise(alert, now));
        }

        if let Some(alert) = self.error_rate_rule.evaluate(&self.window, now) {
            outcomes.push(self.raise(alert, now));
        }

        outcomes
    }

    /// Hand a candidate alert to the manager and account for the outcome
    fn raise(&mut self, alert: AlertEvent, now: Timestamp) -> (AlertKind, DispatchOutcome) {
        let kind = alert.kind;
        let tag = match kind {
            AlertKind::Failover => "FAILOVER",
            AlertKind::ErrorRate => "ERROR RATE",
        };
        let message = alert.message.clone();

        let outcome = self.alerts.dispatch_at(alert, now);
        match outcome {
            DispatchOutcome::Suppressed(SuppressReason::Cooldown) => {
                debug!("[{}] {}", tag, message)
            }
            _ => warn!("[{}] {}", tag, message),
        }

        self.stats.record_dispatch(outcome);
        (kind, outcome)
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    /// The pool currently believed to be serving traffic
    pub fn current_pool(&self) -> Option<&str> {
        self.pools.current()
    }

    pub fn stats(&self) -> &WatcherStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut WatcherStats {
        &mut self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::MockAlertSink;
    use crate::error::AlertError;
    use chrono::Duration;

    fn test_config() -> Config {
        Config {
            error_threshold: 2.0,
            window_size: 200,
            cooldown_seconds: 300,
            maintenance_mode: false,
            min_sample_size: 20,
            ..Config::default()
        }
    }

    fn line(pool: &str, status: &str) -> String {
        serde_json::json!({ "pool": pool, "upstream_status": status }).to_string()
    }

    #[test]
    fn test_error_rate_alert_fires_once_on_twentieth_event() {
        let mut sink = MockAlertSink::new();
        sink.expect_notify()
            .withf(|alert: &AlertEvent| {
                alert.kind == AlertKind::ErrorRate
                    && alert.field("Error Rate") == Some("5.00%")
                    && alert.field("Errors") == Some("1")
                    && alert.field("Total Requests") == Some("20")
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut watcher = Watcher::new(&test_config(), Box::new(sink));
        let t0 = Utc::now();

        for i in 0..19 {
            let status = if i == 0 { "502" } else { "200" };
            let outcomes =
                watcher.process_line_at(&line("blue", status), t0 + Duration::seconds(i));
            assert!(outcomes.is_empty(), "no alert expected on event {}", i + 1);
        }

        let outcomes = watcher.process_line_at(&line("blue", "200"), t0 + Duration::seconds(19));
        assert_eq!(outcomes, vec![(AlertKind::ErrorRate, DispatchOutcome::Sent)]);

        // Still above threshold, but inside the cooldown
        let outcomes = watcher.process_line_at(&line("blue", "200"), t0 + Duration::seconds(20));
        assert_eq!(
            outcomes,
            vec![(
                AlertKind::ErrorRate,
                DispatchOutcome::Suppressed(SuppressReason::Cooldown)
            )]
        );
        assert_eq!(watcher.stats().alerts_sent, 1);
        assert_eq!(watcher.stats().alerts_cooldown, 1);
    }

    #[test]
    fn test_failover_alert_after_initial_pool() {
        let mut sink = MockAlertSink::new();
        sink.expect_notify()
            .withf(|alert: &AlertEvent| {
                alert.kind == AlertKind::Failover
                    && alert.field("Previous Pool") == Some("blue")
                    && alert.field("Current Pool") == Some("green")
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut watcher = Watcher::new(&test_config(), Box::new(sink));
        let t0 = Utc::now();

        assert!(watcher.process_line_at(&line("blue", "200"), t0).is_empty());
        assert_eq!(watcher.current_pool(), Some("blue"));
        assert!(watcher
            .process_line_at(&line("blue", "200"), t0 + Duration::seconds(1))
            .is_empty());

        let outcomes = watcher.process_line_at(&line("green", "200"), t0 + Duration::seconds(2));
        assert_eq!(outcomes, vec![(AlertKind::Failover, DispatchOutcome::Sent)]);
        assert_eq!(watcher.current_pool(), Some("green"));

        // Switching back within the cooldown is detected but not delivered
        let outcomes = watcher.process_line_at(&line("blue", "200"), t0 + Duration::seconds(3));
        assert_eq!(
            outcomes,
            vec![(
                AlertKind::Failover,
                DispatchOutcome::Suppressed(SuppressReason::Cooldown)
            )]
        );
        assert_eq!(watcher.stats().failovers_detected, 2);
    }

    #[test]
    fn test_events_without_pool_still_count_towards_error_rate() {
        let mut sink = MockAlertSink::new();
        sink.expect_notify().times(1).returning(|_| Ok(()));

        let config = Config {
            min_sample_size: 2,
            ..test_config()
        };
        let mut watcher = Watcher::new(&config, Box::new(sink));
        let now = Utc::now();

        assert!(watcher
            .process_line_at(r#"{"upstream_status":"200"}"#, now)
            .is_empty());
        let outcomes = watcher.process_line_at(r#"{"upstream_status":"500"}"#, now);
        assert_eq!(outcomes, vec![(AlertKind::ErrorRate, DispatchOutcome::Sent)]);
        assert_eq!(watcher.current_pool(), None);
        assert_eq!(watcher.window().size(), 2);
    }

    #[test]
    fn test_failover_checked_before_error_rate() {
        let mut sink = MockAlertSink::new();
        sink.expect_notify().times(2).returning(|_| Ok(()));

        let config = Config {
            min_sample_size: 1,
            ..test_config()
        };
        let mut watcher = Watcher::new(&config, Box::new(sink));
        let now = Utc::now();

        assert!(watcher.process_line_at(&line("blue", "200"), now).is_empty());
        let outcomes = watcher.process_line_at(&line("green", "503"), now);
        assert_eq!(
            outcomes,
            vec![
                (AlertKind::Failover, DispatchOutcome::Sent),
                (AlertKind::ErrorRate, DispatchOutcome::Sent),
            ]
        );
    }

    #[test]
    fn test_maintenance_mode_detects_but_never_sends() {
        let mut sink = MockAlertSink::new();
        sink.expect_notify().times(0);

        let config = Config {
            maintenance_mode: true,
            min_sample_size: 1,
            ..test_config()
        };
        let mut watcher = Watcher::new(&config, Box::new(sink));
        let now = Utc::now();

        watcher.process_line_at(&line("blue", "200"), now);
        let outcomes = watcher.process_line_at(&line("green", "500"), now);
        assert_eq!(
            outcomes,
            vec![
                (
                    AlertKind::Failover,
                    DispatchOutcome::Suppressed(SuppressReason::Maintenance)
                ),
                (
                    AlertKind::ErrorRate,
                    DispatchOutcome::Suppressed(SuppressReason::Maintenance)
                ),
            ]
        );
        assert_eq!(watcher.stats().failovers_detected, 1);
        assert_eq!(watcher.stats().alerts_maintenance, 2);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let mut sink = MockAlertSink::new();
        sink.expect_notify().times(0);

        let mut watcher = Watcher::new(&test_config(), Box::new(sink));
        let now = Utc::now();

        assert!(watcher.process_line_at("not json", now).is_empty());
        assert!(watcher.process_line_at(r#"{"pool":"bl"#, now).is_empty());
        assert!(watcher.process_line_at("17", now).is_empty());

        assert_eq!(watcher.window().size(), 0);
        assert_eq!(watcher.stats().lines_read, 3);
        assert_eq!(watcher.stats().lines_skipped, 3);
    }

    #[test]
    fn test_sink_failure_does_not_stop_processing() {
        let mut sink = MockAlertSink::new();
        sink.expect_notify()
            .times(1)
            .returning(|_| Err(AlertError::Timeout(5)));

        let mut watcher = Watcher::new(&test_config(), Box::new(sink));
        let t0 = Utc::now();

        watcher.process_line_at(&line("blue", "200"), t0);
        let outcomes = watcher.process_line_at(&line("green", "200"), t0);
        assert_eq!(outcomes, vec![(AlertKind::Failover, DispatchOutcome::Failed)]);

        // The failed attempt still started the cooldown
        let outcomes = watcher.process_line_at(&line("blue", "200"), t0 + Duration::seconds(10));
        assert_eq!(
            outcomes,
            vec![(
                AlertKind::Failover,
                DispatchOutcome::Suppressed(SuppressReason::Cooldown)
            )]
        );
        assert_eq!(watcher.stats().alerts_failed, 1);
    }

    #[test]
    fn test_run_consumes_lines_until_end() {
        let mut sink = MockAlertSink::new();
        sink.expect_notify().times(1).returning(|_| Ok(()));

        let mut watcher = Watcher::new(&test_config(), Box::new(sink));
        let lines = vec![
            Ok(line("blue", "200")),
            Ok("garbage".to_string()),
            Ok(line("green", "200")),
        ];

        assert!(watcher.run(lines).is_ok());
        assert_eq!(watcher.stats().lines_read, 3);
        assert_eq!(watcher.stats().alerts_sent, 1);
    }

    #[test]
    fn test_run_stops_on_read_error() {
        let mut sink = MockAlertSink::new();
        sink.expect_notify().times(0);

        let mut watcher = Watcher::new(&test_config(), Box::new(sink));
        let lines = vec![
            Ok(line("blue", "200")),
            Err(TailError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk gone",
            ))),
            Ok(line("green", "200")),
        ];

        assert!(matches!(watcher.run(lines), Err(TailError::IoError(_))));
        assert_eq!(watcher.stats().lines_read, 1);
        assert_eq!(watcher.current_pool(), Some("blue"));
    }
}
