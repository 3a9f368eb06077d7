//! Alert rules for the blue/green deployment watcher
//!
//! Each rule turns a detected condition into a candidate `AlertEvent`. Rules
//! never decide whether the alert is actually delivered; that is the job of
//! the alert manager and its gate.

use crate::aggregator::RollingWindow;
use crate::events::{AlertEvent, AlertKind, Timestamp};
use crate::triggers::PoolTransition;

/// Recommendation attached to every failover alert
pub const FAILOVER_RECOMMENDATION: &str =
    "Verify that the new pool is stable and responding correctly.";

/// Recommendation attached to every error-rate alert
pub const ERROR_RATE_RECOMMENDATION: &str =
    "Inspect backend health and consider rerouting traffic.";

/// Rule that raises a failover alert when traffic switches pools
#[derive(Debug, Clone, Default)]
pub struct FailoverRule;

impl FailoverRule {
    pub fn new() -> Self {
        Self
    }

    /// Build a failover alert for a pool transition
    ///
    /// Only `PoolTransition::Transition` produces an alert; the initial pool
    /// sighting is a baseline, not a failover.
    pub fn evaluate(&self, transition: &PoolTransition, now: Timestamp) -> Option<AlertEvent> {
        let PoolTransition::Transition { from, to } = transition else {
            return None;
        };

        Some(AlertEvent {
            kind: AlertKind::Failover,
            message: format!("Traffic switched from '{}' to '{}'.", from, to),
            fields: vec![
                ("Previous Pool".to_string(), from.clone()),
                ("Current Pool".to_string(), to.clone()),
                (
                    "Recommended Action".to_string(),
                    FAILOVER_RECOMMENDATION.to_string(),
                ),
            ],
            timestamp: now,
        })
    }
}

/// Rule that raises an alert when the rolling error rate exceeds a threshold
#[derive(Debug, Clone)]
pub struct ErrorRateRule {
    /// Error rate, in percent, that must be exceeded
    pub threshold: f64,
    /// Minimum number of samples before the rate is evaluated at all
    pub min_sample_size: usize,
}

impl ErrorRateRule {
    /// Create a new error-rate rule
    ///
    /// # Arguments
    ///
    /// * `threshold` - Error rate in percent; the alert fires when the rate is strictly above it
    /// * `min_sample_size` - Window size required before evaluating
    pub fn new(threshold: f64, min_sample_size: usize) -> Self {
        Self {
            threshold,
            min_sample_size,
        }
    }

    /// Build an error-rate alert if the window is warm and over threshold
    pub fn evaluate(&self, window: &RollingWindow, now: Timestamp) -> Option<AlertEvent> {
        let total = window.size();
        if total == 0 || total < self.min_sample_size {
            return None;
        }

        let rate = window.rate();
        if rate <= self.threshold {
            return None;
        }

        let errors = window.error_count();
        Some(AlertEvent {
            kind: AlertKind::ErrorRate,
            message: format!(
                "High error rate detected: {:.2}% over the last {} requests.",
                rate, total
            ),
            fields: vec![
                ("Error Rate".to_string(), format!("{:.2}%", rate)),
                ("Threshold".to_string(), format!("{:?}%", self.threshold)),
                ("Errors".to_string(), errors.to_string()),
                ("Total Requests".to_string(), total.to_string()),
                (
                    "Suggested Action".to_string(),
                    ERROR_RATE_RECOMMENDATION.to_string(),
                ),
            ],
            timestamp: now,
        })
    }
}
