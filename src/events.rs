//! Core event types for the blue/green deployment watcher
//!
//! This module defines the data structures that flow through the watcher:
//! the per-request `LogEvent` decoded from the proxy access log and the
//! `AlertEvent` handed to alert sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// One request observed in the proxy access log
///
/// Produced once per valid log line and consumed immediately by the watcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEvent {
    /// Backend pool that served the request, if the proxy reported one
    pub pool: Option<String>,
    /// Whether any upstream attempt for the request returned a 5xx status
    pub had_error: bool,
}

/// Kind of alert raised by the watcher
///
/// Each kind has its own cooldown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Traffic moved from one backend pool to another
    Failover,
    /// Rolling error rate exceeded the configured threshold
    ErrorRate,
}

impl AlertKind {
    /// Wire name of the alert kind (`failover`, `error_rate`)
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Failover => "failover",
            AlertKind::ErrorRate => "error_rate",
        }
    }

    /// Human-readable notification title
    pub fn title(&self) -> &'static str {
        match self {
            AlertKind::Failover => "Failover Alert",
            AlertKind::ErrorRate => "Error Rate Alert",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert produced by a trigger rule and delivered through an alert sink
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertEvent {
    /// Which condition raised the alert
    pub kind: AlertKind,
    /// Human-readable summary
    pub message: String,
    /// Structured context, in display order
    pub fields: Vec<(String, String)>,
    /// When the condition was detected
    pub timestamp: Timestamp,
}

impl AlertEvent {
    /// Look up a context field by label
    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_kind_names() {
        assert_eq!(AlertKind::Failover.as_str(), "failover");
        assert_eq!(AlertKind::ErrorRate.as_str(), "error_rate");
        assert_eq!(AlertKind::Failover.title(), "Failover Alert");
        assert_eq!(AlertKind::ErrorRate.title(), "Error Rate Alert");
        assert_eq!(AlertKind::ErrorRate.to_string(), "error_rate");
    }

    #[test]
    fn test_alert_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&AlertKind::Failover).unwrap(),
            "\"failover\""
        );
        assert_eq!(
            serde_json::to_string(&AlertKind::ErrorRate).unwrap(),
            "\"error_rate\""
        );
    }

    #[test]
    fn test_alert_event_field_lookup() {
        let alert = AlertEvent {
            kind: AlertKind::Failover,
            message: "Traffic switched from 'blue' to 'green'.".to_string(),
            fields: vec![
                ("Previous Pool".to_string(), "blue".to_string()),
                ("Current Pool".to_string(), "green".to_string()),
            ],
            timestamp: Utc::now(),
        };

        assert_eq!(alert.field("Previous Pool"), Some("blue"));
        assert_eq!(alert.field("Current Pool"), Some("green"));
        assert_eq!(alert.field("Missing"), None);
    }
}
