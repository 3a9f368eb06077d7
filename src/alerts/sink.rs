use crate::error::AlertError;
use crate::events::{AlertEvent, AlertKind};
use chrono::Local;
use log::{debug, info};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Footer shown on every webhook notification
const NOTIFICATION_FOOTER: &str = "Blue/Green Deployment Monitor";

/// Destination for alerts that passed the gate
///
/// Implementations must not block indefinitely: the watcher calls `notify`
/// from its ingestion loop.
#[cfg_attr(test, mockall::automock)]
pub trait AlertSink: Send {
    /// Deliver one alert
    ///
    /// # Errors
    ///
    /// Returns `AlertError` if delivery failed. The caller logs and drops it.
    fn notify(&self, alert: &AlertEvent) -> Result<(), AlertError>;
}

/// Sink used when no webhook is configured; writes alerts to the log
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl AlertSink for LogSink {
    fn notify(&self, alert: &AlertEvent) -> Result<(), AlertError> {
        info!(
            "[ALERT] {}: {}",
            alert.kind.as_str().to_uppercase(),
            alert.message
        );
        for (label, value) in &alert.fields {
            debug!("  {}: {}", label, value);
        }
        Ok(())
    }
}

/// Webhook request body
#[derive(Debug, Serialize)]
struct WebhookPayload {
    attachments: Vec<WebhookAttachment>,
}

#[derive(Debug, Serialize)]
struct WebhookAttachment {
    color: &'static str,
    title: &'static str,
    text: String,
    fields: Vec<WebhookField>,
    footer: &'static str,
}

#[derive(Debug, Serialize)]
struct WebhookField {
    title: String,
    value: String,
    short: bool,
}

/// Sink that posts alerts to a Slack-compatible incoming webhook
///
/// Requests run on a private single-threaded tokio runtime. The whole
/// attempt, connect included, is bounded by `timeout`, so a slow webhook
/// delays ingestion by at most that long.
pub struct SlackSink {
    client: Client,
    webhook_url: String,
    timeout: Duration,
    runtime: tokio::runtime::Runtime,
}

impl SlackSink {
    /// Create a new webhook sink
    ///
    /// # Arguments
    ///
    /// * `webhook_url` - Incoming webhook URL
    /// * `timeout` - Upper bound on a single delivery attempt
    ///
    /// # Errors
    ///
    /// Returns `AlertError` if the HTTP client or runtime cannot be built.
    pub fn new(webhook_url: String, timeout: Duration) -> Result<Self, AlertError> {
        let client = Client::builder().build()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AlertError::RuntimeError(e.to_string()))?;

        Ok(Self {
            client,
            webhook_url,
            timeout,
            runtime,
        })
    }

    /// Attachment color for an alert kind
    fn color(kind: AlertKind) -> &'static str {
        match kind {
            AlertKind::ErrorRate => "#E53935",
            AlertKind::Failover => "#1E88E5",
        }
    }

    /// Build the webhook payload for an alert
    fn build_payload(alert: &AlertEvent) -> WebhookPayload {
        let mut fields = vec![
            WebhookField {
                title: "Time".to_string(),
                value: alert
                    .timestamp
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
                short: true,
            },
            WebhookField {
                title: "Type".to_string(),
                value: alert.kind.as_str().to_string(),
                short: true,
            },
        ];
        fields.extend(alert.fields.iter().map(|(label, value)| WebhookField {
            title: label.clone(),
            value: value.clone(),
            short: true,
        }));

        WebhookPayload {
            attachments: vec![WebhookAttachment {
                color: Self::color(alert.kind),
                title: alert.kind.title(),
                text: alert.message.clone(),
                fields,
                footer: NOTIFICATION_FOOTER,
            }],
        }
    }

    async fn post(&self, payload: &WebhookPayload) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlertError::HttpStatus(status.as_u16()));
        }
        Ok(())
    }
}

impl AlertSink for SlackSink {
    fn notify(&self, alert: &AlertEvent) -> Result<(), AlertError> {
        let payload = Self::build_payload(alert);
        let result = self.runtime.block_on(async {
            match tokio::time::timeout(self.timeout, self.post(&payload)).await {
                Ok(result) => result,
                Err(_) => Err(AlertError::Timeout(self.timeout.as_secs())),
            }
        });

        if result.is_ok() {
            info!("[SLACK] {} alert sent successfully.", alert.kind);
        }
        result
    }
}
