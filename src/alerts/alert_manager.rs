use crate::alerts::{AlertGate, AlertGateState, AlertSink, GateDecision};
use crate::events::{AlertEvent, AlertKind, Timestamp};
use chrono::Utc;
use log::{debug, error, info};

/// Why an alert was not delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Maintenance mode is on
    Maintenance,
    /// An alert of the same kind fired within the cooldown
    Cooldown,
}

/// Result of handing one candidate alert to the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The sink accepted the alert
    Sent,
    /// The gate held the alert back; nothing was recorded
    Suppressed(SuppressReason),
    /// The gate allowed the alert but the sink failed; the cooldown still applies
    Failed,
}

/// Routes candidate alerts through the gate to the sink
///
/// The AlertManager owns the gate state exclusively. The firing time is
/// recorded at decision time, before the sink is called, so a slow or failing
/// sink never stretches or resets the cooldown.
pub struct AlertManager {
    gate: AlertGate,
    state: AlertGateState,
    sink: Box<dyn AlertSink>,
}

impl AlertManager {
    /// Create a new alert manager
    ///
    /// # Arguments
    ///
    /// * `gate` - Cooldown and maintenance policy
    /// * `sink` - Where alerts that pass the gate are delivered
    pub fn new(gate: AlertGate, sink: Box<dyn AlertSink>) -> Self {
        Self {
            gate,
            state: AlertGateState::new(),
            sink,
        }
    }

    /// Dispatch an alert using the current time for the cooldown decision
    pub fn dispatch(&mut self, alert: AlertEvent) -> DispatchOutcome {
        self.dispatch_at(alert, Utc::now())
    }

    /// Dispatch an alert, deciding the cooldown against `now`
    ///
    /// Sink failures are logged and reported as `DispatchOutcome::Failed`;
    /// they are never retried.
    pub fn dispatch_at(&mut self, alert: AlertEvent, now: Timestamp) -> DispatchOutcome {
        match self.gate.decide(&self.state, alert.kind, now) {
            GateDecision::Maintenance => {
                info!("[MAINTENANCE MODE] {} alert suppressed.", alert.kind);
                DispatchOutcome::Suppressed(SuppressReason::Maintenance)
            }
            GateDecision::Cooldown { remaining } => {
                debug!(
                    "{} alert suppressed by cooldown ({}s remaining)",
                    alert.kind,
                    remaining.num_seconds()
                );
                DispatchOutcome::Suppressed(SuppressReason::Cooldown)
            }
            GateDecision::Fire => {
                self.state.record(alert.kind, now);
                match self.sink.notify(&alert) {
                    Ok(()) => DispatchOutcome::Sent,
                    Err(e) => {
                        error!("Failed to send {} alert: {}", alert.kind, e);
                        DispatchOutcome::Failed
                    }
                }
            }
        }
    }

    /// When an alert of `kind` was last dispatched
    pub fn last_fired(&self, kind: AlertKind) -> Option<Timestamp> {
        self.state.last_fired(kind)
    }
}
