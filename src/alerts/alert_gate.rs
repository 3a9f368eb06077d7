use crate::events::{AlertKind, Timestamp};
use chrono::Duration;

/// Outcome of asking the gate whether an alert may be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The alert may be delivered
    Fire,
    /// An alert of the same kind fired too recently
    Cooldown { remaining: Duration },
    /// Maintenance mode suppresses all alerts
    Maintenance,
}

/// When each alert kind last fired
///
/// `None` means the kind has never fired. Only updated when an alert is
/// actually dispatched, never when it is suppressed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertGateState {
    last_failover: Option<Timestamp>,
    last_error_rate: Option<Timestamp>,
}

impl AlertGateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// When an alert of `kind` was last dispatched
    pub fn last_fired(&self, kind: AlertKind) -> Option<Timestamp> {
        match kind {
            AlertKind::Failover => self.last_failover,
            AlertKind::ErrorRate => self.last_error_rate,
        }
    }

    /// Record that an alert of `kind` was dispatched at `now`
    pub fn record(&mut self, kind: AlertKind, now: Timestamp) {
        match kind {
            AlertKind::Failover => self.last_failover = Some(now),
            AlertKind::ErrorRate => self.last_error_rate = Some(now),
        }
    }
}

/// Cooldown and maintenance-mode policy for outgoing alerts
///
/// The gate is a pure decision function over an `AlertGateState`: asking it
/// never mutates anything. Callers record the firing themselves, once, when
/// they actually dispatch.
#[derive(Debug, Clone)]
pub struct AlertGate {
    /// Minimum time between two dispatched alerts of the same kind
    cooldown: Duration,
    /// Suppress every alert while still detecting conditions
    maintenance_mode: bool,
}

impl AlertGate {
    /// Create a new gate
    ///
    /// # Arguments
    ///
    /// * `cooldown_seconds` - Minimum seconds between alerts of the same kind
    /// * `maintenance_mode` - Whether all alerts are suppressed
    pub fn new(cooldown_seconds: u64, maintenance_mode: bool) -> Self {
        // chrono durations overflow well above any sensible cooldown
        let seconds = cooldown_seconds.min(i32::MAX as u64) as i64;
        Self {
            cooldown: Duration::seconds(seconds),
            maintenance_mode,
        }
    }

    /// Decide whether an alert of `kind` may be delivered at `now`
    pub fn decide(&self, state: &AlertGateState, kind: AlertKind, now: Timestamp) -> GateDecision {
        if self.maintenance_mode {
            return GateDecision::Maintenance;
        }

        match state.last_fired(kind) {
            Some(last) if now - last < self.cooldown => GateDecision::Cooldown {
                remaining: self.cooldown - (now - last),
            },
            _ => GateDecision::Fire,
        }
    }

    /// Whether an alert of `kind` may be delivered at `now`
    pub fn should_fire(&self, state: &AlertGateState, kind: AlertKind, now: Timestamp) -> bool {
        self.decide(state, kind, now) == GateDecision::Fire
    }

    pub fn maintenance_mode(&self) -> bool {
        self.maintenance_mode
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
