/// Alert gating, dispatch and delivery
pub mod alert_gate;
pub mod alert_manager;
pub mod sink;

pub use alert_gate::{AlertGate, AlertGateState, GateDecision};
pub use alert_manager::{AlertManager, DispatchOutcome, SuppressReason};
pub use sink::{AlertSink, LogSink, SlackSink};

#[cfg(test)]
pub use sink::MockAlertSink;
