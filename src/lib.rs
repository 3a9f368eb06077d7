/// Error types for the deployment watcher
pub mod error;

/// Access log tailing and line decoding
pub mod collectors;

/// Rolling window of recent request outcomes
pub mod aggregator;

/// Pool transition tracking and alert rules
pub mod triggers;

/// Alert gating, dispatch and sinks
pub mod alerts;

/// Configuration management
pub mod config;

/// Core event types
pub mod events;

/// Self-monitoring counters
pub mod monitoring;

/// Orchestrator wiring the components together
pub mod watcher;

// Re-export commonly used types
pub use config::Config;
pub use error::{AlertError, ConfigError, ParseError, TailError};
pub use watcher::Watcher;
