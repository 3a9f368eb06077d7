/// Pool transition tracking and alert rule implementations
pub mod pool_tracker;
pub mod rules;

pub use pool_tracker::{PoolTracker, PoolTransition};
pub use rules::{ErrorRateRule, FailoverRule};
