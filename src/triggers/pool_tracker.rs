//! Backend pool transition detection
//!
//! Remembers the last pool reported by the proxy and classifies every new
//! observation as the first sighting, a repeat, or a switch to another pool.

use log::debug;

/// Result of observing one request's pool label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolTransition {
    /// First pool ever seen; establishes the baseline, never a failover
    Initial(String),
    /// Same pool as before, or no pool reported
    NoChange,
    /// Traffic moved from one pool to another
    Transition { from: String, to: String },
}

/// Tracks the last observed backend pool
#[derive(Debug, Clone, Default)]
pub struct PoolTracker {
    last_pool: Option<String>,
}

impl PoolTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe the pool label of one request
    ///
    /// Absent or empty labels are ignored entirely: they are neither applied
    /// nor compared against the tracked pool.
    pub fn observe(&mut self, pool: Option<&str>) -> PoolTransition {
        let pool = match pool {
            Some(pool) if !pool.is_empty() => pool,
            _ => return PoolTransition::NoChange,
        };

        if self.last_pool.as_deref() == Some(pool) {
            return PoolTransition::NoChange;
        }

        match self.last_pool.replace(pool.to_string()) {
            None => PoolTransition::Initial(pool.to_string()),
            Some(from) => {
                debug!("Pool changed from '{}' to '{}'", from, pool);
                PoolTransition::Transition {
                    from,
                    to: pool.to_string(),
                }
            }
        }
    }

    /// The pool currently believed to be serving traffic
    pub fn current(&self) -> Option<&str> {
        self.last_pool.as_deref()
    }
}
