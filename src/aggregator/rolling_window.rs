//! Fixed-capacity rolling window of request outcomes
//!
//! Holds the most recent `capacity` error/success samples and estimates the
//! live error rate from them.

use std::collections::VecDeque;

/// Rolling buffer of the most recent request outcomes
///
/// `true` marks a request that hit a 5xx upstream. When the window is full,
/// pushing a new sample evicts the oldest one.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    /// Samples in arrival order, oldest at the front
    samples: VecDeque<bool>,
    /// Maximum number of samples retained
    capacity: usize,
    /// Number of `true` samples currently in the window
    errors: usize,
}

impl RollingWindow {
    /// Create an empty window holding at most `capacity` samples
    ///
    /// A capacity of zero is raised to one.
    ///
    /// # Examples
    ///
    /// ```
    /// use poolwatch::aggregator::RollingWindow;
    ///
    /// let mut window = RollingWindow::new(4);
    /// window.push(true);
    /// window.push(false);
    /// assert_eq!(window.rate(), 50.0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            errors: 0,
        }
    }

    /// Append a sample, evicting the oldest one if the window is full
    pub fn push(&mut self, had_error: bool) {
        if self.samples.len() == self.capacity {
            if let Some(true) = self.samples.pop_front() {
                self.errors -= 1;
            }
        }
        self.samples.push_back(had_error);
        if had_error {
            self.errors += 1;
        }
    }

    /// Error rate as a percentage of the samples in the window
    ///
    /// Only meaningful on a non-empty window; an empty window reports `0.0`.
    pub fn rate(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        100.0 * self.errors as f64 / self.samples.len() as f64
    }

    /// Number of samples currently held
    pub fn size(&self) -> usize {
        self.samples.len()
    }

    /// Number of error samples currently held
    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate over samples from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.samples.iter().copied()
    }
}
