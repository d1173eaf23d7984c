//! Age tracking for refreshable aggregates.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Measures time since the last [`sample`](Self::sample).
#[derive(Debug)]
pub struct RefreshTimer {
    sampled_at: Mutex<Instant>,
}

impl RefreshTimer {
    /// Creates a timer sampled now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sampled_at: Mutex::new(Instant::now()),
        }
    }

    /// Restarts the age from zero.
    pub fn sample(&self) {
        *self.sampled_at.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Time since the last sample, or since construction.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.sampled_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }
}

impl Default for RefreshTimer {
    fn default() -> Self {
        Self::new()
    }
}
