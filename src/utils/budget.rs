// src/utils/budget.rs

//! Wall-clock budget for a single run.

use std::time::{Duration, Instant};

/// Tracks elapsed time against a fixed allowance.
#[derive(Debug, Clone, Copy)]
pub struct RunBudget {
    started: Instant,
    allowance: Duration,
}

impl RunBudget {
    /// Start a budget now.
    pub fn new(allowance: Duration) -> Self {
        Self {
            started: Instant::now(),
            allowance,
        }
    }

    /// A budget that never runs out.
    pub fn unlimited() -> Self {
        Self::new(Duration::MAX)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn exhausted(&self) -> bool {
        self.elapsed() >= self.allowance
    }
}
