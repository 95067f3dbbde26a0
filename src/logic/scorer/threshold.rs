//! Scoring Threshold Configuration
//!
//! How far a statistic may drift from its learned distribution before it is
//! flagged, and how much history is needed before drift is measured at all.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MIN_HISTORY, DEFAULT_Z_THRESHOLD, MIN_HISTORY_FLOOR};

/// Scoring Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Flag when |deviation| exceeds this value
    pub z_threshold: f64,

    /// Trained snapshots required before an AS is scored (>= 2)
    pub min_history: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            z_threshold: DEFAULT_Z_THRESHOLD,
            min_history: DEFAULT_MIN_HISTORY,
        }
    }
}

impl ScoringConfig {
    pub fn new(z_threshold: f64) -> Self {
        Self {
            z_threshold,
            ..Default::default()
        }
    }

    /// High sensitivity (lower threshold)
    pub fn high_sensitivity() -> Self {
        Self {
            z_threshold: 2.0,
            ..Default::default()
        }
    }

    /// Low sensitivity (higher threshold, longer history)
    pub fn low_sensitivity() -> Self {
        Self {
            z_threshold: 4.0,
            min_history: 5,
        }
    }

    pub fn with_min_history(mut self, min_history: u64) -> Self {
        self.min_history = min_history.max(MIN_HISTORY_FLOOR);
        self
    }

    /// Enough samples to trust a learned variance
    pub fn has_history(&self, samples: u64) -> bool {
        samples >= self.min_history.max(MIN_HISTORY_FLOOR)
    }

    pub fn is_outlier(&self, deviation: f64) -> bool {
        deviation.abs() > self.z_threshold
    }
}
