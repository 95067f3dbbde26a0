//! Configuration module
//!
//! One explicit configuration object, built from defaults and environment
//! variables, then handed to the snapshot builder and the baseline model.

use std::env;
use std::path::PathBuf;

use crate::constants::{
    APP_DIR_NAME, DEFAULT_MIN_HISTORY, DEFAULT_PROGRESS_INTERVAL, DEFAULT_WORKERS,
    DEFAULT_Z_THRESHOLD, MIN_HISTORY_FLOOR, MODEL_FILE_NAME,
};
use crate::logic::scorer::ScoringConfig;
use crate::logic::snapshot::SnapshotConfig;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Snapshot builder settings (sampling limit, progress logging)
    pub snapshot: SnapshotConfig,

    /// Anomaly scoring settings (threshold, required history)
    pub scoring: ScoringConfig,

    /// Where the baseline model is persisted
    pub model_path: PathBuf,

    /// Worker threads used when building snapshots from many files
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot: SnapshotConfig::default(),
            scoring: ScoringConfig::default(),
            model_path: default_model_path(),
            workers: DEFAULT_WORKERS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let message_limit = env::var("BGP_MESSAGE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n: &usize| n > 0);

        let progress_interval = env::var("BGP_PROGRESS_INTERVAL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PROGRESS_INTERVAL);

        let z_threshold = env::var("BGP_Z_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|z: &f64| z.is_finite() && *z > 0.0)
            .unwrap_or(DEFAULT_Z_THRESHOLD);

        let min_history = env::var("BGP_MIN_HISTORY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MIN_HISTORY);

        let model_path = env::var("BGP_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_model_path());

        let workers = env::var("BGP_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(DEFAULT_WORKERS);

        Self {
            snapshot: SnapshotConfig {
                message_limit,
                progress_interval,
            },
            scoring: ScoringConfig {
                z_threshold,
                min_history: min_history.max(MIN_HISTORY_FLOOR),
            },
            model_path,
            workers,
        }
    }
}

/// Get default model path
pub fn default_model_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(MODEL_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scoring.z_threshold, DEFAULT_Z_THRESHOLD);
        assert_eq!(config.scoring.min_history, DEFAULT_MIN_HISTORY);
        assert!(config.snapshot.message_limit.is_none());
        assert!(config.model_path.ends_with(MODEL_FILE_NAME));
    }
}
