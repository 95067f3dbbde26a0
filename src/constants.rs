//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Environment overrides are read in `config.rs`.

/// Default |z| above which a path-length or prefix-count deviation is flagged
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

/// Minimum trained snapshots before outlier scoring is attempted.
/// Sample variance needs at least two observations, so this is also the floor.
pub const MIN_HISTORY_FLOOR: u64 = 2;

/// Default minimum trained snapshots for outlier scoring
pub const DEFAULT_MIN_HISTORY: u64 = MIN_HISTORY_FLOOR;

/// Log a progress line every N valid records while building a snapshot
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100_000;

/// Default worker threads for multi-file snapshot building
pub const DEFAULT_WORKERS: usize = 4;

/// Directory name under the platform data dir
pub const APP_DIR_NAME: &str = "bgp-anomaly";

/// File name of the persisted baseline model
pub const MODEL_FILE_NAME: &str = "baseline_model_v1.json";

/// Score attached to verdicts with no distribution to compare against
pub const SENTINEL_SCORE: f64 = f64::MAX;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "bgp-anomaly";
