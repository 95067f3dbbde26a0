//! BGP Anomaly Core
//!
//! Learns a per-AS baseline of routing behaviour from routing-table dumps
//! and flags snapshots that deviate from it.
//!
//! ```no_run
//! use std::path::Path;
//! use bgp_anomaly_core::{BaselineModel, Config, Snapshot};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env();
//! let history = Snapshot::from_path(Path::new("rib.20131101.1200.txt"), &config.snapshot)?;
//!
//! let mut model = BaselineModel::new("default", config.scoring.clone());
//! model.train([&history]);
//!
//! let today = Snapshot::from_path(Path::new("rib.20131102.1200.txt"), &config.snapshot)?;
//! for verdict in model.predict(&today).iter().filter(|v| v.flagged) {
//!     println!("{}", verdict);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod logic;

pub use config::Config;
pub use logic::baseline::{BaselineError, BaselineModel};
pub use logic::record::{Asn, DecodeError, RouteRecord};
pub use logic::scorer::{AnomalyReason, AnomalyVerdict, PredictionReport, ScoringConfig};
pub use logic::snapshot::{AsProfile, Snapshot, SnapshotConfig, SnapshotError};
