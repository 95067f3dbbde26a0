//! Baseline Module - Learned per-AS routing behaviour
//!
//! Folds snapshots into one `AsBaseline` per AS number. Statistics are exact
//! integer accumulators, so training order and partition do not change the
//! result: a model trained on `[a, b]` equals one trained on `[b, a]`, and
//! equals the merge of a model trained on `[a]` with one trained on `[b]`.
//!
//! # Architecture
//! - `types.rs`: `AsBaseline`, `AsSummary`
//! - `layout.rs`: Persisted statistics layout and hash
//! - `validate.rs`: `BaselineError`, envelope validation
//! - `storage.rs`: Checksummed JSON persistence
//! - `export.rs`: CSV / JSON dumps of the learned statistics
//!
//! # Failure Strategy
//! A persisted model that fails layout or checksum validation is never
//! silently reset; the error is surfaced to the caller.

pub mod export;
pub mod layout;
pub mod storage;
pub mod types;
pub mod validate;
#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::record::Asn;
use crate::logic::scorer::ScoringConfig;
use crate::logic::snapshot::Snapshot;

pub use types::{AsBaseline, AsSummary};
pub use validate::BaselineError;

// ============================================================================
// MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineModel {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_trained: Option<DateTime<Utc>>,
    snapshots_trained: u64,
    profiles: BTreeMap<Asn, AsBaseline>,

    // Runtime settings, never persisted
    #[serde(skip)]
    config: ScoringConfig,
}

impl BaselineModel {
    /// Create an untrained model
    pub fn new(name: &str, config: ScoringConfig) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
            last_trained: None,
            snapshots_trained: 0,
            profiles: BTreeMap::new(),
            config,
        }
    }

    // ========================================================================
    // TRAINING
    // ========================================================================

    /// Fold every snapshot into the model
    pub fn train<'a, I>(&mut self, snapshots: I)
    where
        I: IntoIterator<Item = &'a Snapshot>,
    {
        let mut trained = 0usize;
        for snapshot in snapshots {
            if self.train_snapshot(snapshot) > 0 {
                trained += 1;
            }
        }

        log::info!(
            "Model '{}' trained on {} snapshots ({} total, {} ASes)",
            self.name,
            trained,
            self.snapshots_trained,
            self.profiles.len()
        );
    }

    /// Fold one snapshot. Returns the number of ASes updated.
    /// An empty snapshot leaves the model untouched.
    pub fn train_snapshot(&mut self, snapshot: &Snapshot) -> usize {
        if snapshot.is_empty() {
            log::debug!("Snapshot '{}' is empty, nothing to learn", snapshot.source_id());
            return 0;
        }

        for (&asn, profile) in snapshot.profiles() {
            self.profiles
                .entry(asn)
                .and_modify(|b| b.fold(profile))
                .or_insert_with(|| AsBaseline::from_profile(profile));
        }

        self.snapshots_trained += 1;
        self.last_trained = Some(Utc::now());

        log::debug!(
            "Learned {} ASes from snapshot '{}'",
            snapshot.len(),
            snapshot.source_id()
        );
        snapshot.len()
    }

    /// Combine a model trained on a disjoint set of snapshots
    pub fn merge(&mut self, other: &BaselineModel) {
        for (&asn, baseline) in &other.profiles {
            self.profiles
                .entry(asn)
                .and_modify(|b| b.merge(baseline))
                .or_insert_with(|| baseline.clone());
        }

        self.snapshots_trained += other.snapshots_trained;
        self.last_trained = match (self.last_trained, other.last_trained) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    /// Drop all learned statistics, keep identity
    pub fn reset(&mut self) {
        self.profiles.clear();
        self.snapshots_trained = 0;
        self.last_trained = None;
        log::info!("Model '{}' has been reset", self.name);
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn profiles(&self) -> &BTreeMap<Asn, AsBaseline> {
        &self.profiles
    }

    pub fn profile(&self, asn: Asn) -> Option<&AsBaseline> {
        self.profiles.get(&asn)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn snapshots_trained(&self) -> u64 {
        self.snapshots_trained
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ScoringConfig) {
        self.config = config;
    }

    pub fn summaries(&self) -> Vec<AsSummary> {
        self.profiles.values().map(AsSummary::from).collect()
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    pub fn save(&self, path: &Path) -> Result<(), BaselineError> {
        storage::save_model(self, path)?;
        log::info!(
            "Saved model '{}' ({} ASes, {} snapshots) to {}",
            self.name,
            self.profiles.len(),
            self.snapshots_trained,
            path.display()
        );
        Ok(())
    }

    pub fn load(path: &Path, config: ScoringConfig) -> Result<Self, BaselineError> {
        let model = storage::load_model(path, config)?;
        log::info!(
            "Loaded model '{}' ({} ASes, {} snapshots) from {}",
            model.name,
            model.profiles.len(),
            model.snapshots_trained,
            path.display()
        );
        Ok(model)
    }

    /// Load the model at `path`, or start a new one if no file exists.
    /// A file that exists but fails validation is an error.
    pub fn load_or_new(path: &Path, name: &str, config: ScoringConfig) -> Result<Self, BaselineError> {
        match Self::load(path, config.clone()) {
            Ok(model) => Ok(model),
            Err(BaselineError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No model at {}. Starting new model '{}'", path.display(), name);
                Ok(Self::new(name, config))
            }
            Err(e) => {
                log::error!("Model at {} is unusable: {}", path.display(), e);
                Err(e)
            }
        }
    }
}

impl std::fmt::Display for BaselineModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Model '{}' ({}): {} ASes from {} snapshots",
            self.name,
            self.id,
            self.profiles.len(),
            self.snapshots_trained
        )
    }
}
