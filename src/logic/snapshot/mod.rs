//! Snapshot Module - Per-AS aggregation of one routing dump
//!
//! Aggregates a stream of route records taken at one point in time into a
//! mapping from AS number to `AsProfile`.
//!
//! # Architecture
//! - `profile.rs`: `AsProfile`, the per-AS observations
//! - `source.rs`: `SnapshotSource` factory (raw dump vs serialized snapshot)
//! - `export.rs`: JSON / CSV export and JSON re-import
//!
//! # Failure Strategy
//! Malformed updates are skipped and counted by reason. A snapshot with zero
//! valid records is returned empty with a warning. Only I/O failures on the
//! underlying stream reach the caller.

pub mod profile;
pub mod source;
pub mod export;

use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::DEFAULT_PROGRESS_INTERVAL;
use crate::logic::record::{Asn, DecodeError, RawUpdate, RouteRecord};

pub use profile::AsProfile;
pub use source::{timestamp_from_file_name, SnapshotSource};

// ============================================================================
// CONFIG & ERRORS
// ============================================================================

/// Snapshot builder settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
    /// Stop after this many valid records. The resulting snapshot is a
    /// partial sample of the dump, not a full aggregation.
    pub message_limit: Option<usize>,

    /// Log progress every N valid records (0 disables)
    pub progress_interval: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            message_limit: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl SnapshotConfig {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            message_limit: Some(limit),
            ..Default::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialized snapshot is invalid: {0}")]
    Format(#[from] serde_json::Error),

    #[error("unsupported snapshot source '{0}': decode it to dump lines first")]
    Unsupported(String),

    #[error("serialized snapshot is inconsistent: {0}")]
    Inconsistent(String),
}

/// Bookkeeping of what was consumed while building
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub valid_records: u64,
    pub skipped_records: u64,
    pub skipped_by_reason: BTreeMap<String, u64>,
    /// `message_limit` stopped consumption early
    pub limit_reached: bool,
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Aggregated per-AS statistics of one batch of routing updates.
/// Owns its profiles exclusively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    source_id: String,
    timestamp: Option<DateTime<Utc>>,
    profiles: BTreeMap<Asn, AsProfile>,
    #[serde(default)]
    stats: IngestStats,
}

impl Snapshot {
    /// Build or load a snapshot from a source chosen by `SnapshotSource::from_path`
    pub fn from_path(path: &Path, config: &SnapshotConfig) -> Result<Self, SnapshotError> {
        Self::from_source(&SnapshotSource::from_path(path)?, config)
    }

    pub fn from_source(source: &SnapshotSource, config: &SnapshotConfig) -> Result<Self, SnapshotError> {
        source.load(config)
    }

    /// Build from dump lines. Blank lines and `#` comments are ignored.
    pub fn from_reader<R: BufRead>(
        source_id: &str,
        timestamp: Option<DateTime<Utc>>,
        reader: R,
        config: &SnapshotConfig,
    ) -> Result<Self, SnapshotError> {
        let mut io_error = None;

        let updates = reader
            .lines()
            .map_while(|line| match line {
                Ok(line) => Some(line),
                Err(e) => {
                    io_error = Some(e);
                    None
                }
            })
            .filter(|line| {
                let trimmed = line.trim();
                !trimmed.is_empty() && !trimmed.starts_with('#')
            })
            .map(|line| RawUpdate::parse_line(&line));

        let snapshot = SnapshotBuilder::new(source_id, config.clone())
            .with_timestamp(timestamp)
            .build_from(updates);

        match io_error {
            Some(e) => Err(e.into()),
            None => Ok(snapshot),
        }
    }

    /// Assemble a snapshot from profiles that were aggregated elsewhere
    pub fn from_profiles(
        source_id: &str,
        timestamp: Option<DateTime<Utc>>,
        profiles: impl IntoIterator<Item = AsProfile>,
    ) -> Self {
        Self {
            source_id: source_id.to_string(),
            timestamp,
            profiles: profiles.into_iter().map(|p| (p.as_number(), p)).collect(),
            stats: IngestStats::default(),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn profiles(&self) -> &BTreeMap<Asn, AsProfile> {
        &self.profiles
    }

    pub fn profile(&self, as_number: Asn) -> Option<&AsProfile> {
        self.profiles.get(&as_number)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Check the invariants the builder guarantees but a hand-edited or
    /// foreign JSON file may break
    pub fn validate(&self) -> Result<(), SnapshotError> {
        for (&key, profile) in &self.profiles {
            if profile.as_number() != key {
                return Err(SnapshotError::Inconsistent(format!(
                    "profile under AS{} describes AS{}",
                    key,
                    profile.as_number()
                )));
            }
            if profile.neighbors().contains(&key) {
                return Err(SnapshotError::Inconsistent(format!(
                    "AS{} lists itself as a neighbour",
                    key
                )));
            }
            if profile.path_length_samples() != profile.message_count() {
                return Err(SnapshotError::Inconsistent(format!(
                    "AS{} has {} path lengths for {} messages",
                    key,
                    profile.path_length_samples(),
                    profile.message_count()
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source_id)
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Incremental aggregation of route records into a `Snapshot`.
///
/// Per record, every AS in the path is updated once: the full hop count is
/// added to its path-length samples and its message count grows by one.
/// Concrete neighbours in the path become mutual neighbours. Only the origin
/// is credited with an announced prefix.
pub struct SnapshotBuilder {
    source_id: String,
    timestamp: Option<DateTime<Utc>>,
    earliest: Option<DateTime<Utc>>,
    config: SnapshotConfig,
    profiles: BTreeMap<Asn, AsProfile>,
    stats: IngestStats,
    started: Instant,
}

impl SnapshotBuilder {
    pub fn new(source_id: &str, config: SnapshotConfig) -> Self {
        Self {
            source_id: source_id.to_string(),
            timestamp: None,
            earliest: None,
            config,
            profiles: BTreeMap::new(),
            stats: IngestStats::default(),
            started: Instant::now(),
        }
    }

    /// Fix the snapshot time instead of using the earliest record time
    pub fn with_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// True once `message_limit` valid records have been folded
    pub fn is_full(&self) -> bool {
        self.config
            .message_limit
            .map(|limit| self.stats.valid_records >= limit as u64)
            .unwrap_or(false)
    }

    /// Fold one decoded record
    pub fn push(&mut self, record: &RouteRecord) {
        let path = record.as_path();
        let path_len = path.len() as u32;
        let last = path.len().saturating_sub(1);

        // Distinct ASes in this path, flagged when they sit at either end
        let mut members: BTreeMap<Asn, bool> = BTreeMap::new();
        for (i, hop) in path.iter().enumerate() {
            let at_end = i == 0 || i == last;
            for &asn in hop.members() {
                *members.entry(asn).or_insert(false) |= at_end;
            }
        }

        for (&asn, &at_end) in &members {
            self.profiles
                .entry(asn)
                .or_insert_with(|| AsProfile::new(asn))
                .record_message(path_len, at_end);
        }

        let mut adjacent: BTreeSet<(Asn, Asn)> = BTreeSet::new();
        for pair in path.windows(2) {
            if let (Some(a), Some(b)) = (pair[0].asn(), pair[1].asn()) {
                if a != b {
                    adjacent.insert((a, b));
                }
            }
        }
        for (a, b) in adjacent {
            if let Some(profile) = self.profiles.get_mut(&a) {
                profile.add_neighbor(b);
            }
            if let Some(profile) = self.profiles.get_mut(&b) {
                profile.add_neighbor(a);
            }
        }

        if !record.withdrawn() {
            if let Some(origin) = self.profiles.get_mut(&record.origin_as()) {
                origin.record_announcement(record.prefix());
            }
        }

        let ts = record.timestamp();
        if self.earliest.map_or(true, |e| ts < e) {
            self.earliest = Some(ts);
        }

        self.stats.valid_records += 1;
        self.log_progress();
    }

    /// Count one malformed update
    pub fn skip(&mut self, error: &DecodeError) {
        log::debug!("Skipping update in '{}': {}", self.source_id, error);
        self.stats.skipped_records += 1;
        *self
            .stats
            .skipped_by_reason
            .entry(error.kind().to_string())
            .or_insert(0) += 1;
    }

    /// Consume updates in arrival order until exhausted or the limit is hit
    pub fn build_from<I>(mut self, updates: I) -> Snapshot
    where
        I: IntoIterator<Item = Result<RawUpdate, DecodeError>>,
    {
        let mut updates = updates.into_iter();
        while !self.is_full() {
            let Some(update) = updates.next() else {
                break;
            };
            match update.and_then(|raw| RouteRecord::decode(&raw)) {
                Ok(record) => self.push(&record),
                Err(e) => self.skip(&e),
            }
        }
        self.build()
    }

    /// Fold already decoded records
    pub fn build_from_records<'a, I>(mut self, records: I) -> Snapshot
    where
        I: IntoIterator<Item = &'a RouteRecord>,
    {
        let mut records = records.into_iter();
        while !self.is_full() {
            let Some(record) = records.next() else {
                break;
            };
            self.push(record);
        }
        self.build()
    }

    pub fn build(mut self) -> Snapshot {
        self.stats.limit_reached = self.is_full();

        if let Some(limit) = self.config.message_limit.filter(|_| self.stats.limit_reached) {
            log::info!(
                "Snapshot '{}': message limit of {} reached, snapshot is a partial sample",
                self.source_id,
                limit
            );
        }

        if self.profiles.is_empty() {
            log::warn!(
                "Snapshot '{}' has no valid records ({} skipped)",
                self.source_id,
                self.stats.skipped_records
            );
        } else {
            log::info!(
                "Snapshot '{}': {} records, {} skipped, {} ASes in {:.1}s",
                self.source_id,
                self.stats.valid_records,
                self.stats.skipped_records,
                self.profiles.len(),
                self.started.elapsed().as_secs_f64()
            );
        }

        Snapshot {
            source_id: self.source_id,
            timestamp: self.timestamp.or(self.earliest),
            profiles: self.profiles,
            stats: self.stats,
        }
    }

    fn log_progress(&self) {
        let interval = self.config.progress_interval as u64;
        if interval == 0 || self.stats.valid_records % interval != 0 {
            return;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            self.stats.valid_records as f64 / elapsed
        } else {
            0.0
        };
        log::info!(
            "{} messages processed ({:.0} msg/s)",
            self.stats.valid_records,
            rate
        );
    }
}
