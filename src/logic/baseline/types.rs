use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::logic::record::Asn;
use crate::logic::snapshot::AsProfile;
use crate::logic::stats::{from_fixed_point, Moments};

// ============================================================================
// PER-AS BASELINE
// ============================================================================

/// Learned normal behaviour of one AS across every training snapshot it
/// appeared in. Only accumulators are stored, never the raw observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsBaseline {
    as_number: Asn,
    snapshots_seen: u64,

    // Pooled over every observed path
    path_lengths: Moments,
    path_length_histogram: BTreeMap<u32, u64>,

    // One sample per snapshot
    snapshot_mean_path: Moments, // fixed point
    prefix_counts: Moments,
    message_counts: Moments,
    times_seen: Moments,
    mid_path_counts: Moments,
    end_path_counts: Moments,
    ipv4_counts: Moments,
    ipv6_counts: Moments,
    neighbor_counts: Moments,

    // Cumulative unions
    neighbors: BTreeSet<Asn>,
    announced_prefixes: BTreeSet<String>,
}

impl AsBaseline {
    pub fn new(as_number: Asn) -> Self {
        Self {
            as_number,
            snapshots_seen: 0,
            path_lengths: Moments::new(),
            path_length_histogram: BTreeMap::new(),
            snapshot_mean_path: Moments::new(),
            prefix_counts: Moments::new(),
            message_counts: Moments::new(),
            times_seen: Moments::new(),
            mid_path_counts: Moments::new(),
            end_path_counts: Moments::new(),
            ipv4_counts: Moments::new(),
            ipv6_counts: Moments::new(),
            neighbor_counts: Moments::new(),
            neighbors: BTreeSet::new(),
            announced_prefixes: BTreeSet::new(),
        }
    }

    pub fn from_profile(profile: &AsProfile) -> Self {
        let mut baseline = Self::new(profile.as_number());
        baseline.fold(profile);
        baseline
    }

    /// Fold one snapshot's profile of this AS
    pub fn fold(&mut self, profile: &AsProfile) {
        debug_assert_eq!(profile.as_number(), self.as_number);

        self.snapshots_seen += 1;

        for (&len, &times) in profile.path_lengths() {
            self.path_lengths.push_n(len as u128, times);
            *self.path_length_histogram.entry(len).or_insert(0) += times;
        }

        if let Some(mean) = profile.mean_path_length_fixed() {
            self.snapshot_mean_path.push(mean);
        }
        self.prefix_counts.push(profile.prefix_count() as u128);
        self.message_counts.push(profile.message_count() as u128);
        self.times_seen.push(profile.times_seen() as u128);
        self.mid_path_counts.push(profile.mid_path_count() as u128);
        self.end_path_counts.push(profile.end_path_count() as u128);
        self.ipv4_counts.push(profile.ipv4_count() as u128);
        self.ipv6_counts.push(profile.ipv6_count() as u128);
        self.neighbor_counts.push(profile.neighbors().len() as u128);

        self.neighbors.extend(profile.neighbors().iter().copied());
        self.announced_prefixes
            .extend(profile.announced_prefixes().iter().cloned());
    }

    /// Combine with a baseline of the same AS learned elsewhere
    pub fn merge(&mut self, other: &AsBaseline) {
        debug_assert_eq!(other.as_number, self.as_number);

        self.snapshots_seen += other.snapshots_seen;
        self.path_lengths.merge(&other.path_lengths);
        for (&len, &times) in &other.path_length_histogram {
            *self.path_length_histogram.entry(len).or_insert(0) += times;
        }
        self.snapshot_mean_path.merge(&other.snapshot_mean_path);
        self.prefix_counts.merge(&other.prefix_counts);
        self.message_counts.merge(&other.message_counts);
        self.times_seen.merge(&other.times_seen);
        self.mid_path_counts.merge(&other.mid_path_counts);
        self.end_path_counts.merge(&other.end_path_counts);
        self.ipv4_counts.merge(&other.ipv4_counts);
        self.ipv6_counts.merge(&other.ipv6_counts);
        self.neighbor_counts.merge(&other.neighbor_counts);
        self.neighbors.extend(other.neighbors.iter().copied());
        self.announced_prefixes
            .extend(other.announced_prefixes.iter().cloned());
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn as_number(&self) -> Asn {
        self.as_number
    }

    pub fn snapshots_seen(&self) -> u64 {
        self.snapshots_seen
    }

    pub fn neighbors(&self) -> &BTreeSet<Asn> {
        &self.neighbors
    }

    pub fn knows_neighbor(&self, neighbor: Asn) -> bool {
        self.neighbors.contains(&neighbor)
    }

    pub fn path_lengths(&self) -> &Moments {
        &self.path_lengths
    }

    pub fn path_length_histogram(&self) -> &BTreeMap<u32, u64> {
        &self.path_length_histogram
    }

    /// Distribution of per-snapshot mean path lengths, fixed point
    pub fn snapshot_mean_path(&self) -> &Moments {
        &self.snapshot_mean_path
    }

    pub fn prefix_counts(&self) -> &Moments {
        &self.prefix_counts
    }

    pub fn message_counts(&self) -> &Moments {
        &self.message_counts
    }

    pub fn times_seen(&self) -> &Moments {
        &self.times_seen
    }

    pub fn mid_path_counts(&self) -> &Moments {
        &self.mid_path_counts
    }

    pub fn end_path_counts(&self) -> &Moments {
        &self.end_path_counts
    }

    pub fn ipv4_counts(&self) -> &Moments {
        &self.ipv4_counts
    }

    pub fn ipv6_counts(&self) -> &Moments {
        &self.ipv6_counts
    }

    /// Per-snapshot neighbour set size
    pub fn neighbor_counts(&self) -> &Moments {
        &self.neighbor_counts
    }

    /// Every prefix this AS originated in any training snapshot
    pub fn announced_prefixes(&self) -> &BTreeSet<String> {
        &self.announced_prefixes
    }

    /// Total mid-path appearances over all snapshots
    pub fn mid_path_count(&self) -> u64 {
        self.mid_path_counts.sum() as u64
    }

    pub fn end_path_count(&self) -> u64 {
        self.end_path_counts.sum() as u64
    }

    /// Mean over all pooled path observations
    pub fn mean_path_length(&self) -> Option<f64> {
        self.path_lengths.mean()
    }

    pub fn path_length_std_dev(&self) -> Option<f64> {
        self.path_lengths.std_dev()
    }

    /// Mean of the per-snapshot mean path length, in hops
    pub fn learned_mean_path(&self) -> Option<f64> {
        self.snapshot_mean_path.mean().map(from_fixed_point)
    }

    pub fn learned_mean_path_std_dev(&self) -> Option<f64> {
        self.snapshot_mean_path.std_dev().map(from_fixed_point)
    }

    pub fn mean_prefix_count(&self) -> Option<f64> {
        self.prefix_counts.mean()
    }

    pub fn prefix_count_std_dev(&self) -> Option<f64> {
        self.prefix_counts.std_dev()
    }
}

// ============================================================================
// EXPORT SUMMARY
// ============================================================================

/// Flat, human-readable view of one `AsBaseline`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsSummary {
    pub as_number: Asn,
    pub snapshots_seen: u64,
    pub path_observations: u64,
    pub mean_path_length: Option<f64>,
    pub path_length_std_dev: Option<f64>,
    pub learned_mean_path: Option<f64>,
    pub learned_mean_path_std_dev: Option<f64>,
    pub mean_prefix_count: Option<f64>,
    pub prefix_count_std_dev: Option<f64>,
    pub mean_message_count: Option<f64>,
    pub mean_times_seen: Option<f64>,
    pub mean_mid_path_count: Option<f64>,
    pub mean_end_path_count: Option<f64>,
    pub mean_ipv4_count: Option<f64>,
    pub mean_ipv6_count: Option<f64>,
    pub mean_neighbor_count: Option<f64>,
    pub neighbor_count_std_dev: Option<f64>,
    pub neighbor_count: usize,
    pub neighbors: Vec<Asn>,
    pub announced_prefixes: Vec<String>,
}

impl From<&AsBaseline> for AsSummary {
    fn from(b: &AsBaseline) -> Self {
        Self {
            as_number: b.as_number,
            snapshots_seen: b.snapshots_seen,
            path_observations: b.path_lengths.count(),
            mean_path_length: b.mean_path_length(),
            path_length_std_dev: b.path_length_std_dev(),
            learned_mean_path: b.learned_mean_path(),
            learned_mean_path_std_dev: b.learned_mean_path_std_dev(),
            mean_prefix_count: b.mean_prefix_count(),
            prefix_count_std_dev: b.prefix_count_std_dev(),
            mean_message_count: b.message_counts.mean(),
            mean_times_seen: b.times_seen.mean(),
            mean_mid_path_count: b.mid_path_counts.mean(),
            mean_end_path_count: b.end_path_counts.mean(),
            mean_ipv4_count: b.ipv4_counts.mean(),
            mean_ipv6_count: b.ipv6_counts.mean(),
            mean_neighbor_count: b.neighbor_counts.mean(),
            neighbor_count_std_dev: b.neighbor_counts.std_dev(),
            neighbor_count: b.neighbors.len(),
            neighbors: b.neighbors.iter().copied().collect(),
            announced_prefixes: b.announced_prefixes.iter().cloned().collect(),
        }
    }
}
