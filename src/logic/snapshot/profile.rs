//! Per-AS observed statistics for one snapshot

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::logic::record::{is_ipv4_prefix, Asn};
use crate::logic::stats::fixed_point_mean;

/// What one AS looked like inside one snapshot.
/// Built by the snapshot builder, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsProfile {
    as_number: Asn,
    neighbors: BTreeSet<Asn>,
    /// Multiset of path lengths: length -> occurrences
    path_lengths: BTreeMap<u32, u64>,
    prefix_count: u64,
    message_count: u64,
    #[serde(default)]
    announced_prefixes: BTreeSet<String>,
    #[serde(default)]
    mid_path_count: u64,
    #[serde(default)]
    end_path_count: u64,
}

impl AsProfile {
    pub(super) fn new(as_number: Asn) -> Self {
        Self {
            as_number,
            neighbors: BTreeSet::new(),
            path_lengths: BTreeMap::new(),
            prefix_count: 0,
            message_count: 0,
            announced_prefixes: BTreeSet::new(),
            mid_path_count: 0,
            end_path_count: 0,
        }
    }

    /// Assemble a profile from already aggregated observations
    pub fn from_parts(
        as_number: Asn,
        neighbors: impl IntoIterator<Item = Asn>,
        path_lengths: &[u32],
        prefix_count: u64,
    ) -> Self {
        let mut profile = Self::new(as_number);
        profile.neighbors = neighbors.into_iter().filter(|&n| n != as_number).collect();
        for &len in path_lengths {
            *profile.path_lengths.entry(len).or_insert(0) += 1;
        }
        profile.message_count = path_lengths.len() as u64;
        profile.prefix_count = prefix_count;
        profile
    }

    // ------------------------------------------------------------------------
    // Builder-side mutation
    // ------------------------------------------------------------------------

    pub(super) fn record_message(&mut self, path_len: u32, at_path_end: bool) {
        self.message_count += 1;
        *self.path_lengths.entry(path_len).or_insert(0) += 1;
        if at_path_end {
            self.end_path_count += 1;
        } else {
            self.mid_path_count += 1;
        }
    }

    pub(super) fn add_neighbor(&mut self, neighbor: Asn) {
        if neighbor != self.as_number {
            self.neighbors.insert(neighbor);
        }
    }

    pub(super) fn record_announcement(&mut self, prefix: &str) {
        self.prefix_count += 1;
        if !self.announced_prefixes.contains(prefix) {
            self.announced_prefixes.insert(prefix.to_string());
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn as_number(&self) -> Asn {
        self.as_number
    }

    pub fn neighbors(&self) -> &BTreeSet<Asn> {
        &self.neighbors
    }

    pub fn path_lengths(&self) -> &BTreeMap<u32, u64> {
        &self.path_lengths
    }

    /// Announcements originated by this AS
    pub fn prefix_count(&self) -> u64 {
        self.prefix_count
    }

    /// Records whose path contained this AS
    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    pub fn announced_prefixes(&self) -> &BTreeSet<String> {
        &self.announced_prefixes
    }

    pub fn mid_path_count(&self) -> u64 {
        self.mid_path_count
    }

    pub fn end_path_count(&self) -> u64 {
        self.end_path_count
    }

    pub fn times_seen(&self) -> u64 {
        self.mid_path_count + self.end_path_count
    }

    pub fn ipv4_count(&self) -> usize {
        self.announced_prefixes.iter().filter(|p| is_ipv4_prefix(p)).count()
    }

    pub fn ipv6_count(&self) -> usize {
        self.announced_prefixes.len() - self.ipv4_count()
    }

    pub fn path_length_samples(&self) -> u64 {
        self.path_lengths.values().sum()
    }

    pub fn path_length_sum(&self) -> u128 {
        self.path_lengths
            .iter()
            .map(|(&len, &n)| len as u128 * n as u128)
            .sum()
    }

    /// Mean path length in fixed point (see `stats::FIXED_POINT_SCALE`)
    pub fn mean_path_length_fixed(&self) -> Option<u128> {
        fixed_point_mean(self.path_length_sum(), self.path_length_samples())
    }

    pub fn mean_path_length(&self) -> Option<f64> {
        let samples = self.path_length_samples();
        if samples == 0 {
            return None;
        }
        Some(self.path_length_sum() as f64 / samples as f64)
    }
}

impl std::fmt::Display for AsProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AS{}: mean path {:.1}, {} prefixes, {} neighbours",
            self.as_number,
            self.mean_path_length().unwrap_or(0.0),
            self.prefix_count,
            self.neighbors.len()
        )
    }
}
