//! Statistics Layout - Persisted model schema
//!
//! **This list controls the persisted model format.**
//!
//! ## Rules:
//! 1. Add a statistic → increment MODEL_FORMAT_VERSION
//! 2. Rename or remove a statistic → increment MODEL_FORMAT_VERSION
//!
//! A model file written under another layout is rejected on load.

use crc32fast::Hasher;

// ============================================================================
// FORMAT VERSION
// ============================================================================

/// Current persisted model version
pub const MODEL_FORMAT_VERSION: u8 = 2;

// ============================================================================
// STATISTICS LAYOUT
// ============================================================================

/// Per-AS statistics kept by the baseline, in declaration order
pub const STAT_LAYOUT: &[&str] = &[
    "snapshots_seen",         // snapshots that contained the AS
    "path_lengths",           // pooled path-length moments
    "path_length_histogram",  // pooled path-length distribution
    "snapshot_mean_path",     // per-snapshot mean path length (fixed point)
    "prefix_counts",          // per-snapshot announced prefix count
    "message_counts",         // per-snapshot message count
    "times_seen",             // per-snapshot mid + end appearances
    "mid_path_counts",
    "end_path_counts",
    "ipv4_counts",            // per-snapshot distinct IPv4 prefixes
    "ipv6_counts",
    "neighbor_counts",        // per-snapshot neighbour set size
    "neighbors",              // cumulative neighbour set
    "announced_prefixes",     // cumulative originated prefixes
];

pub const STAT_COUNT: usize = 14;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 over version and statistic names
pub fn layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[MODEL_FORMAT_VERSION]);

    for name in STAT_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutMismatch {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

/// Check a persisted model header against the current layout
pub fn validate_layout(version: u8, hash: u32) -> Result<(), LayoutMismatch> {
    let current_hash = layout_hash();

    if version != MODEL_FORMAT_VERSION || hash != current_hash {
        return Err(LayoutMismatch {
            expected_version: MODEL_FORMAT_VERSION,
            expected_hash: current_hash,
            actual_version: version,
            actual_hash: hash,
        });
    }

    Ok(())
}
