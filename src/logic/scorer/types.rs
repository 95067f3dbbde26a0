use serde::{Deserialize, Serialize};

use crate::constants::SENTINEL_SCORE;
use crate::logic::record::Asn;

// ============================================================================
// ANOMALY REASONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyReason {
    // New adjacency: route leak or hijack candidate (Severity: High)
    UnseenNeighbor,     // 4.0

    // Statistical drift (Severity: Medium)
    PathLengthOutlier,  // 2.5
    PrefixCountOutlier, // 3.0

    // No learned history at all (Severity: Low-Medium)
    UnseenAs,           // 2.0
}

impl AnomalyReason {
    pub fn severity(&self) -> f64 {
        match self {
            AnomalyReason::UnseenNeighbor => 4.0,
            AnomalyReason::PathLengthOutlier => 2.5,
            AnomalyReason::PrefixCountOutlier => 3.0,
            AnomalyReason::UnseenAs => 2.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyReason::UnseenNeighbor => "unseen_neighbor",
            AnomalyReason::PathLengthOutlier => "path_length_outlier",
            AnomalyReason::PrefixCountOutlier => "prefix_count_outlier",
            AnomalyReason::UnseenAs => "unseen_as",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AnomalyReason::UnseenNeighbor => "Adjacency never observed during training",
            AnomalyReason::PathLengthOutlier => "Mean AS path length outside learned range",
            AnomalyReason::PrefixCountOutlier => "Originated prefix count outside learned range",
            AnomalyReason::UnseenAs => "AS absent from every training snapshot",
        }
    }
}

impl std::fmt::Display for AnomalyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// VERDICT
// ============================================================================

/// One scored observation. Produced by a prediction call, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyVerdict {
    pub as_number: Asn,
    pub reason: AnomalyReason,
    /// `None` when history is insufficient or the learned variance is zero
    pub deviation_score: Option<f64>,
    pub flagged: bool,
    /// Set for `UnseenNeighbor`: the new adjacent AS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbor: Option<Asn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<f64>,
}

impl AnomalyVerdict {
    pub fn unseen_as(as_number: Asn) -> Self {
        Self {
            as_number,
            reason: AnomalyReason::UnseenAs,
            deviation_score: Some(SENTINEL_SCORE),
            flagged: true,
            neighbor: None,
            observed: None,
            expected: None,
        }
    }

    pub fn unseen_neighbor(as_number: Asn, neighbor: Asn) -> Self {
        Self {
            as_number,
            reason: AnomalyReason::UnseenNeighbor,
            deviation_score: Some(SENTINEL_SCORE),
            flagged: true,
            neighbor: Some(neighbor),
            observed: None,
            expected: None,
        }
    }

    /// Statistical verdict, flagged or not
    pub fn outlier(
        as_number: Asn,
        reason: AnomalyReason,
        deviation_score: Option<f64>,
        flagged: bool,
        observed: Option<f64>,
        expected: Option<f64>,
    ) -> Self {
        Self {
            as_number,
            reason,
            deviation_score,
            flagged,
            neighbor: None,
            observed,
            expected,
        }
    }

    /// Severity weight, zero when not flagged
    pub fn severity(&self) -> f64 {
        if self.flagged {
            self.reason.severity()
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for AnomalyVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = if self.flagged { "FLAG" } else { "ok" };
        write!(f, "[{}] AS{} {}", mark, self.as_number, self.reason)?;
        if let Some(n) = self.neighbor {
            write!(f, " (neighbor AS{})", n)?;
        }
        match self.deviation_score {
            Some(s) if s == SENTINEL_SCORE => Ok(()),
            Some(s) => write!(f, " z={:.3}", s),
            None => write!(f, " (insufficient history)"),
        }
    }
}

// ============================================================================
// PREDICTION REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub source_id: String,
    pub ases_scored: usize,
    pub verdicts: usize,
    pub flagged: usize,
    pub unseen_as: usize,
    pub unseen_neighbor: usize,
    pub path_length_outliers: usize,
    pub prefix_count_outliers: usize,
    /// Statistical verdicts without a score
    pub unscored: usize,
    /// Flagged AS numbers, ascending, deduplicated
    pub flagged_ases: Vec<Asn>,
}

impl PredictionReport {
    pub fn from_verdicts(source_id: &str, verdicts: &[AnomalyVerdict]) -> Self {
        let mut report = Self {
            source_id: source_id.to_string(),
            verdicts: verdicts.len(),
            ..Default::default()
        };

        let mut last_as = None;
        for v in verdicts {
            if last_as != Some(v.as_number) {
                report.ases_scored += 1;
                last_as = Some(v.as_number);
            }

            if v.deviation_score.is_none() {
                report.unscored += 1;
            }

            if !v.flagged {
                continue;
            }

            report.flagged += 1;
            if report.flagged_ases.last() != Some(&v.as_number) {
                report.flagged_ases.push(v.as_number);
            }
            match v.reason {
                AnomalyReason::UnseenAs => report.unseen_as += 1,
                AnomalyReason::UnseenNeighbor => report.unseen_neighbor += 1,
                AnomalyReason::PathLengthOutlier => report.path_length_outliers += 1,
                AnomalyReason::PrefixCountOutlier => report.prefix_count_outliers += 1,
            }
        }

        report
    }

    pub fn has_anomalies(&self) -> bool {
        self.flagged > 0
    }
}

impl std::fmt::Display for PredictionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} ASes, {} flagged verdicts ({} unseen AS, {} unseen neighbor, {} path length, {} prefix count), {} unscored",
            self.source_id,
            self.ases_scored,
            self.flagged,
            self.unseen_as,
            self.unseen_neighbor,
            self.path_length_outliers,
            self.prefix_count_outliers,
            self.unscored
        )
    }
}
