//! Scorer Module - Snapshot vs baseline comparison
//!
//! Prediction is a pure function of (model, snapshot). Every AS in the
//! snapshot receives at least one verdict, in ascending AS order:
//!
//! - AS unknown to the model → one `unseen_as` verdict (flagged, sentinel score)
//! - otherwise, one `unseen_neighbor` verdict per new adjacency (ascending),
//!   then a `path_length_outlier` and a `prefix_count_outlier` verdict carrying
//!   the deviation score, flagged only above the configured threshold
//!
//! Too little history or a zero learned variance yields a `None` score and
//! no flag for that statistic; it never fails the prediction.

pub mod export;
pub mod threshold;
pub mod types;

use crate::logic::baseline::{AsBaseline, BaselineModel};
use crate::logic::record::Asn;
use crate::logic::snapshot::{AsProfile, Snapshot};
use crate::logic::stats::{from_fixed_point, Moments};

pub use export::ExportFormat;
pub use threshold::ScoringConfig;
pub use types::{AnomalyReason, AnomalyVerdict, PredictionReport};

// ============================================================================
// DEVIATION SCORER
// ============================================================================

/// Measures how far one observation lies from a learned distribution
pub trait DeviationScorer {
    /// `None` when the distribution cannot support a score
    fn deviation(&self, observed: f64, learned: &Moments) -> Option<f64>;
}

/// Standard score: (observed - mean) / sample standard deviation
#[derive(Debug, Clone, Copy, Default)]
pub struct ZScore;

impl DeviationScorer for ZScore {
    fn deviation(&self, observed: f64, learned: &Moments) -> Option<f64> {
        let mean = learned.mean()?;
        let std_dev = learned.std_dev()?;
        if std_dev <= 0.0 || !std_dev.is_finite() {
            return None;
        }
        Some((observed - mean) / std_dev)
    }
}

// ============================================================================
// PREDICTION
// ============================================================================

impl BaselineModel {
    /// Score a snapshot with the default z-score
    pub fn predict(&self, snapshot: &Snapshot) -> Vec<AnomalyVerdict> {
        self.predict_with(snapshot, &ZScore)
    }

    pub fn predict_with(&self, snapshot: &Snapshot, scorer: &dyn DeviationScorer) -> Vec<AnomalyVerdict> {
        let config = self.config();
        let mut verdicts = Vec::with_capacity(snapshot.len() * 2);

        // BTreeMap iteration is ascending by AS number
        for (&asn, profile) in snapshot.profiles() {
            match self.profile(asn) {
                None => verdicts.push(AnomalyVerdict::unseen_as(asn)),
                Some(baseline) => score_known_as(baseline, profile, config, scorer, &mut verdicts),
            }
        }

        let report = PredictionReport::from_verdicts(snapshot.source_id(), &verdicts);
        if report.has_anomalies() {
            log::info!("Prediction {}", report);
        } else {
            log::info!(
                "Prediction {}: {} ASes, no anomalies",
                report.source_id,
                report.ases_scored
            );
        }

        verdicts
    }

    /// Score a snapshot and summarize
    pub fn predict_report(&self, snapshot: &Snapshot) -> (Vec<AnomalyVerdict>, PredictionReport) {
        let verdicts = self.predict(snapshot);
        let report = PredictionReport::from_verdicts(snapshot.source_id(), &verdicts);
        (verdicts, report)
    }
}

fn score_known_as(
    baseline: &AsBaseline,
    profile: &AsProfile,
    config: &ScoringConfig,
    scorer: &dyn DeviationScorer,
    out: &mut Vec<AnomalyVerdict>,
) {
    let asn = baseline.as_number();

    for &neighbor in profile.neighbors() {
        if !baseline.knows_neighbor(neighbor) {
            out.push(AnomalyVerdict::unseen_neighbor(asn, neighbor));
        }
    }

    // Mean path length, compared in fixed point against per-snapshot means
    let observed_path = profile.mean_path_length_fixed().map(|v| v as f64);
    out.push(score_statistic(
        asn,
        AnomalyReason::PathLengthOutlier,
        observed_path,
        baseline.snapshot_mean_path(),
        config,
        scorer,
        from_fixed_point,
    ));

    out.push(score_statistic(
        asn,
        AnomalyReason::PrefixCountOutlier,
        Some(profile.prefix_count() as f64),
        baseline.prefix_counts(),
        config,
        scorer,
        |v| v,
    ));
}

fn score_statistic(
    asn: Asn,
    reason: AnomalyReason,
    observed: Option<f64>,
    learned: &Moments,
    config: &ScoringConfig,
    scorer: &dyn DeviationScorer,
    to_display: impl Fn(f64) -> f64,
) -> AnomalyVerdict {
    let expected = learned.mean();

    let score = match observed {
        Some(value) if config.has_history(learned.count()) => scorer.deviation(value, learned),
        _ => None,
    };

    if score.is_none() {
        log::debug!("AS{} {}: insufficient history, not scored", asn, reason);
    }

    let flagged = score.map_or(false, |z| config.is_outlier(z));

    AnomalyVerdict::outlier(
        asn,
        reason,
        score,
        flagged,
        observed.map(&to_display),
        expected.map(&to_display),
    )
}
