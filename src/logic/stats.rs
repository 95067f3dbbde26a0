//! Exact Streaming Moments
//!
//! Every statistic learned by the baseline is integer-valued (hop counts,
//! prefix counts, fixed-point means), so count / sum / sum of squares can be
//! kept exactly. Mean and sample variance are derived on demand.
//!
//! Integer addition is commutative and associative: folding observations in
//! any order, or merging partial accumulators built on other threads, yields
//! bit-identical results. No raw samples are retained.

use serde::{Deserialize, Serialize};

/// Resolution of fixed-point means (1e-6)
pub const FIXED_POINT_SCALE: u128 = 1_000_000;

// ============================================================================
// MOMENTS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moments {
    count: u64,
    #[serde(with = "u128_string")]
    sum: u128,
    #[serde(with = "u128_string")]
    sum_sq: u128,
}

impl Moments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation
    pub fn push(&mut self, value: u128) {
        self.push_n(value, 1);
    }

    /// Fold the same observation `times` times
    pub fn push_n(&mut self, value: u128, times: u64) {
        if times == 0 {
            return;
        }
        let weight = times as u128;
        self.count += times;
        self.sum += value * weight;
        self.sum_sq += value * value * weight;
    }

    /// Fold another accumulator into this one
    pub fn merge(&mut self, other: &Moments) {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> u128 {
        self.sum
    }

    pub fn sum_sq(&self) -> u128 {
        self.sum_sq
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum as f64 / self.count as f64)
    }

    /// Sample variance. `None` with fewer than two observations, or when
    /// the accumulators could not have come from real samples.
    pub fn variance(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        let n = self.count as u128;
        // n * Σx² >= (Σx)² for any real samples
        let numerator = n
            .checked_mul(self.sum_sq)?
            .checked_sub(self.sum.checked_mul(self.sum)?)?;
        Some(numerator as f64 / (n * (n - 1)) as f64)
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}

// ============================================================================
// FIXED POINT
// ============================================================================

/// Rounded `sum / count` in units of 1 / FIXED_POINT_SCALE
pub fn fixed_point_mean(sum: u128, count: u64) -> Option<u128> {
    if count == 0 {
        return None;
    }
    let count = count as u128;
    Some((2 * sum * FIXED_POINT_SCALE + count) / (2 * count))
}

pub fn from_fixed_point(value: f64) -> f64 {
    value / FIXED_POINT_SCALE as f64
}

// JSON numbers cannot carry the full u128 range
mod u128_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        let mut m = Moments::new();
        for v in [3, 4, 3] {
            m.push(v);
        }
        assert_eq!(m.count(), 3);
        assert!((m.mean().unwrap() - 10.0 / 3.0).abs() < 1e-12);
        // sample variance of [3, 4, 3] = 1/3
        assert!((m.variance().unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_variance_needs_two_samples() {
        let mut m = Moments::new();
        assert!(m.mean().is_none());
        assert!(m.variance().is_none());

        m.push(7);
        assert_eq!(m.mean(), Some(7.0));
        assert!(m.variance().is_none());
        assert!(m.std_dev().is_none());
    }

    #[test]
    fn test_inconsistent_accumulators_have_no_variance() {
        // (Σx)² > n·Σx² cannot come from real samples
        let m: Moments = serde_json::from_str(r#"{"count":3,"sum":"100","sum_sq":"1"}"#).unwrap();
        assert_eq!(m.mean(), Some(100.0 / 3.0));
        assert!(m.variance().is_none());
        assert!(m.std_dev().is_none());

        let m: Moments = serde_json::from_str(&format!(
            r#"{{"count":2,"sum":"{}","sum_sq":"1"}}"#,
            u128::MAX
        ))
        .unwrap();
        assert!(m.variance().is_none());
    }

    #[test]
    fn test_merge_is_order_independent() {
        let mut a = Moments::new();
        a.push_n(5, 3);
        let mut b = Moments::new();
        b.push(9);
        b.push(2);

        let mut ab = a;
        ab.merge(&b);
        let mut ba = b;
        ba.merge(&a);

        assert_eq!(ab, ba);
        assert_eq!(ab.variance().unwrap().to_bits(), ba.variance().unwrap().to_bits());
    }

    #[test]
    fn test_fixed_point_mean_rounds() {
        assert_eq!(fixed_point_mean(10, 3), Some(3_333_333));
        assert_eq!(fixed_point_mean(20, 3), Some(6_666_667));
        assert_eq!(fixed_point_mean(1, 0), None);
        assert_eq!(from_fixed_point(3_500_000.0), 3.5);
    }

    #[test]
    fn test_large_sums_survive_json() {
        let mut m = Moments::new();
        m.push(1 << 40);
        m.push(1 << 40);
        assert!(m.sum_sq() > u64::MAX as u128);

        let json = serde_json::to_string(&m).unwrap();
        let back: Moments = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
