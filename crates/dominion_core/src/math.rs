//! Small numeric helpers shared by the power, casualty and land formulas.
//!
//! Game formulas mix integer counts (units, acres) with fractional ratios.
//! Everything fractional is `f64`; conversions back to counts go through
//! [`ceil_count`] / [`floor_count`] so negative or non-finite values can
//! never leak into a counter.

use serde::{Deserialize, Serialize};

use crate::error::InvariantViolation;

/// A `(ratio, cap)` pair bounding a ratio-based contribution.
///
/// The contribution is `measure / ratio`, limited by `max`. A negative `max`
/// turns the contribution into a penalty that grows down to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioCap {
    /// Amount of the measure needed for one point of contribution.
    pub ratio: f64,
    /// Maximum contribution (minimum when negative).
    pub max: f64,
}

impl RatioCap {
    /// Create a new ratio/cap pair.
    #[must_use]
    pub const fn new(ratio: f64, max: f64) -> Self {
        Self { ratio, max }
    }

    /// Apply the pair to a measure.
    #[must_use]
    pub fn apply(self, measure: f64) -> f64 {
        let magnitude = safe_div(measure, self.ratio.abs());
        clamp_to_cap(magnitude, self.max)
    }

    /// Apply the pair to a measure that scales up instead of dividing.
    #[must_use]
    pub fn apply_scaled(self, measure: f64) -> f64 {
        clamp_to_cap(measure * self.ratio.abs(), self.max)
    }
}

/// Clamp a non-negative magnitude against a cap whose sign sets direction.
#[must_use]
pub fn clamp_to_cap(magnitude: f64, max: f64) -> f64 {
    if max >= 0.0 {
        magnitude.min(max)
    } else {
        (-magnitude).max(max)
    }
}

/// Divide, returning zero when the denominator is zero.
#[must_use]
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Ratio of two counts, zero when the denominator is zero.
#[must_use]
pub fn fraction(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Round up to a count, treating negatives as zero.
#[must_use]
pub fn ceil_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.ceil() as u64
    } else {
        0
    }
}

/// Round down to a count, treating negatives as zero.
#[must_use]
pub fn floor_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.floor() as u64
    } else {
        0
    }
}

/// Round to the nearest count, treating negatives as zero.
#[must_use]
pub fn round_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

/// Fail when a computed value is NaN or infinite.
pub fn ensure_finite(value: f64, what: &'static str) -> Result<f64, InvariantViolation> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InvariantViolation::NonFinite(what))
    }
}

/// Split `total` across `weights` proportionally, summing exactly to `total`.
///
/// Uses the largest-remainder method. Each share is also capped at its
/// weight, so the result never takes more from a bucket than it holds when
/// `total <= sum(weights)`. Ties go to the earlier bucket.
#[must_use]
pub fn apportion(total: u64, weights: &[u64]) -> Vec<u64> {
    let sum: u64 = weights.iter().sum();
    if sum == 0 || total == 0 {
        return vec![0; weights.len()];
    }
    let total = total.min(sum);

    let mut shares = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    let mut assigned = 0u64;
    for (index, &weight) in weights.iter().enumerate() {
        let exact = u128::from(total) * u128::from(weight);
        let share = (exact / u128::from(sum)) as u64;
        let remainder = exact % u128::from(sum);
        shares.push(share);
        remainders.push((remainder, index));
        assigned += share;
    }

    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    let mut left = total - assigned;
    for (_, index) in remainders {
        if left == 0 {
            break;
        }
        if shares[index] < weights[index] {
            shares[index] += 1;
            left -= 1;
        }
    }

    shares
}
