//! Relative size between dominions.

use crate::dominion::Dominion;
use crate::math::fraction;

/// Answers how large one dominion is relative to another.
pub trait RangeProvider {
    /// Target land as a percentage of the attacker's land.
    fn relative_size(&self, attacker: &Dominion, target: &Dominion) -> f64;

    /// Whether `attacker` may act against `target`.
    fn in_range(&self, attacker: &Dominion, target: &Dominion) -> bool;
}

/// Range based on total land only.
///
/// A target is in range when it is at least `min_range` percent of the
/// attacker's size. Larger targets are always in range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandRange {
    /// Smallest relative size in percent.
    pub min_range: f64,
}

impl LandRange {
    /// Create a range provider with the given lower bound.
    #[must_use]
    pub const fn new(min_range: f64) -> Self {
        Self { min_range }
    }
}

impl Default for LandRange {
    fn default() -> Self {
        Self::new(40.0)
    }
}

impl RangeProvider for LandRange {
    fn relative_size(&self, attacker: &Dominion, target: &Dominion) -> f64 {
        fraction(target.total_land(), attacker.total_land()) * 100.0
    }

    fn in_range(&self, attacker: &Dominion, target: &Dominion) -> bool {
        if target.total_land() >= attacker.total_land() {
            return true;
        }
        self.relative_size(attacker, target) >= self.min_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dominion::{DominionId, RealmId, RoundId};
    use crate::land::Terrain;

    fn with_land(id: u64, acres: u64) -> Dominion {
        let mut d = Dominion::new(DominionId(id), "D", "human", RealmId(1), RoundId(1));
        d.territory.land.insert(Terrain::Plain, acres);
        d
    }

    #[test]
    fn test_relative_size() {
        let range = LandRange::default();
        let a = with_land(1, 1000);
        let b = with_land(2, 750);
        assert!((range.relative_size(&a, &b) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_in_range_bounds() {
        let range = LandRange::default();
        let a = with_land(1, 1000);
        assert!(range.in_range(&a, &with_land(2, 400)));
        assert!(!range.in_range(&a, &with_land(3, 399)));
        assert!(range.in_range(&a, &with_land(4, 5000)));
    }

    #[test]
    fn test_landless_attacker() {
        let range = LandRange::default();
        let a = with_land(1, 0);
        let b = with_land(2, 100);
        assert_eq!(range.relative_size(&a, &b), 0.0);
        assert!(range.in_range(&a, &b));
    }
}
