//! Resources, castle improvements and research bonuses.
//!
//! Only the parts the combat pipeline reads or writes live here. Production
//! and construction formulas belong to the tick and are not modelled.

use serde::{Deserialize, Serialize};

/// Stockpiled resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resource {
    /// Currency.
    Platinum,
    /// Feeds the population.
    Food,
    /// Construction material.
    Lumber,
    /// Magic.
    Mana,
    /// Military material.
    Ore,
    /// Improvement investment.
    Gems,
    /// Carry units across water.
    Boats,
    /// Harvested from slain enemies.
    Souls,
    /// Earned from fallen own units.
    Champions,
    /// Spent on research.
    ResearchPoints,
}

impl Resource {
    /// Lowercase display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Resource::Platinum => "platinum",
            Resource::Food => "food",
            Resource::Lumber => "lumber",
            Resource::Mana => "mana",
            Resource::Ore => "ore",
            Resource::Gems => "gems",
            Resource::Boats => "boats",
            Resource::Souls => "souls",
            Resource::Champions => "champions",
            Resource::ResearchPoints => "research points",
        }
    }
}

/// Castle improvements players invest resources into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Improvement {
    /// Platinum production.
    Science,
    /// Max population.
    Keep,
    /// Wizard strength.
    Towers,
    /// Offensive power.
    Forges,
    /// Defensive power.
    Walls,
    /// Boat protection.
    Harbor,
    /// Fewer casualties.
    Infirmary,
}

impl Improvement {
    /// Every improvement, in canonical order.
    pub const ALL: [Improvement; 7] = [
        Improvement::Science,
        Improvement::Keep,
        Improvement::Towers,
        Improvement::Forges,
        Improvement::Walls,
        Improvement::Harbor,
        Improvement::Infirmary,
    ];
}

/// Tuning for one improvement's diminishing-returns curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImprovementCurve {
    /// Maximum bonus as a fraction (0.2 = 20%).
    pub max: f64,
    /// Land coefficient in the denominator.
    pub coefficient: f64,
}

impl ImprovementCurve {
    /// Flat term added to the curve denominator.
    pub const BASE_POINTS: f64 = 15_000.0;

    /// Bonus fraction for `points` invested on `total_land` acres.
    ///
    /// `max × (1 − e^(−points / (coefficient × land + 15000)))`, then boosted by
    /// the masonry multiplier.
    #[must_use]
    pub fn bonus(self, points: u64, total_land: u64, masonry_multiplier: f64) -> f64 {
        let denominator = self.coefficient * total_land as f64 + Self::BASE_POINTS;
        let curve = 1.0 - (-(points as f64) / denominator).exp();
        self.max * curve * masonry_multiplier
    }
}

/// Aggregated research bonuses, all in percent.
///
/// Unlocking research is handled elsewhere; the combat pipeline only reads
/// the resulting totals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TechPerks {
    /// Offensive power.
    pub offense: f64,
    /// Defensive power.
    pub defense: f64,
    /// Offensive casualties reduction.
    pub fewer_casualties_offense: f64,
    /// Defensive casualties reduction.
    pub fewer_casualties_defense: f64,
    /// Prestige gain.
    pub prestige_gain: f64,
    /// Conversion rate.
    pub conversions: f64,
    /// Generated land.
    pub generated_land: f64,
    /// Wizard strength, for improved wizard ratio.
    pub wizard_strength: f64,
    /// Spy strength, for improved spy ratio.
    pub spy_strength: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_improvement_curve_diminishes() {
        let curve = ImprovementCurve {
            max: 0.2,
            coefficient: 7500.0,
        };
        let low = curve.bonus(100_000, 1000, 1.0);
        let high = curve.bonus(1_000_000, 1000, 1.0);
        let huge = curve.bonus(1_000_000_000, 1000, 1.0);

        assert!(low > 0.0);
        assert!(high > low);
        assert!(huge <= 0.2 + 1e-9);
        assert!(low / 100_000.0 > high / 1_000_000.0);
    }

    #[test]
    fn test_improvement_curve_zero_points() {
        let curve = ImprovementCurve {
            max: 0.2,
            coefficient: 7500.0,
        };
        assert_eq!(curve.bonus(0, 500, 1.0), 0.0);
    }

    #[test]
    fn test_masonry_boosts_improvements() {
        let curve = ImprovementCurve {
            max: 0.2,
            coefficient: 7500.0,
        };
        let plain = curve.bonus(200_000, 1000, 1.0);
        let boosted = curve.bonus(200_000, 1000, 1.1);
        assert!((boosted / plain - 1.1).abs() < 1e-9);
    }
}
