//! Tunable game constants.
//!
//! Every number the combat formulas use lives in [`GameConfig`]. The
//! defaults are the live balance values; a RON file can override any of
//! them.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::economy::{Improvement, ImprovementCurve};
use crate::effects::EffectDefinition;
use crate::error::ConfigError;

/// Round-level state shared by every dominion in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInfo {
    /// Round identifier.
    pub id: crate::dominion::RoundId,
    /// Whether the round has started.
    pub started: bool,
    /// Whether offensive actions are switched off world-wide.
    #[serde(default)]
    pub offense_disabled: bool,
    /// Tick the round started at.
    pub start_tick: u64,
    /// Current tick. One tick is one hour.
    pub current_tick: u64,
}

impl RoundInfo {
    /// Hours elapsed since the round started.
    #[must_use]
    pub const fn elapsed_hours(&self) -> u64 {
        self.current_tick.saturating_sub(self.start_tick)
    }
}

/// Tunable game constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // Morale
    /// Morale multiplier intercept: `base + morale / divisor`.
    pub morale_multiplier_base: f64,
    /// Morale multiplier divisor.
    pub morale_multiplier_divisor: f64,
    /// Minimum morale needed to invade.
    pub min_morale_to_invade: u32,

    // Power
    /// Defensive power per draftee.
    pub draftee_defense: f64,
    /// Defensive power per housed peasant in forest havens.
    pub forest_haven_defense_per_peasant: f64,
    /// Peasants each forest haven can arm.
    pub forest_haven_peasants_per_building: u64,
    /// Minimum home defense per acre.
    pub min_defense_per_acre: f64,
    /// Offense gained per 1% of land in gryphon nests.
    pub gryphon_nest_ratio: f64,
    /// Cap on gryphon nest offense.
    pub gryphon_nest_max: f64,
    /// Defense gained per 1% of land in guard towers.
    pub guard_tower_ratio: f64,
    /// Cap on guard tower defense.
    pub guard_tower_max: f64,
    /// Target defense modifier reduction per 1% of attacker land in temples.
    pub temple_ratio: f64,
    /// Cap on temple reduction.
    pub temple_max: f64,
    /// Raw defense reduction per 1% of target land in forest while ambushing.
    pub ambush_ratio: f64,
    /// Cap on ambush reduction.
    pub ambush_max: f64,
    /// Prestige per 1% offensive power.
    pub prestige_power_divisor: f64,
    /// Improvement bonus multiplier per 1% of land in masonries.
    pub masonry_improvement_ratio: f64,
    /// Improvement curves.
    pub improvements: BTreeMap<Improvement, ImprovementCurve>,

    // Invasion rules
    /// Units one boat carries.
    pub units_per_boat: u64,
    /// Boats each dock protects from sinking.
    pub boats_protected_per_dock: f64,
    /// Share of total defense that must stay home.
    pub min_home_defense_share: f64,
    /// Max offense sent relative to remaining home defense.
    pub max_offense_to_home_defense: f64,

    // Outcome
    /// Minimum shortfall (1 - OP/DP) for an overwhelmed failure.
    pub overwhelmed_threshold: f64,

    // Casualties
    /// Base offensive casualties.
    pub offensive_casualties_base: f64,
    /// Base defensive casualties.
    pub defensive_casualties_base: f64,
    /// Cap on defensive casualties.
    pub defensive_casualties_max: f64,
    /// Lowest casualty multiplier for an ordinary slot.
    pub casualty_multiplier_floor: f64,
    /// Offensive casualty reduction per 1% of land in shrines.
    pub shrine_offense_ratio: f64,
    /// Cap on offensive shrine reduction.
    pub shrine_offense_max: f64,
    /// Defensive casualty reduction per 1% of land in shrines.
    pub shrine_defense_ratio: f64,
    /// Cap on defensive shrine reduction.
    pub shrine_defense_max: f64,
    /// Casualty and prestige multiplier by number of recent hits (last entry repeats).
    pub recency_multipliers: Vec<f64>,
    /// Hours a hit counts as recent.
    pub recent_hit_window: u64,
    /// Starvation deaths per point of food deficit.
    pub starvation_deficit_multiplier: f64,
    /// Cap on starvation deaths as a share of population.
    pub starvation_population_max: f64,

    // Land
    /// Land-loss multiplier applied after the range formula.
    pub land_loss_multiplier: f64,
    /// Minimum acres lost on a successful invasion.
    pub min_acres_lost: u64,
    /// Generated land per conquered acre before bonuses.
    pub generated_land_ratio: f64,
    /// Cap on generated land per conquered acre.
    pub generated_land_max: f64,
    /// Hours during which repeat hits on a target generate no land.
    pub generated_land_cooldown: u64,
    /// Minimum relative size for discounted land, prestige and victories.
    pub prestige_range: f64,

    // Prestige
    /// Flat prestige gain on a qualifying hit.
    pub prestige_base_gain: f64,
    /// Share of prestige lost.
    pub prestige_loss_share: f64,
    /// Failed hits below this relative size cost the attacker prestige.
    pub prestige_penalty_range: f64,

    // Morale changes
    /// Attacker morale change by relative size band: `(minimum range, change)`.
    pub morale_success_bands: Vec<(f64, i64)>,
    /// Attacker morale change on an overwhelmed failure.
    pub morale_overwhelmed: i64,
    /// Attacker morale change on an ordinary failure.
    pub morale_failed: i64,
    /// Defender morale change after repelling an ordinary failure.
    pub morale_repelled: i64,

    // Returning forces
    /// Ticks for units to return home.
    pub return_ticks: u32,
    /// Share of converting units sent that become conversions.
    pub conversion_rate: f64,
    /// Cap on conversions relative to defensive casualties.
    pub conversion_casualty_max: f64,

    // Spoils
    /// Research points per acre conquered.
    pub research_points_per_acre: f64,
    /// Improvement damage reduction per 1% of land in masonries.
    pub masonry_damage_ratio: f64,
    /// Cap on improvement damage reduction.
    pub masonry_damage_max: f64,

    // Range
    /// Smallest relative size (percent) a dominion can invade.
    pub min_range: f64,

    /// Active effect catalog.
    pub effects: Vec<EffectDefinition>,
}

impl Default for GameConfig {
    fn default() -> Self {
        let improvements = BTreeMap::from([
            (
                Improvement::Science,
                ImprovementCurve {
                    max: 0.2,
                    coefficient: 4000.0,
                },
            ),
            (
                Improvement::Keep,
                ImprovementCurve {
                    max: 0.3,
                    coefficient: 4000.0,
                },
            ),
            (
                Improvement::Towers,
                ImprovementCurve {
                    max: 0.6,
                    coefficient: 5000.0,
                },
            ),
            (
                Improvement::Forges,
                ImprovementCurve {
                    max: 0.3,
                    coefficient: 7500.0,
                },
            ),
            (
                Improvement::Walls,
                ImprovementCurve {
                    max: 0.3,
                    coefficient: 7500.0,
                },
            ),
            (
                Improvement::Harbor,
                ImprovementCurve {
                    max: 0.6,
                    coefficient: 5000.0,
                },
            ),
            (
                Improvement::Infirmary,
                ImprovementCurve {
                    max: 0.2,
                    coefficient: 7500.0,
                },
            ),
        ]);

        Self {
            morale_multiplier_base: 0.90,
            morale_multiplier_divisor: 1000.0,
            min_morale_to_invade: 50,

            draftee_defense: 1.0,
            forest_haven_defense_per_peasant: 0.75,
            forest_haven_peasants_per_building: 20,
            min_defense_per_acre: 1.5,
            gryphon_nest_ratio: 1.6,
            gryphon_nest_max: 0.32,
            guard_tower_ratio: 1.6,
            guard_tower_max: 0.32,
            temple_ratio: 1.8,
            temple_max: 0.36,
            ambush_ratio: 0.2,
            ambush_max: 0.10,
            prestige_power_divisor: 10_000.0,
            masonry_improvement_ratio: 2.75,
            improvements,

            units_per_boat: 30,
            boats_protected_per_dock: 2.5,
            min_home_defense_share: 1.0 / 3.0,
            max_offense_to_home_defense: 4.0 / 3.0,

            overwhelmed_threshold: 0.15,

            offensive_casualties_base: 0.085,
            defensive_casualties_base: 0.038_25,
            defensive_casualties_max: 0.06,
            casualty_multiplier_floor: 0.10,
            shrine_offense_ratio: 5.0,
            shrine_offense_max: 0.75,
            shrine_defense_ratio: 1.0,
            shrine_defense_max: 0.15,
            recency_multipliers: vec![1.0, 0.8, 0.6, 0.5, 0.33, 0.25],
            recent_hit_window: 6,
            starvation_deficit_multiplier: 2.0,
            starvation_population_max: 0.02,

            land_loss_multiplier: 0.75,
            min_acres_lost: 10,
            generated_land_ratio: 0.75,
            generated_land_max: 1.0,
            generated_land_cooldown: 6,
            prestige_range: 75.0,

            prestige_base_gain: 20.0,
            prestige_loss_share: 0.05,
            prestige_penalty_range: 50.0,

            morale_success_bands: vec![
                (0.0, -15),
                (60.0, 0),
                (75.0, 15),
                (85.0, 20),
                (100.0, 25),
            ],
            morale_overwhelmed: -20,
            morale_failed: -10,
            morale_repelled: 10,

            return_ticks: 12,
            conversion_rate: 0.06,
            conversion_casualty_max: 1.75,

            research_points_per_acre: 40.0,
            masonry_damage_ratio: 2.0,
            masonry_damage_max: 0.5,

            min_range: 40.0,

            effects: Vec::new(),
        }
    }
}

impl GameConfig {
    /// Load a config from a RON file. Missing fields keep their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        ron::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Morale multiplier for a morale value. No upper cap.
    #[must_use]
    pub fn morale_multiplier(&self, morale: u32) -> f64 {
        self.morale_multiplier_base + f64::from(morale) / self.morale_multiplier_divisor
    }

    /// Multiplier for `recent_hits` hits inside the recency window.
    #[must_use]
    pub fn recency_multiplier(&self, recent_hits: usize) -> f64 {
        match self.recency_multipliers.last() {
            None => 1.0,
            Some(&last) => self
                .recency_multipliers
                .get(recent_hits)
                .copied()
                .unwrap_or(last),
        }
    }

    /// Attacker morale change for a successful hit at `range` percent.
    #[must_use]
    pub fn morale_for_success(&self, range: f64) -> i64 {
        self.morale_success_bands
            .iter()
            .filter(|(minimum, _)| range >= *minimum)
            .last()
            .map_or(0, |&(_, change)| change)
    }

    /// Curve for an improvement, if configured.
    #[must_use]
    pub fn improvement_curve(&self, improvement: Improvement) -> Option<ImprovementCurve> {
        self.improvements.get(&improvement).copied()
    }

    /// Effect definition by key.
    #[must_use]
    pub fn effect(&self, key: &str) -> Option<&EffectDefinition> {
        self.effects.iter().find(|e| e.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_morale_multiplier() {
        let config = GameConfig::default();
        assert!((config.morale_multiplier(100) - 1.0).abs() < 1e-9);
        assert!((config.morale_multiplier(0) - 0.9).abs() < 1e-9);
        assert!((config.morale_multiplier(150) - 1.05).abs() < 1e-9);
    }

    #[test]
    fn test_recency_steps() {
        let config = GameConfig::default();
        assert_eq!(config.recency_multiplier(0), 1.0);
        assert_eq!(config.recency_multiplier(1), 0.8);
        assert_eq!(config.recency_multiplier(3), 0.5);
        assert_eq!(config.recency_multiplier(5), 0.25);
        assert_eq!(config.recency_multiplier(40), 0.25);
    }

    #[test]
    fn test_morale_bands() {
        let config = GameConfig::default();
        assert_eq!(config.morale_for_success(50.0), -15);
        assert_eq!(config.morale_for_success(60.0), 0);
        assert_eq!(config.morale_for_success(74.9), 0);
        assert_eq!(config.morale_for_success(80.0), 15);
        assert_eq!(config.morale_for_success(90.0), 20);
        assert_eq!(config.morale_for_success(120.0), 25);
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config: GameConfig = ron::from_str("(min_morale_to_invade: 60)").unwrap();
        assert_eq!(config.min_morale_to_invade, 60);
        assert_eq!(config.units_per_boat, 30);
    }
}
