//! Offensive and defensive power.
//!
//! Power is computed in a fixed order:
//!
//! 1. Per unit: base stat, then every power perk folded in definition order
//!    (see [`contributions`]).
//! 2. Per unit power × quantity, summed across slots. Defense adds draftees
//!    and forest haven peasants when at home, and loses any ambush share.
//! 3. × `1 + Σ` named multiplier sources (see [`multipliers`]).
//! 4. × morale multiplier.
//! 5. Home defense only: raised to the minimum defense per acre.
//!
//! Every step is recorded in a [`PowerBreakdown`].

pub mod contributions;
pub mod multipliers;

use serde::Serialize;

use crate::config::{GameConfig, RoundInfo};
use crate::dominion::Dominion;
use crate::economy::Improvement;
use crate::effects::{active_definitions, ActiveEffectProvider};
use crate::error::Result;
use crate::land::BuildingKind;
use crate::math::ensure_finite;
use crate::perks::{RacePerk, Side};
use crate::races::{Race, RaceRegistry};
use crate::units::{Slot, SlotCounts, SLOT_COUNT};

pub use contributions::{contribution, OpponentView, PerkContext, PowerOverrides};
pub use multipliers::{
    ambush_reduction, improvement_bonus, masonry_multiplier, multiplier_sources, temple_reduction,
    MultiplierSource,
};

/// Who a force is matched against.
#[derive(Debug, Clone, Default)]
pub struct Matchup<'a> {
    /// Live opponent, if any.
    pub opponent: Option<&'a Dominion>,
    /// Relative size in percent (target land / attacker land).
    pub range: Option<f64>,
    /// Units committed. `None` means every unit at home.
    pub units: Option<&'a SlotCounts>,
    /// Units the opponent commits against this force.
    pub opponent_units: Option<&'a SlotCounts>,
    /// Preview values replacing live opponent data.
    pub overrides: PowerOverrides,
}

impl<'a> Matchup<'a> {
    /// No opponent: only own-state perks apply.
    #[must_use]
    pub fn alone() -> Self {
        Self::default()
    }

    /// Against a live opponent at a relative size.
    #[must_use]
    pub fn against(opponent: &'a Dominion, range: f64) -> Self {
        Self {
            opponent: Some(opponent),
            range: Some(range),
            ..Self::default()
        }
    }

    /// Use these committed units instead of everything at home.
    #[must_use]
    pub fn with_units(mut self, units: &'a SlotCounts) -> Self {
        self.units = Some(units);
        self
    }

    /// Units the opponent commits.
    #[must_use]
    pub fn with_opponent_units(mut self, units: &'a SlotCounts) -> Self {
        self.opponent_units = Some(units);
        self
    }

    /// Preview overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: PowerOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    fn committed(&self, dominion: &Dominion) -> SlotCounts {
        self.units.copied().unwrap_or(dominion.military.home)
    }
}

/// Adjustments for a defensive power calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefenseOptions {
    /// Removed from the multiplier sum (temples), floored at zero.
    pub multiplier_reduction: f64,
    /// Share of raw defense removed (ambush).
    pub ambush_reduction: f64,
    /// Whether the force defends the homeland (draftees, havens and floor apply).
    pub at_home: bool,
    /// Leave draftees out.
    pub ignore_draftees: bool,
    /// Skip the minimum defense per acre.
    pub ignore_minimum: bool,
}

impl Default for DefenseOptions {
    fn default() -> Self {
        Self {
            multiplier_reduction: 0.0,
            ambush_reduction: 0.0,
            at_home: true,
            ignore_draftees: false,
            ignore_minimum: false,
        }
    }
}

impl DefenseOptions {
    /// A force away from home: units only, no floor.
    #[must_use]
    pub fn away() -> Self {
        Self {
            at_home: false,
            ignore_draftees: true,
            ignore_minimum: true,
            ..Self::default()
        }
    }
}

/// Power of one unit type within a force.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitPower {
    /// Slot.
    pub slot: Slot,
    /// Units counted.
    pub quantity: u64,
    /// Base stat.
    pub base: f64,
    /// Perk contributions per unit, in evaluation order.
    pub contributions: Vec<(&'static str, f64)>,
    /// Base plus contributions.
    pub per_unit: f64,
}

impl UnitPower {
    /// Power of every unit of this type together.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.per_unit * self.quantity as f64
    }
}

/// Step-by-step record of a power calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerBreakdown {
    /// Side computed.
    pub side: Side,
    /// Unit types present, in slot order.
    pub units: Vec<UnitPower>,
    /// Draftee defense.
    pub draftees: f64,
    /// Forest haven defense.
    pub housing: f64,
    /// Raw power after ambush, before multipliers.
    pub raw: f64,
    /// Share of raw defense removed by ambush.
    pub ambush_reduction: f64,
    /// Named multiplier sources.
    pub multipliers: Vec<(MultiplierSource, f64)>,
    /// `1 + Σ` sources, floored at 1.
    pub multiplier: f64,
    /// Morale multiplier.
    pub morale_multiplier: f64,
    /// Minimum defense floor, zero when it does not apply.
    pub minimum: f64,
    /// Final power.
    pub total: f64,
}

/// Computes offensive and defensive power.
///
/// Pure: reads dominions, races, config and active effects; writes nothing.
pub struct PowerEngine<'a> {
    config: &'a GameConfig,
    races: &'a RaceRegistry,
    effects: &'a dyn ActiveEffectProvider,
    round: &'a RoundInfo,
}

impl<'a> PowerEngine<'a> {
    /// Create an engine over shared read-only state.
    #[must_use]
    pub fn new(
        config: &'a GameConfig,
        races: &'a RaceRegistry,
        effects: &'a dyn ActiveEffectProvider,
        round: &'a RoundInfo,
    ) -> Self {
        Self {
            config,
            races,
            effects,
            round,
        }
    }

    /// Game config in use.
    #[must_use]
    pub const fn config(&self) -> &'a GameConfig {
        self.config
    }

    /// Active effects in use.
    #[must_use]
    pub fn effects(&self) -> &'a dyn ActiveEffectProvider {
        self.effects
    }

    /// Race registry in use.
    #[must_use]
    pub const fn races(&self) -> &'a RaceRegistry {
        self.races
    }

    /// Offensive power of a force.
    pub fn offense(&self, dominion: &Dominion, matchup: &Matchup<'_>) -> Result<PowerBreakdown> {
        let race = self.races.get(&dominion.race)?;
        let committed = matchup.committed(dominion);
        let units = self.unit_powers(dominion, race, Side::Offense, matchup, &committed);
        let raw: f64 = units.iter().map(UnitPower::total).sum();

        let multipliers =
            multiplier_sources(self.config, race, self.effects, dominion, Side::Offense);
        let multiplier = 1.0 + multipliers.iter().map(|(_, v)| v).sum::<f64>().max(0.0);
        let morale_multiplier = self.config.morale_multiplier(dominion.morale);
        let total = ensure_finite(raw * multiplier * morale_multiplier, "offensive power")?;

        tracing::debug!(
            dominion = dominion.id.0,
            raw,
            multiplier,
            morale_multiplier,
            total,
            "Computed offensive power"
        );

        Ok(PowerBreakdown {
            side: Side::Offense,
            units,
            draftees: 0.0,
            housing: 0.0,
            raw,
            ambush_reduction: 0.0,
            multipliers,
            multiplier,
            morale_multiplier,
            minimum: 0.0,
            total,
        })
    }

    /// Defensive power of a force.
    pub fn defense(
        &self,
        dominion: &Dominion,
        matchup: &Matchup<'_>,
        options: &DefenseOptions,
    ) -> Result<PowerBreakdown> {
        let race = self.races.get(&dominion.race)?;
        let committed = matchup.committed(dominion);
        let units = self.unit_powers(dominion, race, Side::Defense, matchup, &committed);

        let draftees = if options.at_home && !options.ignore_draftees {
            dominion.military.draftees as f64 * self.draftee_defense(dominion, race)
        } else {
            0.0
        };
        let housing = if options.at_home {
            self.forest_haven_defense(dominion)
        } else {
            0.0
        };

        let unit_total: f64 = units.iter().map(UnitPower::total).sum();
        let ambush = options.ambush_reduction.clamp(0.0, 1.0);
        let raw = (unit_total + draftees + housing) * (1.0 - ambush);

        let mut multipliers =
            multiplier_sources(self.config, race, self.effects, dominion, Side::Defense);
        if options.multiplier_reduction > 0.0 {
            multipliers.push((MultiplierSource::Temples, -options.multiplier_reduction));
        }
        let multiplier = 1.0 + multipliers.iter().map(|(_, v)| v).sum::<f64>().max(0.0);
        let morale_multiplier = self.config.morale_multiplier(dominion.morale);

        let minimum = if options.at_home && !options.ignore_minimum {
            dominion.total_land() as f64 * self.config.min_defense_per_acre
        } else {
            0.0
        };
        let total = ensure_finite(
            (raw * multiplier * morale_multiplier).max(minimum),
            "defensive power",
        )?;

        tracing::debug!(
            dominion = dominion.id.0,
            raw,
            multiplier,
            morale_multiplier,
            minimum,
            total,
            "Computed defensive power"
        );

        Ok(PowerBreakdown {
            side: Side::Defense,
            units,
            draftees,
            housing,
            raw,
            ambush_reduction: ambush,
            multipliers,
            multiplier,
            morale_multiplier,
            minimum,
            total,
        })
    }

    /// Offensive power total.
    pub fn offensive_power(&self, dominion: &Dominion, matchup: &Matchup<'_>) -> Result<f64> {
        Ok(self.offense(dominion, matchup)?.total)
    }

    /// Defensive power total.
    pub fn defensive_power(
        &self,
        dominion: &Dominion,
        matchup: &Matchup<'_>,
        options: &DefenseOptions,
    ) -> Result<f64> {
        Ok(self.defense(dominion, matchup, options)?.total)
    }

    /// Per-unit power of every slot before multipliers.
    pub fn raw_unit_powers(
        &self,
        dominion: &Dominion,
        side: Side,
        matchup: &Matchup<'_>,
    ) -> Result<[f64; SLOT_COUNT]> {
        let race = self.races.get(&dominion.race)?;
        let committed = matchup.committed(dominion);
        let mut powers = [0.0; SLOT_COUNT];
        for slot in Slot::ALL {
            powers[slot.index()] =
                self.unit_power(dominion, race, side, slot, matchup, &committed).per_unit;
        }
        Ok(powers)
    }

    /// Defensive power per draftee.
    ///
    /// An active effect overriding draftee defense wins over the racial
    /// value, which wins over the default.
    #[must_use]
    pub fn draftee_defense(&self, dominion: &Dominion, race: &Race) -> f64 {
        if let Some(value) = active_definitions(&self.config.effects, self.effects, dominion.id)
            .find_map(|effect| effect.draftee_defense)
        {
            return value;
        }
        race.perks()
            .iter()
            .find_map(|perk| match perk {
                RacePerk::DrafteeDefense(value) => Some(*value),
                _ => None,
            })
            .unwrap_or(self.config.draftee_defense)
    }

    /// Defense from peasants housed in forest havens.
    #[must_use]
    pub fn forest_haven_defense(&self, dominion: &Dominion) -> f64 {
        let capacity = dominion
            .territory
            .buildings_of(BuildingKind::ForestHaven)
            .saturating_mul(self.config.forest_haven_peasants_per_building);
        capacity.min(dominion.peasants) as f64 * self.config.forest_haven_defense_per_peasant
    }

    fn unit_powers(
        &self,
        dominion: &Dominion,
        race: &Race,
        side: Side,
        matchup: &Matchup<'_>,
        committed: &SlotCounts,
    ) -> Vec<UnitPower> {
        Slot::ALL
            .into_iter()
            .filter(|&slot| committed[slot] > 0)
            .map(|slot| self.unit_power(dominion, race, side, slot, matchup, committed))
            .collect()
    }

    fn unit_power(
        &self,
        dominion: &Dominion,
        race: &Race,
        side: Side,
        slot: Slot,
        matchup: &Matchup<'_>,
        committed: &SlotCounts,
    ) -> UnitPower {
        let unit = race.unit(slot);
        let ctx = PerkContext {
            dominion,
            round: self.round,
            opponent: OpponentView::new(matchup.opponent, &matchup.overrides, matchup.opponent_units),
            range: matchup.range,
            committed,
            quantity: committed[slot],
            towers_bonus: improvement_bonus(self.config, dominion, Improvement::Towers),
        };

        let base = unit.base_power(side);
        let (per_unit, contributions) = unit.power_perks(side).fold(
            (base, Vec::new()),
            |(acc, mut steps), perk| {
                let value = contribution(perk, &ctx);
                steps.push((perk.name(), value));
                (acc + value, steps)
            },
        );

        UnitPower {
            slot,
            quantity: committed[slot],
            base,
            contributions,
            per_unit: per_unit.max(0.0),
        }
    }
}
