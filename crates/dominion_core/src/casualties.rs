//! Casualty multipliers and starvation losses.
//!
//! The multiplier for a unit slot is decided in this order:
//!
//! 1. A fixed casualty perk returns its flat share and nothing else applies.
//! 2. An opponent race that does not kill means no losses.
//! 3. Immortality. True immortals survive anything; the other kinds only
//!    when the battle was not an overwhelmed failure.
//! 4. Units that only die to strong opponents start from the share of
//!    opposing raw power coming from such opponents.
//! 5. Reductions (shrines, land perks, effects, research, infirmary, unit
//!    perks, combat-loss reducers) are summed and removed, keeping at least
//!    the configured floor.

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::dominion::Dominion;
use crate::economy::Improvement;
use crate::effects::{active_definitions, ActiveEffectProvider};
use crate::error::Result;
use crate::land::BuildingKind;
use crate::math::{apportion, ceil_count, RatioCap};
use crate::perks::{Side, UnitPerk};
use crate::power::improvement_bonus;
use crate::races::{Race, RaceRegistry};
use crate::units::{Slot, SlotCounts, SLOT_COUNT};

/// How a slot loses units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CasualtyRate {
    /// Loses this share of units, ignoring the base rate.
    Fixed(f64),
    /// Loses the base rate times this multiplier.
    Scaled(f64),
}

impl CasualtyRate {
    /// Share of units lost for a base casualty rate.
    #[must_use]
    pub fn share(self, base_rate: f64) -> f64 {
        match self {
            CasualtyRate::Fixed(share) => share,
            CasualtyRate::Scaled(multiplier) => base_rate * multiplier,
        }
    }

    /// The multiplier, or `None` for fixed rates.
    #[must_use]
    pub const fn multiplier(self) -> Option<f64> {
        match self {
            CasualtyRate::Fixed(_) => None,
            CasualtyRate::Scaled(multiplier) => Some(multiplier),
        }
    }
}

/// The force a slot fights against, by raw per-unit power.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpposingForce {
    /// Raw power per unit of each opposing slot.
    pub per_unit: [f64; SLOT_COUNT],
    /// Opposing units per slot.
    pub units: SlotCounts,
    /// Raw power from non-unit sources (draftees, housed peasants).
    pub other_raw: f64,
}

impl OpposingForce {
    /// Total raw power.
    #[must_use]
    pub fn raw_total(&self) -> f64 {
        self.units
            .iter()
            .map(|(slot, count)| self.per_unit[slot.index()] * count as f64)
            .sum::<f64>()
            + self.other_raw
    }

    /// Share of raw power coming from units at or above `threshold` each.
    #[must_use]
    pub fn share_at_or_above(&self, threshold: f64) -> f64 {
        let total = self.raw_total();
        if total <= 0.0 {
            return 0.0;
        }
        let strong: f64 = self
            .units
            .iter()
            .filter(|(slot, _)| self.per_unit[slot.index()] >= threshold)
            .map(|(slot, count)| self.per_unit[slot.index()] * count as f64)
            .sum();
        strong / total
    }
}

/// One side of a battle, as seen by the casualty engine.
#[derive(Debug, Clone, Copy)]
pub struct CasualtyContext<'a> {
    /// Dominion losing units.
    pub own: &'a Dominion,
    /// Dominion inflicting losses.
    pub opponent: &'a Dominion,
    /// Own units in the battle.
    pub committed: &'a SlotCounts,
    /// Relative size in percent.
    pub range: f64,
    /// Whether the invasion was an overwhelmed failure.
    pub overwhelmed: bool,
    /// The opposing force.
    pub opposing: &'a OpposingForce,
}

/// Losses from a food deficit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StarvationLosses {
    /// Peasants lost.
    pub peasants: u64,
    /// Draftees lost.
    pub draftees: u64,
    /// Units lost per slot.
    pub units: SlotCounts,
    /// Spies lost.
    pub spies: u64,
    /// Wizards lost.
    pub wizards: u64,
    /// Archmages lost.
    pub archmages: u64,
}

impl StarvationLosses {
    /// Total deaths.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.peasants + self.military()
    }

    /// Military deaths.
    #[must_use]
    pub fn military(&self) -> u64 {
        self.draftees + self.units.total() + self.spies + self.wizards + self.archmages
    }
}

/// Computes casualty multipliers.
pub struct CasualtyEngine<'a> {
    config: &'a GameConfig,
    races: &'a RaceRegistry,
    effects: &'a dyn ActiveEffectProvider,
}

impl<'a> CasualtyEngine<'a> {
    /// Create an engine over shared read-only state.
    #[must_use]
    pub fn new(
        config: &'a GameConfig,
        races: &'a RaceRegistry,
        effects: &'a dyn ActiveEffectProvider,
    ) -> Self {
        Self {
            config,
            races,
            effects,
        }
    }

    /// Casualty rate for one slot of `ctx.own`, fighting on `side`.
    pub fn rate(&self, ctx: &CasualtyContext<'_>, side: Side, slot: Slot) -> Result<CasualtyRate> {
        let race = self.races.get(&ctx.own.race)?;
        let opponent_race = self.races.get(&ctx.opponent.race)?;
        let unit = race.unit(slot);

        if let Some(percent) = unit.fixed_casualties(side) {
            return Ok(CasualtyRate::Fixed(percent / 100.0));
        }

        if !opponent_race.kills() {
            return Ok(CasualtyRate::Scaled(0.0));
        }

        if is_immortal(unit.perks.as_slice(), ctx) {
            return Ok(CasualtyRate::Scaled(0.0));
        }

        let base = unit
            .find_perk(|perk| match perk {
                UnitPerk::OnlyDiesVersusRawPower { threshold } => Some(*threshold),
                _ => None,
            })
            .map_or(1.0, |threshold| ctx.opposing.share_at_or_above(threshold));
        if base <= 0.0 {
            return Ok(CasualtyRate::Scaled(0.0));
        }

        let reduction = self.reduction(ctx, race, side, slot);
        let multiplier = base * (1.0 - reduction).max(self.config.casualty_multiplier_floor);

        tracing::trace!(
            dominion = ctx.own.id.0,
            %slot,
            ?side,
            base,
            reduction,
            multiplier,
            "Casualty multiplier"
        );

        Ok(CasualtyRate::Scaled(multiplier))
    }

    /// Casualty rates for every slot.
    pub fn rates(&self, ctx: &CasualtyContext<'_>, side: Side) -> Result<[CasualtyRate; SLOT_COUNT]> {
        let mut rates = [CasualtyRate::Scaled(1.0); SLOT_COUNT];
        for slot in Slot::ALL {
            rates[slot.index()] = self.rate(ctx, side, slot)?;
        }
        Ok(rates)
    }

    /// Casualty rate for draftees, which only take force-wide reductions.
    pub fn draftee_rate(&self, ctx: &CasualtyContext<'_>) -> Result<CasualtyRate> {
        let race = self.races.get(&ctx.own.race)?;
        if !self.races.get(&ctx.opponent.race)?.kills() {
            return Ok(CasualtyRate::Scaled(0.0));
        }
        let reduction = self.general_reduction(ctx, race, Side::Defense);
        Ok(CasualtyRate::Scaled(
            (1.0 - reduction).max(self.config.casualty_multiplier_floor),
        ))
    }

    /// Summed reductions for a slot, as a fraction. Negative means more losses.
    #[must_use]
    pub fn reduction(&self, ctx: &CasualtyContext<'_>, race: &Race, side: Side, slot: Slot) -> f64 {
        let own = ctx.own;
        let unit_reduction: f64 = race
            .unit(slot)
            .perks
            .iter()
            .map(|perk| match perk {
                UnitPerk::FewerCasualtiesFromLand {
                    side: s,
                    terrain,
                    cap,
                } if *s == side => cap.apply(own.territory.land_fraction(*terrain) * 100.0) / 100.0,
                UnitPerk::FewerCasualtiesVersusLand {
                    side: s,
                    terrain,
                    cap,
                } if *s == side => {
                    cap.apply(ctx.opponent.territory.land_fraction(*terrain) * 100.0) / 100.0
                }
                UnitPerk::FewerCasualties { side: s, percent } if *s == side => percent / 100.0,
                _ => 0.0,
            })
            .sum();

        self.general_reduction(ctx, race, side) + unit_reduction
    }

    /// Reductions shared by the whole force.
    fn general_reduction(&self, ctx: &CasualtyContext<'_>, race: &Race, side: Side) -> f64 {
        let own = ctx.own;

        let shrines = match side {
            Side::Offense => RatioCap::new(
                self.config.shrine_offense_ratio,
                self.config.shrine_offense_max,
            ),
            Side::Defense => RatioCap::new(
                self.config.shrine_defense_ratio,
                self.config.shrine_defense_max,
            ),
        }
        .apply_scaled(own.territory.building_fraction(BuildingKind::Shrine));

        let effects = active_definitions(&self.config.effects, self.effects, own.id)
            .map(|effect| effect.casualties(side))
            .sum::<f64>()
            / 100.0;

        let research = match side {
            Side::Offense => own.tech.fewer_casualties_offense,
            Side::Defense => own.tech.fewer_casualties_defense,
        } / 100.0;

        shrines - effects
            + research
            + improvement_bonus(self.config, own, Improvement::Infirmary)
            + combat_loss_reduction(race, ctx.committed)
    }

    /// Deaths caused by a food deficit.
    ///
    /// At most `min(2 × deficit, 2% of population)`. Peasants die first, up
    /// to all of them; the rest is spread over military pools by headcount,
    /// rounding up per pool until nothing is left to assign.
    #[must_use]
    pub fn starvation(&self, dominion: &Dominion, food_deficit: u64) -> StarvationLosses {
        let by_deficit = (food_deficit as f64 * self.config.starvation_deficit_multiplier).floor();
        let by_population =
            (dominion.population() as f64 * self.config.starvation_population_max).floor();
        let total = ceil_count(by_deficit.min(by_population));
        if total == 0 {
            return StarvationLosses::default();
        }

        let peasants = total.min(dominion.peasants);
        let remainder = total - peasants;

        let military = &dominion.military;
        let mut pools = [
            military.draftees,
            military.home.0[0],
            military.home.0[1],
            military.home.0[2],
            military.home.0[3],
            military.spies,
            military.wizards,
            military.archmages,
        ];
        let headcount: u64 = pools.iter().sum();

        let mut left = remainder.min(headcount);
        let spread = left;
        for pool in &mut pools {
            let share = if headcount == 0 {
                0
            } else {
                ceil_count(spread as f64 * (*pool as f64 / headcount as f64))
            };
            *pool = share.min(*pool).min(left);
            left -= *pool;
        }

        StarvationLosses {
            peasants,
            draftees: pools[0],
            units: SlotCounts::new([pools[1], pools[2], pools[3], pools[4]]),
            spies: pools[5],
            wizards: pools[6],
            archmages: pools[7],
        }
    }
}

fn is_immortal(perks: &[UnitPerk], ctx: &CasualtyContext<'_>) -> bool {
    perks.iter().any(|perk| match perk {
        UnitPerk::TrueImmortal => true,
        UnitPerk::Immortal => !ctx.overwhelmed,
        UnitPerk::ImmortalVersusLandRange { range } => !ctx.overwhelmed && ctx.range >= *range,
        UnitPerk::ImmortalExceptVersus { races } => {
            !ctx.overwhelmed && !races.iter().any(|race| *race == ctx.opponent.race)
        }
        _ => false,
    })
}

/// Half the committed share of units that reduce combat losses.
fn combat_loss_reduction(race: &Race, committed: &SlotCounts) -> f64 {
    let total = committed.total();
    if total == 0 {
        return 0.0;
    }
    let reducers: u64 = race
        .units()
        .filter(|unit| unit.has_perk(|p| matches!(p, UnitPerk::ReduceCombatLosses)))
        .map(|unit| committed[unit.slot])
        .sum();
    reducers as f64 / total as f64 / 2.0
}

/// Split `total` casualties across slots pro-rata by `weights`, exactly.
#[must_use]
pub fn distribute(total: u64, weights: &SlotCounts) -> SlotCounts {
    let shares = apportion(total, &weights.0);
    let mut out = SlotCounts::ZERO;
    for (slot, share) in Slot::ALL.into_iter().zip(shares) {
        out[slot] = share;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RaceData;
    use crate::dominion::{DominionId, RealmId, RoundId};
    use crate::effects::{ActiveEffects, EffectDefinition, NoEffects};
    use crate::land::Terrain;
    use crate::perks::RacePerk;
    use crate::units::UnitType;

    fn race(key: &str, perks: [Vec<UnitPerk>; 4], race_perks: Vec<RacePerk>) -> RaceData {
        let units = Slot::ALL
            .into_iter()
            .zip(perks)
            .map(|(slot, perks)| UnitType {
                slot,
                name: format!("{key}{slot}"),
                offense: 5.0,
                defense: 3.0,
                need_boat: false,
                perks,
            })
            .collect();
        RaceData {
            key: key.to_string(),
            name: key.to_string(),
            home_terrain: Terrain::Plain,
            uses_research: true,
            units,
            perks: race_perks,
        }
    }

    fn registry() -> RaceRegistry {
        let mut registry = RaceRegistry::new();
        registry
            .insert(race(
                "spirit",
                [
                    vec![UnitPerk::FixedCasualties {
                        side: Side::Offense,
                        percent: 9.0,
                    }],
                    vec![UnitPerk::Immortal],
                    vec![UnitPerk::TrueImmortal],
                    vec![UnitPerk::OnlyDiesVersusRawPower { threshold: 6.0 }],
                ],
                vec![],
            ))
            .unwrap();
        registry
            .insert(race(
                "human",
                [
                    vec![],
                    vec![UnitPerk::FewerCasualties {
                        side: Side::Offense,
                        percent: 50.0,
                    }],
                    vec![UnitPerk::ReduceCombatLosses],
                    vec![UnitPerk::ImmortalVersusLandRange { range: 75.0 }],
                ],
                vec![],
            ))
            .unwrap();
        registry
            .insert(race("pacifist", [vec![], vec![], vec![], vec![]], vec![RacePerk::DoesNotKill]))
            .unwrap();
        registry
    }

    fn dominion(id: u64, race: &str) -> Dominion {
        let mut d = Dominion::new(DominionId(id), race, race, RealmId(1), RoundId(1));
        d.territory.land.insert(Terrain::Plain, 1000);
        d
    }

    fn opposing() -> OpposingForce {
        OpposingForce {
            per_unit: [3.0, 3.0, 8.0, 0.0],
            units: SlotCounts::new([100, 0, 50, 0]),
            other_raw: 300.0,
        }
    }

    fn ctx<'a>(
        own: &'a Dominion,
        opponent: &'a Dominion,
        committed: &'a SlotCounts,
        force: &'a OpposingForce,
        overwhelmed: bool,
    ) -> CasualtyContext<'a> {
        CasualtyContext {
            own,
            opponent,
            committed,
            range: 80.0,
            overwhelmed,
            opposing: force,
        }
    }

    #[test]
    fn test_fixed_casualties_short_circuit() {
        let races = registry();
        let config = GameConfig::default();
        let engine = CasualtyEngine::new(&config, &races, &NoEffects);
        let (own, opp) = (dominion(1, "spirit"), dominion(2, "human"));
        let committed = SlotCounts::new([10, 10, 10, 10]);
        let force = opposing();
        let rate = engine
            .rate(&ctx(&own, &opp, &committed, &force, false), Side::Offense, Slot::ALL[0])
            .unwrap();
        assert_eq!(rate, CasualtyRate::Fixed(0.09));
        assert!((rate.share(0.085) - 0.09).abs() < 1e-12);
    }

    #[test]
    fn test_immortality_and_overwhelm() {
        let races = registry();
        let config = GameConfig::default();
        let engine = CasualtyEngine::new(&config, &races, &NoEffects);
        let (own, opp) = (dominion(1, "spirit"), dominion(2, "human"));
        let committed = SlotCounts::new([10, 10, 10, 10]);
        let force = opposing();

        let calm = ctx(&own, &opp, &committed, &force, false);
        let crushed = ctx(&own, &opp, &committed, &force, true);

        assert_eq!(engine.rate(&calm, Side::Offense, Slot::ALL[1]).unwrap(), CasualtyRate::Scaled(0.0));
        assert_eq!(engine.rate(&crushed, Side::Offense, Slot::ALL[1]).unwrap(), CasualtyRate::Scaled(1.0));
        assert_eq!(engine.rate(&crushed, Side::Offense, Slot::ALL[2]).unwrap(), CasualtyRate::Scaled(0.0));
    }

    #[test]
    fn test_land_range_immortality() {
        let races = registry();
        let config = GameConfig::default();
        let engine = CasualtyEngine::new(&config, &races, &NoEffects);
        let (own, opp) = (dominion(1, "human"), dominion(2, "spirit"));
        let committed = SlotCounts::new([10, 0, 0, 10]);
        let force = opposing();
        let mut context = ctx(&own, &opp, &committed, &force, false);

        assert_eq!(engine.rate(&context, Side::Offense, Slot::ALL[3]).unwrap(), CasualtyRate::Scaled(0.0));
        context.range = 60.0;
        assert!(engine.rate(&context, Side::Offense, Slot::ALL[3]).unwrap().multiplier().unwrap() > 0.0);
    }

    #[test]
    fn test_does_not_kill() {
        let races = registry();
        let config = GameConfig::default();
        let engine = CasualtyEngine::new(&config, &races, &NoEffects);
        let (own, opp) = (dominion(1, "human"), dominion(2, "pacifist"));
        let committed = SlotCounts::new([10, 0, 0, 0]);
        let force = opposing();
        let rate = engine
            .rate(&ctx(&own, &opp, &committed, &force, false), Side::Defense, Slot::ALL[0])
            .unwrap();
        assert_eq!(rate, CasualtyRate::Scaled(0.0));
    }

    #[test]
    fn test_only_dies_versus_raw_power() {
        let races = registry();
        let config = GameConfig::default();
        let engine = CasualtyEngine::new(&config, &races, &NoEffects);
        let (own, opp) = (dominion(1, "spirit"), dominion(2, "human"));
        let committed = SlotCounts::new([0, 0, 0, 10]);
        let force = opposing();
        // 400 of 1000 raw power from units at 8 each
        let rate = engine
            .rate(&ctx(&own, &opp, &committed, &force, false), Side::Offense, Slot::ALL[3])
            .unwrap();
        assert!((rate.multiplier().unwrap() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_reductions_stack_and_floor() {
        let races = registry();
        let config = GameConfig::default();
        let engine = CasualtyEngine::new(&config, &races, &NoEffects);
        let mut own = dominion(1, "human");
        own.territory.land.insert(Terrain::Hill, 1000);
        own.territory.buildings.insert(BuildingKind::Shrine, 100);
        let opp = dominion(2, "spirit");
        let committed = SlotCounts::new([50, 50, 0, 0]);
        let force = opposing();
        let context = ctx(&own, &opp, &committed, &force, false);

        // shrines 5% of land * 5 = 25%
        let plain = engine.rate(&context, Side::Offense, Slot::ALL[0]).unwrap();
        assert!((plain.multiplier().unwrap() - 0.75).abs() < 1e-9);

        // plus 50% fewer casualties
        let fewer = engine.rate(&context, Side::Offense, Slot::ALL[1]).unwrap();
        assert!((fewer.multiplier().unwrap() - 0.25).abs() < 1e-9);

        own.territory.buildings.insert(BuildingKind::Shrine, 400);
        let context = ctx(&own, &opp, &committed, &force, false);
        let floored = engine.rate(&context, Side::Offense, Slot::ALL[1]).unwrap();
        assert!((floored.multiplier().unwrap() - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_reduce_combat_losses_uses_committed_share() {
        let races = registry();
        let config = GameConfig::default();
        let engine = CasualtyEngine::new(&config, &races, &NoEffects);
        let (own, opp) = (dominion(1, "human"), dominion(2, "spirit"));
        let committed = SlotCounts::new([60, 0, 40, 0]);
        let force = opposing();
        let rate = engine
            .rate(&ctx(&own, &opp, &committed, &force, false), Side::Defense, Slot::ALL[0])
            .unwrap();
        assert!((rate.multiplier().unwrap() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_effect_increases_casualties() {
        let races = registry();
        let mut config = GameConfig::default();
        let mut plague = EffectDefinition::new("plague");
        plague.offensive_casualties = 25.0;
        config.effects.push(plague);

        let own = dominion(1, "human");
        let opp = dominion(2, "spirit");
        let mut effects = ActiveEffects::new();
        effects.activate(own.id, "plague", opp.id);
        let engine = CasualtyEngine::new(&config, &races, &effects);

        let committed = SlotCounts::new([10, 0, 0, 0]);
        let force = opposing();
        let rate = engine
            .rate(&ctx(&own, &opp, &committed, &force, false), Side::Offense, Slot::ALL[0])
            .unwrap();
        assert!((rate.multiplier().unwrap() - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_starvation_peasants_first() {
        let races = registry();
        let config = GameConfig::default();
        let engine = CasualtyEngine::new(&config, &races, &NoEffects);
        let mut d = dominion(1, "human");
        d.peasants = 10_000;
        d.military.home = SlotCounts::new([1000, 0, 0, 0]);

        let losses = engine.starvation(&d, 50);
        assert_eq!(losses.peasants, 100);
        assert_eq!(losses.military(), 0);

        // capped at 2% of 11_000
        let losses = engine.starvation(&d, 100_000);
        assert_eq!(losses.total(), 220);
    }

    #[test]
    fn test_starvation_spills_into_military() {
        let races = registry();
        let config = GameConfig::default();
        let engine = CasualtyEngine::new(&config, &races, &NoEffects);
        let mut d = dominion(1, "human");
        d.peasants = 10;
        d.military.draftees = 1000;
        d.military.home = SlotCounts::new([3000, 1000, 0, 0]);
        d.military.wizards = 1000;

        // 2% of 6010 is 120: every peasant, then 110 over 6000 soldiers
        let losses = engine.starvation(&d, 1_000_000);
        assert_eq!(losses.peasants, 10);
        assert_eq!(losses.draftees, 19);
        assert_eq!(losses.units, SlotCounts::new([55, 19, 0, 0]));
        assert_eq!(losses.wizards, 17);
        assert_eq!(losses.total(), 120);
    }

    #[test]
    fn test_starvation_without_military() {
        let races = registry();
        let config = GameConfig::default();
        let engine = CasualtyEngine::new(&config, &races, &NoEffects);
        let mut d = dominion(1, "human");
        d.peasants = 5_000;

        let losses = engine.starvation(&d, 1_000_000);
        assert_eq!(losses.peasants, 100);
        assert_eq!(losses.military(), 0);
    }

    #[test]
    fn test_distribute_exact() {
        let weights = SlotCounts::new([300, 100, 0, 100]);
        let out = distribute(50, &weights);
        assert_eq!(out.total(), 50);
        assert_eq!(out[Slot::ALL[0]], 30);
        assert_eq!(out[Slot::ALL[2]], 0);
    }
}
