//! Everything an invasion changes besides the units that died.

use std::collections::BTreeMap;

use crate::conquest::{LandEngine, LandTransfer};
use crate::dominion::Dominion;
use crate::economy::{Improvement, Resource};
use crate::error::Result;
use crate::land::BuildingKind;
use crate::math::{apportion, floor_count, round_count, RatioCap};
use crate::perks::{RacePerk, Side, UnitPerk};
use crate::races::Race;
use crate::units::{Slot, SlotCounts};

use super::battle::{Battle, Losses};
use super::preconditions::ValidatedOrder;
use super::InvasionResolver;

/// Side effects of one invasion, before they are turned into deltas.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Spoils {
    /// Land moved. Empty unless the invasion succeeded.
    pub land: LandTransfer,
    /// Both sides share an alliance.
    pub allied: bool,
    /// The attacker already hit this target inside the cooldown.
    pub repeat_invasion: bool,
    /// Attacker prestige change.
    pub attacker_prestige: i64,
    /// Defender prestige change.
    pub defender_prestige: i64,
    /// Attacker morale change.
    pub attacker_morale: i64,
    /// Defender morale change.
    pub defender_morale: i64,
    /// New attacker units per output slot.
    pub conversions: SlotCounts,
    /// Peasants burned.
    pub peasants_burned: u64,
    /// Peasants eaten.
    pub peasants_eaten: u64,
    /// Improvement points destroyed.
    pub improvements_damaged: BTreeMap<Improvement, u64>,
    /// Resources plundered.
    pub plunder: BTreeMap<Resource, u64>,
    /// Research points earned.
    pub research_points: u64,
    /// Souls harvested.
    pub souls: u64,
    /// Champions gained.
    pub champions: u64,
    /// Boats the attacker loses.
    pub attacker_boats_lost: u64,
    /// Boats the defender loses.
    pub defender_boats_lost: u64,
    /// Discounted land credit.
    pub discounted_land: u64,
    /// Counts as a victory.
    pub victory: bool,
}

impl InvasionResolver<'_> {
    /// Compute every side effect of a resolved battle.
    pub fn spoils(
        &self,
        attacker: &Dominion,
        defender: &Dominion,
        order: &ValidatedOrder,
        battle: &Battle,
        losses: &Losses,
    ) -> Result<Spoils> {
        let race = self.races.get(&attacker.race)?;
        let defender_race = self.races.get(&defender.race)?;
        let allied = attacker.is_allied_with(defender);
        let tick = self.round.current_tick;
        let repeat_invasion = self.history.recently_invaded_by(
            attacker.id,
            defender.id,
            tick.saturating_sub(self.config.generated_land_cooldown),
        );

        let mut spoils = Spoils {
            allied,
            repeat_invasion,
            ..Spoils::default()
        };

        let (attacker_prestige, defender_prestige) =
            self.prestige(attacker, defender, race, battle, losses, allied);
        spoils.attacker_prestige = attacker_prestige;
        spoils.defender_prestige = defender_prestige;

        let (attacker_morale, defender_morale) = self.morale(battle);
        spoils.attacker_morale = morale_change(attacker.morale, attacker_morale);
        spoils.defender_morale = morale_change(defender.morale, defender_morale);

        if !battle.overwhelmed {
            self.battle_damage(&mut spoils, race, defender, &order.units);
        }

        if !battle.success {
            return Ok(spoils);
        }

        let land = LandEngine::new(self.config);
        let ratio = if allied || repeat_invasion {
            0.0
        } else {
            let bonus = race.scalar(|p| match p {
                RacePerk::GeneratedLand(v) => Some(*v),
                _ => None,
            }) + attacker.tech.generated_land;
            land.generated_ratio(bonus)
        };
        spoils.land = land.transfer(attacker.total_land(), &defender.territory, battle.range, ratio);

        if battle.range >= self.config.prestige_range {
            spoils.discounted_land = spoils.land.gained();
            spoils.victory = true;
        }

        spoils.conversions = self.conversions(attacker, race, &order.units, battle, losses);
        spoils.plunder = plunder(race, defender, &order.units, losses.units_needed);

        if race.uses_research && !allied {
            let recently_hit = self.history.recently_invaded_by(
                attacker.id,
                defender.id,
                tick.saturating_sub(self.config.recent_hit_window),
            );
            let multiplier = if recently_hit { 1.0 } else { 2.0 };
            spoils.research_points = floor_count(
                self.config.research_points_per_acre * spoils.land.conquered() as f64 * multiplier,
            );
        }

        spoils.souls = floor_count(
            race.scalar(|p| match p {
                RacePerk::SoulHarvest(v) => Some(*v),
                _ => None,
            }) * losses.defender_total() as f64,
        );
        spoils.champions = floor_count(
            race.scalar(|p| match p {
                RacePerk::ChampionAccrual(v) => Some(*v),
                _ => None,
            }) * losses.attacker.total() as f64,
        );

        let boats_plundered = spoils.plunder.get(&Resource::Boats).copied().unwrap_or(0);
        spoils.defender_boats_lost =
            self.boats_sunk(race, &order.units, Side::Offense, defender, boats_plundered);
        spoils.attacker_boats_lost =
            self.boats_sunk(defender_race, &defender.military.home, Side::Defense, attacker, 0);

        Ok(spoils)
    }

    /// Prestige changes for attacker and defender.
    fn prestige(
        &self,
        attacker: &Dominion,
        defender: &Dominion,
        race: &Race,
        battle: &Battle,
        losses: &Losses,
        allied: bool,
    ) -> (i64, i64) {
        if allied {
            return (0, 0);
        }
        let config = self.config;
        let loss = |prestige: u64| -(round_count(prestige as f64 * config.prestige_loss_share) as i64);

        if battle.success && battle.range >= config.prestige_range {
            let bonus = race.scalar(|p| match p {
                RacePerk::PrestigeGain(v) => Some(*v),
                _ => None,
            }) + attacker.tech.prestige_gain;
            let gain = (config.prestige_base_gain + defender.prestige as f64 * battle.range / 1000.0)
                * config.recency_multiplier(losses.recent_invasions)
                * (1.0 + bonus / 100.0);
            return (round_count(gain) as i64, loss(defender.prestige));
        }

        let penalised = battle.overwhelmed
            || (!battle.success && battle.range < config.prestige_penalty_range);
        if penalised {
            (loss(attacker.prestige), 0)
        } else {
            (0, 0)
        }
    }

    /// Raw morale changes for attacker and defender.
    fn morale(&self, battle: &Battle) -> (i64, i64) {
        let config = self.config;
        if battle.success {
            let change = config.morale_for_success(battle.range);
            (change, if change > 0 { -change } else { 0 })
        } else if battle.overwhelmed {
            (config.morale_overwhelmed, 0)
        } else {
            (config.morale_failed, config.morale_repelled)
        }
    }

    /// Peasants killed and improvements damaged while fighting.
    fn battle_damage(&self, spoils: &mut Spoils, race: &Race, defender: &Dominion, sent: &SlotCounts) {
        let mut burned = 0.0;
        let mut eaten = 0.0;
        let mut damage: BTreeMap<Improvement, f64> = BTreeMap::new();

        let masonry = RatioCap::new(self.config.masonry_damage_ratio, self.config.masonry_damage_max)
            .apply_scaled(defender.territory.building_fraction(BuildingKind::Masonry));

        for (slot, count) in sent.iter().filter(|(_, n)| *n > 0) {
            for perk in &race.unit(slot).perks {
                match perk {
                    UnitPerk::BurnsPeasants { per_unit } => burned += per_unit * count as f64,
                    UnitPerk::EatsPeasants { per_unit } => eaten += per_unit * count as f64,
                    UnitPerk::DamagesImprovements {
                        per_unit,
                        improvements,
                    } => {
                        let points = floor_count(per_unit * count as f64 * (1.0 - masonry));
                        let weights: Vec<u64> = improvements
                            .iter()
                            .map(|&i| defender.improvement_points(i))
                            .collect();
                        for (&improvement, share) in improvements.iter().zip(apportion(points, &weights)) {
                            *damage.entry(improvement).or_default() += share as f64;
                        }
                    }
                    _ => {}
                }
            }
        }

        spoils.peasants_burned = floor_count(burned).min(defender.peasants);
        spoils.peasants_eaten =
            floor_count(eaten).min(defender.peasants - spoils.peasants_burned);
        spoils.improvements_damaged = damage
            .into_iter()
            .map(|(improvement, points)| {
                (
                    improvement,
                    floor_count(points).min(defender.improvement_points(improvement)),
                )
            })
            .filter(|(_, points)| *points > 0)
            .collect();
    }

    /// New units raised from the defender's dead.
    fn conversions(
        &self,
        attacker: &Dominion,
        race: &Race,
        sent: &SlotCounts,
        battle: &Battle,
        losses: &Losses,
    ) -> SlotCounts {
        let mut out = SlotCounts::ZERO;
        if !race.converts() {
            return out;
        }
        let converters: Vec<(Slot, u64)> = sent
            .iter()
            .filter(|(_, count)| *count > 0)
            .filter_map(|(slot, count)| {
                race.unit(slot).find_perk(|p| match p {
                    UnitPerk::ConvertsTo { slot: target } => Some((*target, count)),
                    _ => None,
                })
            })
            .collect();
        if converters.is_empty() {
            return out;
        }

        let converting: u64 = converters.iter().map(|(_, n)| n).sum();
        let bonus = race.scalar(|p| match p {
            RacePerk::Conversions(v) => Some(*v),
            _ => None,
        }) + attacker.tech.conversions;
        let by_units = converting as f64 * self.config.conversion_rate * (1.0 + bonus / 100.0);
        let by_casualties = losses.defender_total() as f64 * self.config.conversion_casualty_max;
        let total = floor_count(by_units.min(by_casualties) * battle.range / 100.0);

        let weights: Vec<u64> = converters.iter().map(|(_, n)| *n).collect();
        for ((target, _), share) in converters.iter().zip(apportion(total, &weights)) {
            out[*target] += share;
        }
        out
    }

    /// Boats `victim` loses to `side` units with the sink perk.
    ///
    /// Only boats neither protected by docks nor already `taken` can sink.
    fn boats_sunk(
        &self,
        race: &Race,
        units: &SlotCounts,
        side: Side,
        victim: &Dominion,
        taken: u64,
    ) -> u64 {
        let sunk: f64 = units
            .iter()
            .filter_map(|(slot, count)| {
                race.unit(slot).find_perk(|p| match p {
                    UnitPerk::SinksBoats { side: s, per_unit } if *s == side => {
                        Some(per_unit * count as f64)
                    }
                    _ => None,
                })
            })
            .sum();
        let protected = floor_count(
            victim.territory.buildings_of(BuildingKind::Dock) as f64
                * self.config.boats_protected_per_dock,
        );
        let exposed = victim
            .resource(Resource::Boats)
            .saturating_sub(protected)
            .saturating_sub(taken);
        floor_count(sunk).min(exposed)
    }
}

/// Resources taken, in proportion to the force needed to break the target.
fn plunder(
    race: &Race,
    defender: &Dominion,
    sent: &SlotCounts,
    units_needed: u64,
) -> BTreeMap<Resource, u64> {
    let total_sent = sent.total();
    if total_sent == 0 {
        return BTreeMap::new();
    }
    let mut taken: BTreeMap<Resource, f64> = BTreeMap::new();
    for (slot, count) in sent.iter().filter(|(_, n)| *n > 0) {
        for perk in &race.unit(slot).perks {
            if let UnitPerk::Plunders { resource, per_unit } = perk {
                let share = count as f64 / total_sent as f64;
                *taken.entry(*resource).or_default() += per_unit * units_needed as f64 * share;
            }
        }
    }
    taken
        .into_iter()
        .map(|(resource, amount)| (resource, floor_count(amount).min(defender.resource(resource))))
        .filter(|(_, amount)| *amount > 0)
        .collect()
}

/// Apply the morale rules to a raw change: never below zero, and gains past
/// the soft ceiling count half.
#[must_use]
pub fn morale_change(current: u32, change: i64) -> i64 {
    let current = i64::from(current);
    if change <= 0 {
        return change.max(-current);
    }
    let headroom = (i64::from(Dominion::MORALE_CEILING) - current).max(0);
    let full = change.min(headroom);
    full + (change - full) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_morale_never_negative() {
        assert_eq!(morale_change(5, -20), -5);
        assert_eq!(morale_change(50, -10), -10);
    }

    #[test]
    fn test_morale_gain_halved_past_hundred() {
        assert_eq!(morale_change(90, 20), 15);
        assert_eq!(morale_change(100, 20), 10);
        assert_eq!(morale_change(60, 15), 15);
    }
}
