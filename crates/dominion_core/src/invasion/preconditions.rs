//! Order validation. Every check is read-only; a rejected order leaves no
//! trace.

use std::collections::BTreeMap;

use crate::dominion::Dominion;
use crate::economy::Resource;
use crate::error::{InvasionError, Result};
use crate::perks::{Side, UnitPerk};
use crate::power::{DefenseOptions, Matchup};
use crate::races::Race;
use crate::units::{Slot, SlotCounts};

use super::InvasionResolver;

/// Sparse slot number to quantity map, as submitted by a player.
pub type UnitOrder = BTreeMap<u8, i64>;

/// An order that passed every precondition.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOrder {
    /// Units sent per slot.
    pub units: SlotCounts,
    /// Target land as a percentage of the attacker's land.
    pub range: f64,
    /// Offensive power of the sent units against the target.
    pub op: f64,
    /// Attacker home defense left after sending, without the land floor.
    pub home_defense: f64,
}

/// Turn a sparse order into slot counts.
pub fn parse_order(order: &UnitOrder) -> std::result::Result<SlotCounts, InvasionError> {
    let mut units = SlotCounts::ZERO;
    for (&number, &quantity) in order {
        let slot = Slot::new(number).ok_or(InvasionError::UnknownSlot(number))?;
        let quantity = u64::try_from(quantity).map_err(|_| InvasionError::NegativeQuantity {
            slot: number,
            quantity,
        })?;
        units[slot] = quantity;
    }
    Ok(units)
}

impl InvasionResolver<'_> {
    /// Check an order against every precondition, in a fixed order.
    ///
    /// The first failing check is returned. World-level gates come first,
    /// then the order itself, then the home defense rules.
    pub fn validate(
        &self,
        attacker: &Dominion,
        target: &Dominion,
        order: &UnitOrder,
    ) -> Result<ValidatedOrder> {
        let round = self.round;
        if round.offense_disabled {
            return Err(InvasionError::OffenseDisabled.into());
        }
        if !round.started {
            return Err(InvasionError::RoundNotStarted.into());
        }
        if attacker.is_protected() {
            return Err(InvasionError::AttackerUnderProtection.into());
        }
        if target.is_protected() {
            return Err(InvasionError::TargetUnderProtection.into());
        }
        if attacker.round != target.round || attacker.round != round.id {
            return Err(InvasionError::DifferentRound.into());
        }
        if attacker.id == target.id {
            return Err(InvasionError::SelfTarget.into());
        }
        if attacker.realm == target.realm {
            return Err(InvasionError::SameRealm.into());
        }
        if !self.range.in_range(attacker, target) {
            return Err(InvasionError::OutOfRange.into());
        }

        let units = parse_order(order)?;
        let race = self.races.get(&attacker.race)?;
        let range = self.range.relative_size(attacker, target);
        let power = self.power();
        let matchup = Matchup::against(target, range).with_units(&units);

        let raw = power.raw_unit_powers(attacker, Side::Offense, &matchup)?;
        if !units
            .iter()
            .any(|(slot, count)| count > 0 && raw[slot.index()] > 0.0)
        {
            return Err(InvasionError::NoOffensiveUnits.into());
        }

        for (slot, requested) in units.iter() {
            let available = attacker.military.home[slot];
            if requested > available {
                return Err(InvasionError::InsufficientUnits {
                    slot: slot.number(),
                    requested,
                    available,
                }
                .into());
            }
        }

        self.check_boats(attacker, race, &units)?;
        check_carriers(race, &units)?;

        let required = self.config.min_morale_to_invade;
        if attacker.morale < required {
            return Err(InvasionError::MinMorale {
                morale: attacker.morale,
                required,
            }
            .into());
        }

        let no_floor = DefenseOptions {
            ignore_minimum: true,
            ..DefenseOptions::default()
        };
        let remaining = attacker.military.home.saturating_sub(&units);
        let home_before = power.defensive_power(attacker, &Matchup::alone(), &no_floor)?;
        let home_after = power.defensive_power(
            attacker,
            &Matchup::alone().with_units(&remaining),
            &no_floor,
        )?;
        let returning = power.defensive_power(
            attacker,
            &Matchup::alone().with_units(&attacker.military.returning),
            &DefenseOptions::away(),
        )?;
        if home_after + returning < (home_before + returning) * self.config.min_home_defense_share {
            return Err(InvasionError::ThirtyThreePercentRule.into());
        }

        let op = power.offensive_power(attacker, &matchup)?;
        if op > home_after * self.config.max_offense_to_home_defense {
            return Err(InvasionError::FourToThreeRule.into());
        }

        Ok(ValidatedOrder {
            units,
            range,
            op,
            home_defense: home_after,
        })
    }

    fn check_boats(&self, attacker: &Dominion, race: &Race, units: &SlotCounts) -> Result<()> {
        let sailing: u64 = units
            .iter()
            .filter(|(slot, _)| race.unit(*slot).need_boat)
            .map(|(_, count)| count)
            .sum();
        let needed = if self.config.units_per_boat == 0 {
            0
        } else {
            sailing.div_ceil(self.config.units_per_boat)
        };
        let available = attacker.resource(Resource::Boats);
        if needed > available {
            return Err(InvasionError::InsufficientBoats { needed, available }.into());
        }
        Ok(())
    }
}

fn check_carriers(race: &Race, units: &SlotCounts) -> Result<()> {
    let mut needed = 0;
    let mut capacity = 0;
    for (slot, count) in units.iter() {
        let unit = race.unit(slot);
        if unit.has_perk(|p| matches!(p, UnitPerk::NeedsCarrier)) {
            needed += count;
        }
        if let Some(per_unit) = unit.find_perk(|p| match p {
            UnitPerk::Carries { capacity } => Some(u64::from(*capacity)),
            _ => None,
        }) {
            capacity += per_unit * count;
        }
    }
    if needed > capacity {
        return Err(InvasionError::InsufficientCarriers { needed, capacity }.into());
    }
    Ok(())
}
