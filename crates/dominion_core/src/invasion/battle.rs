//! Battle outcome and casualties.

use crate::casualties::{CasualtyContext, OpposingForce};
use crate::dominion::Dominion;
use crate::error::Result;
use crate::math::{ceil_count, round_count, safe_div};
use crate::perks::{RacePerk, Side};
use crate::power::{ambush_reduction, temple_reduction, DefenseOptions, Matchup, PowerBreakdown};
use crate::units::{Slot, SlotCounts, SLOT_COUNT};

use super::preconditions::ValidatedOrder;
use super::InvasionResolver;

/// Power on both sides and the verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct Battle {
    /// Attacker offense with the sent units.
    pub offense: PowerBreakdown,
    /// Defender home defense after reductions.
    pub defense: PowerBreakdown,
    /// Share of the defensive multiplier removed by temples.
    pub temple_reduction: f64,
    /// Share of raw defense removed by ambush.
    pub ambush_reduction: f64,
    /// Defender land as a percentage of attacker land.
    pub range: f64,
    /// OP > DP.
    pub success: bool,
    /// Failed by at least the overwhelm threshold.
    pub overwhelmed: bool,
}

impl Battle {
    /// Offensive power.
    #[must_use]
    pub fn op(&self) -> f64 {
        self.offense.total
    }

    /// Defensive power.
    #[must_use]
    pub fn dp(&self) -> f64 {
        self.defense.total
    }
}

/// Units lost on both sides.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Losses {
    /// Attacker units lost per slot.
    pub attacker: SlotCounts,
    /// Defender units lost per slot.
    pub defender: SlotCounts,
    /// Defender draftees lost.
    pub draftees: u64,
    /// Smallest force that would have broken the defender. Zero on failure.
    pub units_needed: u64,
    /// Defensive base rate after recency and cap.
    pub defensive_rate: f64,
    /// Successful invasions of the defender inside the recency window.
    pub recent_invasions: usize,
}

impl Losses {
    /// Defender units and draftees lost.
    #[must_use]
    pub fn defender_total(&self) -> u64 {
        self.defender.total() + self.draftees
    }
}

impl InvasionResolver<'_> {
    /// Compute both sides' power and decide the battle.
    pub fn fight(
        &self,
        attacker: &Dominion,
        defender: &Dominion,
        order: &ValidatedOrder,
    ) -> Result<Battle> {
        let power = self.power();
        let temple = temple_reduction(self.config, self.effects, attacker, defender);
        let ambush = ambush_reduction(self.config, self.effects, attacker, defender);

        let offense = power.offense(
            attacker,
            &Matchup::against(defender, order.range).with_units(&order.units),
        )?;
        let defense = power.defense(
            defender,
            &Matchup::against(attacker, self.range.relative_size(defender, attacker))
                .with_opponent_units(&order.units),
            &DefenseOptions {
                multiplier_reduction: temple,
                ambush_reduction: ambush,
                ..DefenseOptions::default()
            },
        )?;

        let (op, dp) = (offense.total, defense.total);
        let success = op > dp;
        let overwhelmed = !success && dp > 0.0 && 1.0 - op / dp >= self.config.overwhelmed_threshold;

        tracing::debug!(
            attacker = attacker.id.0,
            defender = defender.id.0,
            op,
            dp,
            temple,
            ambush,
            success,
            overwhelmed,
            "Resolved battle"
        );

        Ok(Battle {
            offense,
            defense,
            temple_reduction: temple,
            ambush_reduction: ambush,
            range: order.range,
            success,
            overwhelmed,
        })
    }

    /// Units lost by both sides.
    pub fn losses(
        &self,
        attacker: &Dominion,
        defender: &Dominion,
        order: &ValidatedOrder,
        battle: &Battle,
    ) -> Result<Losses> {
        let power = self.power();
        let casualties = self.casualties();
        let sent = &order.units;
        let defenders = defender.military.home;

        let defender_matchup = Matchup::against(attacker, self.range.relative_size(defender, attacker))
            .with_opponent_units(sent);
        let defending_force = OpposingForce {
            per_unit: power.raw_unit_powers(defender, Side::Defense, &defender_matchup)?,
            units: defenders,
            other_raw: battle.defense.draftees + battle.defense.housing,
        };
        let attacking_force = OpposingForce {
            per_unit: battle_per_unit(&battle.offense),
            units: *sent,
            other_raw: 0.0,
        };

        // Offense
        let total_sent = sent.total();
        let (offensive_rate, units_needed) = if battle.success {
            let average = safe_div(battle.op(), total_sent as f64);
            let needed = ceil_count(safe_div(battle.dp() + 1.0, average)).min(total_sent);
            (
                safe_div(needed as f64 * self.config.offensive_casualties_base, total_sent as f64),
                needed,
            )
        } else if battle.overwhelmed {
            (self.config.offensive_casualties_base * 2.0, 0)
        } else {
            (self.config.offensive_casualties_base, 0)
        };

        let attacker_ctx = CasualtyContext {
            own: attacker,
            opponent: defender,
            committed: sent,
            range: battle.range,
            overwhelmed: battle.overwhelmed,
            opposing: &defending_force,
        };
        let mut attacker_losses = SlotCounts::ZERO;
        for slot in Slot::ALL.into_iter().filter(|&s| sent[s] > 0) {
            let rate = casualties.rate(&attacker_ctx, Side::Offense, slot)?;
            attacker_losses[slot] =
                round_count(sent[slot] as f64 * rate.share(offensive_rate)).min(sent[slot]);
        }

        // Defense
        let window_start = self.round.current_tick.saturating_sub(self.config.recent_hit_window);
        let recent_invasions = self.history.recent_invasions_of(defender.id, window_start);
        let mut losses = Losses {
            attacker: attacker_losses,
            units_needed,
            recent_invasions,
            ..Losses::default()
        };
        if battle.overwhelmed {
            return Ok(losses);
        }

        let ratio = if battle.dp() > 0.0 {
            battle.op() / battle.dp()
        } else {
            1.0
        };
        let defensive_rate = (self.config.defensive_casualties_base
            * ratio
            * self.config.recency_multiplier(recent_invasions))
        .min(self.config.defensive_casualties_max);
        let racial = (1.0
            + self.races.get(&defender.race)?.scalar(|p| match p {
                RacePerk::DefensiveCasualties(v) => Some(*v),
                _ => None,
            }) / 100.0)
            .max(0.0);

        let defender_ctx = CasualtyContext {
            own: defender,
            opponent: attacker,
            committed: &defenders,
            range: self.range.relative_size(defender, attacker),
            overwhelmed: false,
            opposing: &attacking_force,
        };
        for slot in Slot::ALL.into_iter().filter(|&s| defenders[s] > 0) {
            let rate = casualties.rate(&defender_ctx, Side::Defense, slot)?;
            let share = match rate.multiplier() {
                Some(_) => rate.share(defensive_rate) * racial,
                None => rate.share(defensive_rate),
            };
            losses.defender[slot] = round_count(defenders[slot] as f64 * share).min(defenders[slot]);
        }
        let draftee_rate = casualties.draftee_rate(&defender_ctx)?;
        losses.draftees = round_count(
            defender.military.draftees as f64 * draftee_rate.share(defensive_rate) * racial,
        )
        .min(defender.military.draftees);
        losses.defensive_rate = defensive_rate;

        tracing::debug!(
            attacker = attacker.id.0,
            defender = defender.id.0,
            offensive_rate,
            defensive_rate,
            recent_invasions,
            attacker_lost = losses.attacker.total(),
            defender_lost = losses.defender_total(),
            "Computed casualties"
        );

        Ok(losses)
    }
}

fn battle_per_unit(breakdown: &PowerBreakdown) -> [f64; SLOT_COUNT] {
    let mut per_unit = [0.0; SLOT_COUNT];
    for unit in &breakdown.units {
        per_unit[unit.slot.index()] = unit.per_unit;
    }
    per_unit
}
