//! Invasion resolution.
//!
//! One invasion runs through fixed stages, each a method on
//! [`InvasionResolver`]:
//!
//! 1. [`validate`](InvasionResolver::validate) checks every precondition.
//! 2. [`fight`](InvasionResolver::fight) computes OP and DP and decides
//!    success and overwhelm.
//! 3. [`losses`](InvasionResolver::losses) computes casualties on both sides.
//! 4. [`spoils`](InvasionResolver::spoils) computes land, prestige, morale,
//!    conversions and the other side effects.
//! 5. The stages are folded into one [`Resolution`]: an immutable
//!    [`InvasionResult`] plus one delta per dominion and the deltas to
//!    deliver later.
//!
//! Nothing is mutated until [`Resolution::commit`], which applies both
//! deltas all-or-nothing, queues the deferred deltas and records the event.

pub mod battle;
pub mod preconditions;
pub mod result;
pub mod spoils;

use std::collections::BTreeMap;

use crate::casualties::CasualtyEngine;
use crate::config::{GameConfig, RoundInfo};
use crate::delta::{DeltaKey, DominionDelta};
use crate::dominion::{Dominion, DominionId};
use crate::economy::Resource;
use crate::effects::ActiveEffectProvider;
use crate::error::{DominionError, InvariantViolation, Result};
use crate::events::{EventKind, EventPayload, EventSink, InvasionHistory};
use crate::land::Terrain;
use crate::power::PowerEngine;
use crate::queue::DeferredEffectQueue;
use crate::races::RaceRegistry;
use crate::range::RangeProvider;
use crate::units::Slot;

pub use battle::{Battle, Losses};
pub use preconditions::{parse_order, UnitOrder, ValidatedOrder};
pub use result::{AttackerOutcome, DefenderOutcome, InvasionReport, InvasionResult, AUDIT_VERSION};
pub use spoils::{morale_change, Spoils};

/// A delta to deliver to a dominion after some ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledDelta {
    /// Dominion receiving the delta.
    pub dominion: DominionId,
    /// Changes to apply.
    pub delta: DominionDelta,
    /// Ticks until delivery.
    pub delay_ticks: u32,
}

/// A resolved invasion that has not touched any state yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Outcome record.
    pub result: InvasionResult,
    /// Immediate attacker changes.
    pub attacker_delta: DominionDelta,
    /// Immediate defender changes.
    pub defender_delta: DominionDelta,
    /// Changes delivered later.
    pub deferred: Vec<ScheduledDelta>,
}

impl Resolution {
    /// Apply the resolution.
    ///
    /// Both deltas are applied to copies first; the dominions are only
    /// replaced once both succeed. Deferred deltas are queued and the event
    /// recorded after that, so a failure leaves every argument untouched.
    pub fn commit(
        self,
        attacker: &mut Dominion,
        defender: &mut Dominion,
        queue: &mut dyn DeferredEffectQueue,
        events: &mut dyn EventSink,
    ) -> Result<InvasionResult> {
        if attacker.id != self.result.attacker || defender.id != self.result.defender {
            return Err(InvariantViolation::Other(format!(
                "Resolution for {} -> {} committed to {} -> {}",
                self.result.attacker, self.result.defender, attacker.id, defender.id
            ))
            .into());
        }

        let mut next_attacker = attacker.clone();
        next_attacker.apply_delta(&self.attacker_delta)?;
        let mut next_defender = defender.clone();
        next_defender.apply_delta(&self.defender_delta)?;

        let summary = InvasionReport::new(&self.result, &attacker.name, &defender.name).summary();
        let audit = self.result.to_audit_bytes()?;

        *attacker = next_attacker;
        *defender = next_defender;

        for scheduled in self.deferred {
            queue.schedule(scheduled.dominion, scheduled.delta, scheduled.delay_ticks);
        }

        let kind = if self.result.success {
            EventKind::InvasionSuccess
        } else {
            EventKind::InvasionRepelled
        };
        events.record(
            kind,
            self.result.attacker,
            self.result.defender,
            EventPayload {
                tick: self.result.tick,
                summary,
                audit,
            },
        );

        tracing::info!(
            attacker = self.result.attacker.0,
            defender = self.result.defender.0,
            success = self.result.success,
            overwhelmed = self.result.overwhelmed,
            land = self.result.land_conquered(),
            "Invasion committed"
        );

        Ok(self.result)
    }
}

/// Resolves invasions between two dominions.
///
/// Holds only shared read-only state; every method is pure.
pub struct InvasionResolver<'a> {
    config: &'a GameConfig,
    races: &'a RaceRegistry,
    effects: &'a dyn ActiveEffectProvider,
    range: &'a dyn RangeProvider,
    history: &'a dyn InvasionHistory,
    round: &'a RoundInfo,
}

impl<'a> InvasionResolver<'a> {
    /// Create a resolver over shared state and collaborators.
    #[must_use]
    pub fn new(
        config: &'a GameConfig,
        races: &'a RaceRegistry,
        effects: &'a dyn ActiveEffectProvider,
        range: &'a dyn RangeProvider,
        history: &'a dyn InvasionHistory,
        round: &'a RoundInfo,
    ) -> Self {
        Self {
            config,
            races,
            effects,
            range,
            history,
            round,
        }
    }

    /// Power engine over the same state.
    #[must_use]
    pub fn power(&self) -> PowerEngine<'a> {
        PowerEngine::new(self.config, self.races, self.effects, self.round)
    }

    /// Casualty engine over the same state.
    #[must_use]
    pub fn casualties(&self) -> CasualtyEngine<'a> {
        CasualtyEngine::new(self.config, self.races, self.effects)
    }

    /// Resolve an invasion without changing anything.
    pub fn resolve(
        &self,
        attacker: &Dominion,
        defender: &Dominion,
        order: &UnitOrder,
    ) -> Result<Resolution> {
        let validated = match self.validate(attacker, defender, order) {
            Ok(validated) => validated,
            Err(DominionError::Precondition(e)) => {
                tracing::warn!(
                    attacker = attacker.id.0,
                    defender = defender.id.0,
                    code = e.code(),
                    "Invasion rejected: {}",
                    e
                );
                return Err(e.into());
            }
            Err(e) => return Err(e),
        };

        let battle = self.fight(attacker, defender, &validated)?;
        let losses = self.losses(attacker, defender, &validated, &battle)?;
        let spoils = self.spoils(attacker, defender, &validated, &battle, &losses)?;
        self.assemble(attacker, defender, &validated, &battle, &losses, spoils)
    }

    fn assemble(
        &self,
        attacker: &Dominion,
        defender: &Dominion,
        order: &ValidatedOrder,
        battle: &Battle,
        losses: &Losses,
        spoils: Spoils,
    ) -> Result<Resolution> {
        let race = self.races.get(&attacker.race)?;
        let base_return = self.config.return_ticks;
        let sent = order.units;
        let returning = sent.saturating_sub(&losses.attacker).plus(&spoils.conversions);

        // Attacker, now
        let mut attacker_delta = DominionDelta::new();
        attacker_delta.lose_units(&sent, false);
        attacker_delta.gain_units(&returning, true);
        attacker_delta.add(DeltaKey::Morale, spoils.attacker_morale);
        if spoils.attacker_prestige < 0 {
            attacker_delta.add(DeltaKey::Prestige, spoils.attacker_prestige);
        }
        attacker_delta.gain(DeltaKey::Resource(Resource::ResearchPoints), spoils.research_points);
        attacker_delta.gain(DeltaKey::Resource(Resource::Souls), spoils.souls);
        attacker_delta.gain(DeltaKey::Resource(Resource::Champions), spoils.champions);
        attacker_delta.lose(DeltaKey::Resource(Resource::Boats), spoils.attacker_boats_lost);
        attacker_delta.gain(DeltaKey::DiscountedLand, spoils.discounted_land);
        if spoils.victory {
            attacker_delta.gain(DeltaKey::Victories, 1);
        }

        // Defender, now
        let mut defender_delta = DominionDelta::new();
        defender_delta.lose_units(&losses.defender, false);
        defender_delta.lose(DeltaKey::Draftees, losses.draftees);
        defender_delta.lose(DeltaKey::Peasants, spoils.peasants_burned + spoils.peasants_eaten);
        for (&improvement, &points) in &spoils.improvements_damaged {
            defender_delta.lose(DeltaKey::Improvement(improvement), points);
        }
        for (&resource, &amount) in &spoils.plunder {
            defender_delta.lose(DeltaKey::Resource(resource), amount);
        }
        defender_delta.lose(DeltaKey::Resource(Resource::Boats), spoils.defender_boats_lost);
        defender_delta.merge(&spoils.land.defender_delta());
        defender_delta.add(DeltaKey::Prestige, spoils.defender_prestige);
        defender_delta.add(DeltaKey::Morale, spoils.defender_morale);

        for terrain in Terrain::ALL {
            let removed = u64::try_from(-defender_delta.get(DeltaKey::Land(terrain))).unwrap_or(0);
            let conquered = spoils.land.conquered_on(terrain);
            if removed != conquered || spoils.land.generated_on(terrain) > conquered {
                return Err(InvariantViolation::LandNotConserved { removed, conquered }.into());
            }
        }

        // Attacker, later
        let mut later: BTreeMap<u32, DominionDelta> = BTreeMap::new();
        for slot in Slot::ALL.into_iter().filter(|&s| returning[s] > 0) {
            let delta = later.entry(race.unit(slot).return_ticks(base_return)).or_default();
            delta.lose(DeltaKey::UnitsReturning(slot), returning[slot]);
            delta.gain(DeltaKey::UnitsHome(slot), returning[slot]);
        }
        let slowest = later.keys().next_back().copied().unwrap_or(base_return);
        if spoils.land.gained() > 0 || !spoils.plunder.is_empty() {
            let delta = later.entry(base_return).or_default();
            delta.merge(&spoils.land.attacker_delta());
            for (&resource, &amount) in &spoils.plunder {
                delta.gain(DeltaKey::Resource(resource), amount);
            }
        }
        if spoils.attacker_prestige > 0 {
            later
                .entry(slowest)
                .or_default()
                .add(DeltaKey::Prestige, spoils.attacker_prestige);
        }
        let deferred = later
            .into_iter()
            .filter(|(_, delta)| !delta.is_empty())
            .map(|(delay_ticks, delta)| ScheduledDelta {
                dominion: attacker.id,
                delta,
                delay_ticks,
            })
            .collect();

        let result = InvasionResult {
            version: AUDIT_VERSION,
            attacker: attacker.id,
            defender: defender.id,
            tick: self.round.current_tick,
            range: battle.range,
            success: battle.success,
            overwhelmed: battle.overwhelmed,
            op: battle.op(),
            dp: battle.dp(),
            temple_reduction: battle.temple_reduction,
            ambush_reduction: battle.ambush_reduction,
            allied: spoils.allied,
            repeat_invasion: spoils.repeat_invasion,
            attacker_outcome: AttackerOutcome {
                units_sent: sent,
                units_lost: losses.attacker,
                conversions: spoils.conversions,
                units_returning: returning,
                return_ticks: slowest,
                prestige_change: spoils.attacker_prestige,
                morale_change: spoils.attacker_morale,
                boats_lost: spoils.attacker_boats_lost,
                plunder: spoils.plunder,
                research_points: spoils.research_points,
                souls: spoils.souls,
                champions: spoils.champions,
                discounted_land: spoils.discounted_land,
                victory: spoils.victory,
            },
            defender_outcome: DefenderOutcome {
                units_lost: losses.defender,
                draftees_lost: losses.draftees,
                peasants_killed: spoils.peasants_burned + spoils.peasants_eaten,
                improvements_damaged: spoils.improvements_damaged,
                prestige_change: spoils.defender_prestige,
                morale_change: spoils.defender_morale,
                boats_lost: spoils.defender_boats_lost,
                recently_invaded: losses.recent_invasions,
            },
            land: spoils.land,
        };

        Ok(Resolution {
            result,
            attacker_delta,
            defender_delta,
            deferred,
        })
    }
}
