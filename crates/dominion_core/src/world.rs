//! In-memory world store.
//!
//! Each dominion sits behind its own lock. A unit of work locks the two
//! dominions it touches in id order, works on copies and writes them back
//! only when it succeeds, so concurrent invasions against the same defender
//! never interleave and a failed one leaves no trace.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::casualties::{CasualtyEngine, StarvationLosses};
use crate::config::{GameConfig, RoundInfo};
use crate::delta::{DeltaKey, DominionDelta};
use crate::dominion::{Dominion, DominionId};
use crate::effects::ActiveEffects;
use crate::error::{DominionError, InvasionError, InvariantViolation, Result};
use crate::events::EventLog;
use crate::invasion::{InvasionResolver, InvasionResult, Resolution, UnitOrder};
use crate::queue::{DeferredEntry, DeferredQueue};
use crate::races::RaceRegistry;
use crate::range::LandRange;

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| DominionError::Storage(format!("{what} lock poisoned")))
}

/// Dominions plus the collaborators an invasion needs.
pub struct InMemoryWorld {
    config: GameConfig,
    races: RaceRegistry,
    round: RoundInfo,
    range: LandRange,
    effects: ActiveEffects,
    dominions: BTreeMap<DominionId, Mutex<Dominion>>,
    queue: Mutex<DeferredQueue>,
    events: Mutex<EventLog>,
}

impl InMemoryWorld {
    /// Create an empty world.
    #[must_use]
    pub fn new(config: GameConfig, races: RaceRegistry, round: RoundInfo) -> Self {
        let range = LandRange::new(config.min_range);
        Self {
            config,
            races,
            round,
            range,
            effects: ActiveEffects::new(),
            dominions: BTreeMap::new(),
            queue: Mutex::new(DeferredQueue::new()),
            events: Mutex::new(EventLog::new()),
        }
    }

    /// Add or replace a dominion.
    pub fn insert(&mut self, dominion: Dominion) {
        self.dominions.insert(dominion.id, Mutex::new(dominion));
    }

    /// Snapshot of a dominion.
    pub fn get(&self, id: DominionId) -> Result<Dominion> {
        let cell = self.dominions.get(&id).ok_or(DominionError::NotFound(id))?;
        Ok(lock(cell, "dominion")?.clone())
    }

    /// Game config.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Race registry.
    #[must_use]
    pub const fn races(&self) -> &RaceRegistry {
        &self.races
    }

    /// Current round.
    #[must_use]
    pub const fn round(&self) -> &RoundInfo {
        &self.round
    }

    /// Mutable round, for opening the round or switching offense off.
    pub fn round_mut(&mut self) -> &mut RoundInfo {
        &mut self.round
    }

    /// Active effects.
    #[must_use]
    pub const fn effects(&self) -> &ActiveEffects {
        &self.effects
    }

    /// Mutable active effects.
    pub fn effects_mut(&mut self) -> &mut ActiveEffects {
        &mut self.effects
    }

    /// Read the event log.
    pub fn with_events<R>(&self, f: impl FnOnce(&EventLog) -> R) -> Result<R> {
        Ok(f(&*lock(&self.events, "event log")?))
    }

    /// Read the deferred queue.
    pub fn with_queue<R>(&self, f: impl FnOnce(&DeferredQueue) -> R) -> Result<R> {
        Ok(f(&*lock(&self.queue, "deferred queue")?))
    }

    /// Run `f` on copies of two distinct dominions and keep the copies only
    /// if it succeeds.
    pub fn transact<R>(
        &self,
        a: DominionId,
        b: DominionId,
        f: impl FnOnce(&mut Dominion, &mut Dominion) -> Result<R>,
    ) -> Result<R> {
        if a == b {
            return Err(InvariantViolation::Other(format!(
                "Unit of work needs two distinct dominions, got {a} twice"
            ))
            .into());
        }
        let cell_a = self.dominions.get(&a).ok_or(DominionError::NotFound(a))?;
        let cell_b = self.dominions.get(&b).ok_or(DominionError::NotFound(b))?;

        let (mut guard_a, mut guard_b) = if a < b {
            let first = lock(cell_a, "dominion")?;
            (first, lock(cell_b, "dominion")?)
        } else {
            let first = lock(cell_b, "dominion")?;
            (lock(cell_a, "dominion")?, first)
        };

        let mut work_a = guard_a.clone();
        let mut work_b = guard_b.clone();
        let out = f(&mut work_a, &mut work_b)?;
        *guard_a = work_a;
        *guard_b = work_b;
        Ok(out)
    }

    /// Resolve an invasion without applying it.
    pub fn preview(
        &self,
        attacker: DominionId,
        defender: DominionId,
        order: &UnitOrder,
    ) -> Result<Resolution> {
        let a = self.get(attacker)?;
        let d = self.get(defender)?;
        let events = lock(&self.events, "event log")?;
        self.resolver(&events).resolve(&a, &d, order)
    }

    /// Resolve and apply an invasion as one unit of work.
    pub fn invade(
        &self,
        attacker: DominionId,
        defender: DominionId,
        order: &UnitOrder,
    ) -> Result<InvasionResult> {
        if attacker == defender {
            let own = self.get(attacker)?;
            let events = lock(&self.events, "event log")?;
            self.resolver(&events).validate(&own, &own, order)?;
            return Err(InvasionError::SelfTarget.into());
        }

        self.transact(attacker, defender, |a, d| {
            let mut events = lock(&self.events, "event log")?;
            let mut queue = lock(&self.queue, "deferred queue")?;
            let resolution = self.resolver(&events).resolve(a, d, order)?;
            resolution.commit(a, d, &mut *queue, &mut *events)
        })
    }

    /// Apply starvation losses for a food deficit.
    pub fn starve(&self, id: DominionId, food_deficit: u64) -> Result<StarvationLosses> {
        let cell = self.dominions.get(&id).ok_or(DominionError::NotFound(id))?;
        let mut guard = lock(cell, "dominion")?;

        let losses = CasualtyEngine::new(&self.config, &self.races, &self.effects)
            .starvation(&guard, food_deficit);

        let mut delta = DominionDelta::new();
        delta.lose(DeltaKey::Peasants, losses.peasants);
        delta.lose(DeltaKey::Draftees, losses.draftees);
        delta.lose(DeltaKey::Spies, losses.spies);
        delta.lose(DeltaKey::Wizards, losses.wizards);
        delta.lose(DeltaKey::Archmages, losses.archmages);
        delta.lose_units(&losses.units, false);
        guard.apply_delta(&delta)?;

        if losses.total() > 0 {
            tracing::info!(dominion = id.0, deaths = losses.total(), "Starvation");
        }
        Ok(losses)
    }

    /// Advance one tick: deliver every deferred change that is now due, then
    /// count down protection.
    ///
    /// Delivery is all-or-nothing. If any change cannot be applied the queue
    /// and dominions are left as they were.
    pub fn tick(&mut self) -> Result<Vec<DeferredEntry>> {
        let mut queue = lock(&self.queue, "deferred queue")?.clone();
        queue.advance_tick();
        let due = queue.deliver_due();

        let mut touched: BTreeMap<DominionId, Dominion> = BTreeMap::new();
        for entry in &due {
            if !touched.contains_key(&entry.dominion) {
                touched.insert(entry.dominion, self.get(entry.dominion)?);
            }
            if let Some(dominion) = touched.get_mut(&entry.dominion) {
                dominion.apply_delta(&entry.delta)?;
            }
        }

        for (id, dominion) in touched {
            if let Some(cell) = self.dominions.get_mut(&id) {
                *cell.get_mut().map_err(|_| {
                    DominionError::Storage("dominion lock poisoned".to_string())
                })? = dominion;
            }
        }
        for cell in self.dominions.values_mut() {
            let dominion = cell
                .get_mut()
                .map_err(|_| DominionError::Storage("dominion lock poisoned".to_string()))?;
            dominion.protection_ticks = dominion.protection_ticks.saturating_sub(1);
        }
        *lock(&self.queue, "deferred queue")? = queue;
        self.round.current_tick += 1;

        tracing::debug!(tick = self.round.current_tick, delivered = due.len(), "Tick");
        Ok(due)
    }

    fn resolver<'a>(&'a self, events: &'a EventLog) -> InvasionResolver<'a> {
        InvasionResolver::new(
            &self.config,
            &self.races,
            &self.effects,
            &self.range,
            events,
            &self.round,
        )
    }
}
