//! Time-limited buffs and debuffs (spells).
//!
//! Which effects are active, and who cast them, is answered by an
//! [`ActiveEffectProvider`]. What an effect does is data: an
//! [`EffectDefinition`] in the game config.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::dominion::DominionId;
use crate::perks::Side;

/// Answers which effects are active on a dominion.
pub trait ActiveEffectProvider {
    /// Whether the effect `key` is active on `dominion`.
    fn is_active(&self, dominion: DominionId, key: &str) -> bool;

    /// Who cast the effect `key` on `dominion`, if it is active.
    fn caster_of(&self, dominion: DominionId, key: &str) -> Option<DominionId>;
}

/// What an active effect changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDefinition {
    /// Effect key.
    pub key: String,
    /// Offensive power, percent.
    #[serde(default)]
    pub offense: f64,
    /// Defensive power, percent.
    #[serde(default)]
    pub defense: f64,
    /// Offensive casualties, percent (negative reduces).
    #[serde(default)]
    pub offensive_casualties: f64,
    /// Defensive casualties, percent (negative reduces).
    #[serde(default)]
    pub defensive_casualties: f64,
    /// Replaces defensive power per draftee while active.
    #[serde(default)]
    pub draftee_defense: Option<f64>,
    /// Nullifies the attacker's temple reduction against this dominion.
    #[serde(default)]
    pub negates_temples: bool,
    /// Reduces the target's raw defense based on its forest.
    #[serde(default)]
    pub ambush: bool,
}

impl EffectDefinition {
    /// Effect with no modifiers.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            offense: 0.0,
            defense: 0.0,
            offensive_casualties: 0.0,
            defensive_casualties: 0.0,
            draftee_defense: None,
            negates_temples: false,
            ambush: false,
        }
    }

    /// Power percent for a side.
    #[must_use]
    pub const fn power(&self, side: Side) -> f64 {
        match side {
            Side::Offense => self.offense,
            Side::Defense => self.defense,
        }
    }

    /// Casualty delta for a side, in percent.
    #[must_use]
    pub const fn casualties(&self, side: Side) -> f64 {
        match side {
            Side::Offense => self.offensive_casualties,
            Side::Defense => self.defensive_casualties,
        }
    }
}

/// Effect definitions active on one dominion.
pub fn active_definitions<'a>(
    catalog: &'a [EffectDefinition],
    provider: &'a dyn ActiveEffectProvider,
    dominion: DominionId,
) -> impl Iterator<Item = &'a EffectDefinition> + 'a {
    catalog
        .iter()
        .filter(move |effect| provider.is_active(dominion, &effect.key))
}

/// In-memory effect table keyed by dominion and effect key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveEffects {
    active: BTreeMap<DominionId, BTreeMap<String, DominionId>>,
}

impl ActiveEffects {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an effect active on `target`, cast by `caster`.
    pub fn activate(&mut self, target: DominionId, key: impl Into<String>, caster: DominionId) {
        self.active
            .entry(target)
            .or_default()
            .insert(key.into(), caster);
    }

    /// Remove an effect.
    pub fn deactivate(&mut self, target: DominionId, key: &str) {
        if let Some(effects) = self.active.get_mut(&target) {
            effects.remove(key);
        }
    }

    /// Keys active on a dominion.
    #[must_use]
    pub fn keys_for(&self, target: DominionId) -> BTreeSet<&str> {
        self.active
            .get(&target)
            .map(|effects| effects.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

impl ActiveEffectProvider for ActiveEffects {
    fn is_active(&self, dominion: DominionId, key: &str) -> bool {
        self.active
            .get(&dominion)
            .is_some_and(|effects| effects.contains_key(key))
    }

    fn caster_of(&self, dominion: DominionId, key: &str) -> Option<DominionId> {
        self.active
            .get(&dominion)
            .and_then(|effects| effects.get(key))
            .copied()
    }
}

/// Provider with no active effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEffects;

impl ActiveEffectProvider for NoEffects {
    fn is_active(&self, _dominion: DominionId, _key: &str) -> bool {
        false
    }

    fn caster_of(&self, _dominion: DominionId, _key: &str) -> Option<DominionId> {
        None
    }
}
