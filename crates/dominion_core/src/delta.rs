//! Signed change sets merged into a dominion in one step.
//!
//! Resolution never writes to a dominion directly. Every change is
//! accumulated in a [`DominionDelta`] and merged once at the end, so later
//! steps always read the state as it was before the invasion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dominion::Dominion;
use crate::economy::{Improvement, Resource};
use crate::error::InvariantViolation;
use crate::land::{BuildingKind, Terrain};
use crate::units::{Slot, SlotCounts};

/// A single mutable counter on a dominion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeltaKey {
    /// Units at home in a slot.
    UnitsHome(Slot),
    /// Units returning in a slot.
    UnitsReturning(Slot),
    /// Draftees.
    Draftees,
    /// Spies.
    Spies,
    /// Wizards.
    Wizards,
    /// Archmages.
    Archmages,
    /// Peasants.
    Peasants,
    /// Acres of a terrain.
    Land(Terrain),
    /// Completed buildings.
    Building(BuildingKind),
    /// Buildings under construction.
    QueuedBuilding(BuildingKind),
    /// Resource stockpile.
    Resource(Resource),
    /// Improvement points.
    Improvement(Improvement),
    /// Morale.
    Morale,
    /// Prestige.
    Prestige,
    /// Discounted land credit.
    DiscountedLand,
    /// Victory count.
    Victories,
}

impl std::fmt::Display for DeltaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeltaKey::UnitsHome(slot) => write!(f, "military_{slot}"),
            DeltaKey::UnitsReturning(slot) => write!(f, "returning_{slot}"),
            DeltaKey::Draftees => f.write_str("military_draftees"),
            DeltaKey::Spies => f.write_str("military_spies"),
            DeltaKey::Wizards => f.write_str("military_wizards"),
            DeltaKey::Archmages => f.write_str("military_archmages"),
            DeltaKey::Peasants => f.write_str("peasants"),
            DeltaKey::Land(terrain) => write!(f, "land_{}", terrain.name()),
            DeltaKey::Building(kind) => write!(f, "building_{kind:?}"),
            DeltaKey::QueuedBuilding(kind) => write!(f, "queued_building_{kind:?}"),
            DeltaKey::Resource(resource) => write!(f, "resource_{}", resource.name()),
            DeltaKey::Improvement(improvement) => write!(f, "improvement_{improvement:?}"),
            DeltaKey::Morale => f.write_str("morale"),
            DeltaKey::Prestige => f.write_str("prestige"),
            DeltaKey::DiscountedLand => f.write_str("discounted_land"),
            DeltaKey::Victories => f.write_str("stat_attacking_success"),
        }
    }
}

/// Accumulated signed changes for one dominion.
///
/// Zero entries are dropped, so an empty delta means "no change".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(DeltaKey, i64)>", into = "Vec<(DeltaKey, i64)>")]
pub struct DominionDelta {
    changes: BTreeMap<DeltaKey, i64>,
}

impl DominionDelta {
    /// Empty delta.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signed amount to a counter.
    pub fn add(&mut self, key: DeltaKey, amount: i64) {
        if amount == 0 {
            return;
        }
        let entry = self.changes.entry(key).or_insert(0);
        *entry = entry.saturating_add(amount);
        if *entry == 0 {
            self.changes.remove(&key);
        }
    }

    /// Add an unsigned gain.
    pub fn gain(&mut self, key: DeltaKey, amount: u64) {
        self.add(key, to_signed(amount));
    }

    /// Add an unsigned loss.
    pub fn lose(&mut self, key: DeltaKey, amount: u64) {
        self.add(key, -to_signed(amount));
    }

    /// Add per-slot gains to home or returning units.
    pub fn gain_units(&mut self, counts: &SlotCounts, returning: bool) {
        for (slot, count) in counts.iter() {
            let key = if returning {
                DeltaKey::UnitsReturning(slot)
            } else {
                DeltaKey::UnitsHome(slot)
            };
            self.gain(key, count);
        }
    }

    /// Add per-slot losses to home or returning units.
    pub fn lose_units(&mut self, counts: &SlotCounts, returning: bool) {
        for (slot, count) in counts.iter() {
            let key = if returning {
                DeltaKey::UnitsReturning(slot)
            } else {
                DeltaKey::UnitsHome(slot)
            };
            self.lose(key, count);
        }
    }

    /// Net change for a counter.
    #[must_use]
    pub fn get(&self, key: DeltaKey) -> i64 {
        self.changes.get(&key).copied().unwrap_or(0)
    }

    /// Fold another delta into this one.
    pub fn merge(&mut self, other: &DominionDelta) {
        for (&key, &amount) in &other.changes {
            self.add(key, amount);
        }
    }

    /// Whether nothing changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Changes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (DeltaKey, i64)> + '_ {
        self.changes.iter().map(|(&k, &v)| (k, v))
    }

    /// Net land change across terrain.
    #[must_use]
    pub fn land_change(&self) -> i64 {
        self.iter()
            .filter(|(key, _)| matches!(key, DeltaKey::Land(_)))
            .map(|(_, v)| v)
            .sum()
    }
}

impl From<Vec<(DeltaKey, i64)>> for DominionDelta {
    fn from(entries: Vec<(DeltaKey, i64)>) -> Self {
        let mut delta = Self::new();
        for (key, amount) in entries {
            delta.add(key, amount);
        }
        delta
    }
}

impl From<DominionDelta> for Vec<(DeltaKey, i64)> {
    fn from(delta: DominionDelta) -> Self {
        delta.changes.into_iter().collect()
    }
}

fn to_signed(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

fn apply_change(current: u64, delta: i64) -> Option<u64> {
    if delta >= 0 {
        current.checked_add(delta.unsigned_abs())
    } else {
        current.checked_sub(delta.unsigned_abs())
    }
}

fn apply_map<K: Ord + Copy>(map: &mut BTreeMap<K, u64>, key: K, delta: i64) -> Option<()> {
    let current = map.get(&key).copied().unwrap_or(0);
    let next = apply_change(current, delta)?;
    if next == 0 {
        map.remove(&key);
    } else {
        map.insert(key, next);
    }
    Some(())
}

impl Dominion {
    /// Merge a delta into this dominion.
    ///
    /// All-or-nothing: if any counter would go negative the dominion is left
    /// untouched and the offending field is reported.
    pub fn apply_delta(&mut self, delta: &DominionDelta) -> Result<(), InvariantViolation> {
        let mut next = self.clone();

        for (key, change) in delta.iter() {
            let current = self.counter(key);
            let violation = || InvariantViolation::NegativeValue {
                dominion: self.id,
                field: key.to_string(),
                current,
                delta: change,
            };

            match key {
                DeltaKey::UnitsHome(slot) => {
                    next.military.home[slot] =
                        apply_change(next.military.home[slot], change).ok_or_else(violation)?;
                }
                DeltaKey::UnitsReturning(slot) => {
                    next.military.returning[slot] = apply_change(next.military.returning[slot], change)
                        .ok_or_else(violation)?;
                }
                DeltaKey::Draftees => {
                    next.military.draftees =
                        apply_change(next.military.draftees, change).ok_or_else(violation)?;
                }
                DeltaKey::Spies => {
                    next.military.spies =
                        apply_change(next.military.spies, change).ok_or_else(violation)?;
                }
                DeltaKey::Wizards => {
                    next.military.wizards =
                        apply_change(next.military.wizards, change).ok_or_else(violation)?;
                }
                DeltaKey::Archmages => {
                    next.military.archmages =
                        apply_change(next.military.archmages, change).ok_or_else(violation)?;
                }
                DeltaKey::Peasants => {
                    next.peasants = apply_change(next.peasants, change).ok_or_else(violation)?;
                }
                DeltaKey::Land(terrain) => {
                    apply_map(&mut next.territory.land, terrain, change).ok_or_else(violation)?;
                }
                DeltaKey::Building(kind) => {
                    apply_map(&mut next.territory.buildings, kind, change).ok_or_else(violation)?;
                }
                DeltaKey::QueuedBuilding(kind) => {
                    apply_map(&mut next.territory.queued, kind, change).ok_or_else(violation)?;
                }
                DeltaKey::Resource(resource) => {
                    apply_map(&mut next.resources, resource, change).ok_or_else(violation)?;
                }
                DeltaKey::Improvement(improvement) => {
                    apply_map(&mut next.improvements, improvement, change).ok_or_else(violation)?;
                }
                DeltaKey::Morale => {
                    let value = apply_change(u64::from(next.morale), change).ok_or_else(violation)?;
                    next.morale = u32::try_from(value).map_err(|_| violation())?;
                }
                DeltaKey::Prestige => {
                    next.prestige = apply_change(next.prestige, change).ok_or_else(violation)?;
                }
                DeltaKey::DiscountedLand => {
                    next.discounted_land =
                        apply_change(next.discounted_land, change).ok_or_else(violation)?;
                }
                DeltaKey::Victories => {
                    let value =
                        apply_change(u64::from(next.victories), change).ok_or_else(violation)?;
                    next.victories = u32::try_from(value).map_err(|_| violation())?;
                }
            }
        }

        #[cfg(feature = "debug-validation")]
        for terrain in Terrain::ALL {
            if next.territory.built_on(terrain) > next.territory.land_of(terrain) {
                return Err(InvariantViolation::Other(format!(
                    "more buildings than land on {} for {}",
                    terrain.name(),
                    self.id
                )));
            }
        }

        *self = next;
        Ok(())
    }

    /// Current value of a counter.
    #[must_use]
    pub fn counter(&self, key: DeltaKey) -> u64 {
        match key {
            DeltaKey::UnitsHome(slot) => self.military.home[slot],
            DeltaKey::UnitsReturning(slot) => self.military.returning[slot],
            DeltaKey::Draftees => self.military.draftees,
            DeltaKey::Spies => self.military.spies,
            DeltaKey::Wizards => self.military.wizards,
            DeltaKey::Archmages => self.military.archmages,
            DeltaKey::Peasants => self.peasants,
            DeltaKey::Land(terrain) => self.territory.land_of(terrain),
            DeltaKey::Building(kind) => self.territory.buildings_of(kind),
            DeltaKey::QueuedBuilding(kind) => self.territory.queued_of(kind),
            DeltaKey::Resource(resource) => self.resource(resource),
            DeltaKey::Improvement(improvement) => self.improvement_points(improvement),
            DeltaKey::Morale => u64::from(self.morale),
            DeltaKey::Prestige => self.prestige,
            DeltaKey::DiscountedLand => self.discounted_land,
            DeltaKey::Victories => u64::from(self.victories),
        }
    }
}
