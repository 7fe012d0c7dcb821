//! The dominion entity: one player's persistent state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::economy::{Improvement, Resource, TechPerks};
use crate::land::Territory;
use crate::math::fraction;
use crate::units::{Slot, SlotCounts};

/// Unique identifier for a dominion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DominionId(pub u64);

impl std::fmt::Display for DominionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Realm (team) a dominion plays in. Realm-mates cannot invade each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RealmId(pub u32);

/// Alliance between realms. Allied hits earn no prestige, research or
/// generated land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AllianceId(pub u32);

/// Round identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoundId(pub u32);

/// Military population of a dominion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Military {
    /// Drafted peasants, available for defense.
    #[serde(default)]
    pub draftees: u64,
    /// Trained units at home per slot.
    #[serde(default)]
    pub home: SlotCounts,
    /// Units on their way back from an invasion.
    #[serde(default)]
    pub returning: SlotCounts,
    /// Spies.
    #[serde(default)]
    pub spies: u64,
    /// Wizards.
    #[serde(default)]
    pub wizards: u64,
    /// Archmages, each counting as a wizard for wizard ratio.
    #[serde(default)]
    pub archmages: u64,
}

impl Military {
    /// All military headcount at home, including draftees and operatives.
    #[must_use]
    pub fn headcount(&self) -> u64 {
        self.draftees + self.home.total() + self.spies + self.wizards + self.archmages
    }

    /// Units at home in a slot.
    #[must_use]
    pub fn at_home(&self, slot: Slot) -> u64 {
        self.home[slot]
    }
}

/// A player's persistent game state.
///
/// Mutated only through validated actions (see [`crate::delta`]) or by the
/// tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dominion {
    /// Identifier.
    pub id: DominionId,
    /// Display name.
    pub name: String,
    /// Race key.
    pub race: String,
    /// Realm.
    pub realm: RealmId,
    /// Alliance, if the realm is in one.
    #[serde(default)]
    pub alliance: Option<AllianceId>,
    /// Round.
    pub round: RoundId,
    /// Remaining protection ticks. Protected dominions cannot attack or be attacked.
    #[serde(default)]
    pub protection_ticks: u32,
    /// Land and buildings.
    #[serde(default)]
    pub territory: Territory,
    /// Peasant population.
    #[serde(default)]
    pub peasants: u64,
    /// Military population.
    #[serde(default)]
    pub military: Military,
    /// Resource stockpiles.
    #[serde(default)]
    pub resources: BTreeMap<Resource, u64>,
    /// Points invested per improvement.
    #[serde(default)]
    pub improvements: BTreeMap<Improvement, u64>,
    /// Morale, 0 and up; 100 is the soft ceiling.
    pub morale: u32,
    /// Prestige.
    #[serde(default)]
    pub prestige: u64,
    /// Successful invasions at 75%+ range.
    #[serde(default)]
    pub victories: u32,
    /// Acres that can be rebuilt at a discount.
    #[serde(default)]
    pub discounted_land: u64,
    /// Research bonuses.
    #[serde(default)]
    pub tech: TechPerks,
}

impl Dominion {
    /// Soft morale ceiling.
    pub const MORALE_CEILING: u32 = 100;

    /// Create a dominion with no land, population or military.
    #[must_use]
    pub fn new(
        id: DominionId,
        name: impl Into<String>,
        race: impl Into<String>,
        realm: RealmId,
        round: RoundId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            race: race.into(),
            realm,
            alliance: None,
            round,
            protection_ticks: 0,
            territory: Territory::default(),
            peasants: 0,
            military: Military::default(),
            resources: BTreeMap::new(),
            improvements: BTreeMap::new(),
            morale: Self::MORALE_CEILING,
            prestige: 250,
            victories: 0,
            discounted_land: 0,
            tech: TechPerks::default(),
        }
    }

    /// Total acres.
    #[must_use]
    pub fn total_land(&self) -> u64 {
        self.territory.total_land()
    }

    /// Peasants plus all military, home and returning.
    #[must_use]
    pub fn population(&self) -> u64 {
        self.peasants + self.military.headcount() + self.military.returning.total()
    }

    /// Stockpiled amount of a resource.
    #[must_use]
    pub fn resource(&self, resource: Resource) -> u64 {
        self.resources.get(&resource).copied().unwrap_or(0)
    }

    /// Points invested in an improvement.
    #[must_use]
    pub fn improvement_points(&self, improvement: Improvement) -> u64 {
        self.improvements.get(&improvement).copied().unwrap_or(0)
    }

    /// Whether the dominion is under protection.
    #[must_use]
    pub const fn is_protected(&self) -> bool {
        self.protection_ticks > 0
    }

    /// Wizards (including archmages) per acre.
    #[must_use]
    pub fn wizard_ratio(&self) -> f64 {
        fraction(
            self.military.wizards + self.military.archmages,
            self.total_land(),
        )
    }

    /// Spies per acre.
    #[must_use]
    pub fn spy_ratio(&self) -> f64 {
        fraction(self.military.spies, self.total_land())
    }

    /// Whether both dominions are in the same alliance.
    #[must_use]
    pub fn is_allied_with(&self, other: &Dominion) -> bool {
        match (self.alliance, other.alliance) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::land::Terrain;

    fn dominion() -> Dominion {
        let mut d = Dominion::new(DominionId(1), "Test", "human", RealmId(1), RoundId(1));
        d.territory.land.insert(Terrain::Plain, 200);
        d.military.wizards = 30;
        d.military.archmages = 10;
        d.military.spies = 50;
        d
    }

    #[test]
    fn test_ratios() {
        let d = dominion();
        assert!((d.wizard_ratio() - 0.2).abs() < 1e-9);
        assert!((d.spy_ratio() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_alliance() {
        let mut a = dominion();
        let mut b = dominion();
        assert!(!a.is_allied_with(&b));
        a.alliance = Some(AllianceId(3));
        b.alliance = Some(AllianceId(3));
        assert!(a.is_allied_with(&b));
    }

    #[test]
    fn test_population_counts_returning() {
        let mut d = dominion();
        d.peasants = 1000;
        d.military.returning = SlotCounts::new([10, 0, 0, 0]);
        assert_eq!(d.population(), 1000 + 90 + 10);
    }
}
