//! Test fixtures and helpers.
//!
//! Pre-built races, dominions and worlds for consistent testing. Stats are
//! round numbers so expected power totals can be worked out by hand.

use dominion_core::config::{GameConfig, RoundInfo};
use dominion_core::data::RaceData;
use dominion_core::dominion::{AllianceId, Dominion, DominionId, RealmId, RoundId};
use dominion_core::economy::{Improvement, Resource};
use dominion_core::invasion::UnitOrder;
use dominion_core::land::{BuildingKind, Terrain};
use dominion_core::perks::{RacePerk, UnitPerk};
use dominion_core::races::RaceRegistry;
use dominion_core::units::{Slot, SlotCounts, UnitType};
use dominion_core::world::InMemoryWorld;

/// Tick the fixture round is at. Far enough from zero for recency windows.
pub const FIXTURE_TICK: u64 = 100;

fn unit(slot: u8, name: &str, offense: f64, defense: f64, perks: Vec<UnitPerk>) -> UnitType {
    UnitType {
        slot: Slot::new(slot).unwrap_or(Slot::ALL[0]),
        name: name.to_string(),
        offense,
        defense,
        need_boat: false,
        perks,
    }
}

/// Plain race: a 10 OP attacker, a 3 DP defender and two hybrids.
#[must_use]
pub fn human() -> RaceData {
    RaceData {
        key: "human".to_string(),
        name: "Human".to_string(),
        home_terrain: Terrain::Plain,
        uses_research: true,
        units: vec![
            unit(1, "Soldier", 10.0, 0.0, vec![]),
            unit(2, "Guard", 0.0, 3.0, vec![]),
            unit(3, "Knight", 6.0, 3.0, vec![]),
            unit(4, "Cavalry", 6.0, 2.0, vec![UnitPerk::FasterReturn { ticks: 3 }]),
        ],
        perks: vec![],
    }
}

/// Seafaring race with boats, carriers and peasant burning.
#[must_use]
pub fn orc() -> RaceData {
    let mut raider = unit(
        1,
        "Raider",
        8.0,
        0.0,
        vec![UnitPerk::BurnsPeasants { per_unit: 0.5 }],
    );
    raider.need_boat = true;
    RaceData {
        key: "orc".to_string(),
        name: "Orc".to_string(),
        home_terrain: Terrain::Hill,
        uses_research: false,
        units: vec![
            raider,
            unit(2, "Wall", 0.0, 3.0, vec![]),
            unit(3, "Wagon", 2.0, 1.0, vec![UnitPerk::Carries { capacity: 2 }]),
            unit(
                4,
                "Troll",
                7.0,
                2.0,
                vec![
                    UnitPerk::NeedsCarrier,
                    UnitPerk::SinksBoats {
                        side: dominion_core::perks::Side::Offense,
                        per_unit: 0.1,
                    },
                ],
            ),
        ],
        perks: vec![RacePerk::PrestigeGain(10.0)],
    }
}

/// Race whose ghouls raise the fallen and whose spirits never die.
#[must_use]
pub fn undead() -> RaceData {
    RaceData {
        key: "undead".to_string(),
        name: "Undead".to_string(),
        home_terrain: Terrain::Swamp,
        uses_research: true,
        units: vec![
            unit(1, "Skeleton", 4.0, 1.0, vec![]),
            unit(2, "Ghost", 0.0, 3.0, vec![UnitPerk::Immortal]),
            unit(
                3,
                "Banshee",
                5.0,
                0.0,
                vec![UnitPerk::DamagesImprovements {
                    per_unit: 10.0,
                    improvements: vec![Improvement::Walls, Improvement::Towers],
                }],
            ),
            unit(
                4,
                "Ghoul",
                5.0,
                0.0,
                vec![UnitPerk::ConvertsTo {
                    slot: Slot::ALL[0],
                }],
            ),
        ],
        perks: vec![RacePerk::SoulHarvest(1.0)],
    }
}

/// Raiding race: every attacker carries something home.
#[must_use]
pub fn goblin() -> RaceData {
    RaceData {
        key: "goblin".to_string(),
        name: "Goblin".to_string(),
        home_terrain: Terrain::Hill,
        uses_research: true,
        units: vec![
            unit(
                1,
                "Thief",
                10.0,
                0.0,
                vec![UnitPerk::Plunders {
                    resource: Resource::Platinum,
                    per_unit: 2.0,
                }],
            ),
            unit(2, "Guard", 0.0, 3.0, vec![]),
            unit(
                3,
                "Hobgoblin",
                10.0,
                0.0,
                vec![
                    UnitPerk::Plunders {
                        resource: Resource::Gems,
                        per_unit: 1.0,
                    },
                    UnitPerk::EatsPeasants { per_unit: 0.5 },
                ],
            ),
            unit(
                4,
                "Wolf Rider",
                10.0,
                0.0,
                vec![
                    UnitPerk::Plunders {
                        resource: Resource::Boats,
                        per_unit: 1.0,
                    },
                    UnitPerk::SinksBoats {
                        side: dominion_core::perks::Side::Offense,
                        per_unit: 1.0,
                    },
                ],
            ),
        ],
        perks: vec![],
    }
}

/// Registry with every fixture race.
#[must_use]
pub fn races() -> RaceRegistry {
    let mut registry = RaceRegistry::new();
    for data in [human(), orc(), undead(), goblin()] {
        if let Err(e) = registry.insert(data) {
            panic!("fixture race rejected: {e}");
        }
    }
    registry
}

/// A started round at [`FIXTURE_TICK`].
#[must_use]
pub fn round() -> RoundInfo {
    RoundInfo {
        id: RoundId(1),
        started: true,
        offense_disabled: false,
        start_tick: 0,
        current_tick: FIXTURE_TICK,
    }
}

/// Builder for test dominions.
///
/// Defaults: round 1, realm equal to the id, 100 morale, no prestige, no
/// land, no units.
#[derive(Debug, Clone)]
pub struct DominionBuilder {
    dominion: Dominion,
}

impl DominionBuilder {
    /// Start a dominion of `race`.
    #[must_use]
    pub fn new(id: u64, race: &str) -> Self {
        let mut dominion = Dominion::new(
            DominionId(id),
            format!("Dominion {id}"),
            race,
            RealmId(id as u32),
            RoundId(1),
        );
        dominion.prestige = 0;
        Self { dominion }
    }

    /// Display name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.dominion.name = name.to_string();
        self
    }

    /// Add barren acres of a terrain.
    #[must_use]
    pub fn land(mut self, terrain: Terrain, acres: u64) -> Self {
        *self.dominion.territory.land.entry(terrain).or_default() += acres;
        self
    }

    /// Add completed buildings. The land must already be there.
    #[must_use]
    pub fn building(mut self, kind: BuildingKind, count: u64) -> Self {
        *self.dominion.territory.buildings.entry(kind).or_default() += count;
        self
    }

    /// Units at home per slot.
    #[must_use]
    pub fn units(mut self, counts: [u64; 4]) -> Self {
        self.dominion.military.home = SlotCounts::new(counts);
        self
    }

    /// Units returning per slot.
    #[must_use]
    pub fn returning(mut self, counts: [u64; 4]) -> Self {
        self.dominion.military.returning = SlotCounts::new(counts);
        self
    }

    /// Draftees.
    #[must_use]
    pub fn draftees(mut self, draftees: u64) -> Self {
        self.dominion.military.draftees = draftees;
        self
    }

    /// Peasants.
    #[must_use]
    pub fn peasants(mut self, peasants: u64) -> Self {
        self.dominion.peasants = peasants;
        self
    }

    /// Morale.
    #[must_use]
    pub fn morale(mut self, morale: u32) -> Self {
        self.dominion.morale = morale;
        self
    }

    /// Prestige.
    #[must_use]
    pub fn prestige(mut self, prestige: u64) -> Self {
        self.dominion.prestige = prestige;
        self
    }

    /// Realm.
    #[must_use]
    pub fn realm(mut self, realm: u32) -> Self {
        self.dominion.realm = RealmId(realm);
        self
    }

    /// Alliance.
    #[must_use]
    pub fn alliance(mut self, alliance: u32) -> Self {
        self.dominion.alliance = Some(AllianceId(alliance));
        self
    }

    /// Round.
    #[must_use]
    pub fn round(mut self, round: u32) -> Self {
        self.dominion.round = RoundId(round);
        self
    }

    /// Protection ticks left.
    #[must_use]
    pub fn protection(mut self, ticks: u32) -> Self {
        self.dominion.protection_ticks = ticks;
        self
    }

    /// Resource stockpile.
    #[must_use]
    pub fn resource(mut self, resource: Resource, amount: u64) -> Self {
        self.dominion.resources.insert(resource, amount);
        self
    }

    /// Invested improvement points.
    #[must_use]
    pub fn improvement(mut self, improvement: Improvement, points: u64) -> Self {
        self.dominion.improvements.insert(improvement, points);
        self
    }

    /// Finish.
    #[must_use]
    pub fn build(self) -> Dominion {
        self.dominion
    }
}

/// Attacker with 600 plain acres, 100 soldiers (1000 OP) and 1000 guards
/// (3000 DP) at home.
#[must_use]
pub fn attacker() -> Dominion {
    DominionBuilder::new(1, "human")
        .name("Aria")
        .land(Terrain::Plain, 600)
        .units([100, 1000, 0, 0])
        .peasants(10_000)
        .build()
}

/// Human defender of `acres` plain land with 300 guards (900 DP).
#[must_use]
pub fn defender(id: u64, acres: u64) -> Dominion {
    DominionBuilder::new(id, "human")
        .name("Brom")
        .land(Terrain::Plain, acres)
        .units([0, 300, 0, 0])
        .peasants(5_000)
        .prestige(250)
        .build()
}

/// Sparse order from `(slot, quantity)` pairs.
#[must_use]
pub fn order(pairs: &[(u8, i64)]) -> UnitOrder {
    pairs.iter().copied().collect()
}

/// World holding the fixture races, a started round and `dominions`.
#[must_use]
pub fn world(dominions: impl IntoIterator<Item = Dominion>) -> InMemoryWorld {
    let mut world = InMemoryWorld::new(GameConfig::default(), races(), round());
    for dominion in dominions {
        world.insert(dominion);
    }
    world
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_races_load() {
        let registry = races();
        assert_eq!(registry.len(), 4);
        assert!(registry.get("undead").unwrap().converts());
        assert!(!registry.get("goblin").unwrap().converts());
    }

    #[test]
    fn test_builder_defaults() {
        let d = DominionBuilder::new(7, "human").land(Terrain::Hill, 50).build();
        assert_eq!(d.realm, RealmId(7));
        assert_eq!(d.prestige, 0);
        assert_eq!(d.total_land(), 50);
    }
}
