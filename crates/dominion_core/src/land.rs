//! Terrain, buildings and a dominion's territory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::fraction;

/// Terrain types land can be held in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Terrain {
    /// Open plains.
    Plain,
    /// Mountains.
    Mountain,
    /// Swamps.
    Swamp,
    /// Forests.
    Forest,
    /// Hills.
    Hill,
    /// Water.
    Water,
}

impl Terrain {
    /// Every terrain type, in canonical order.
    pub const ALL: [Terrain; 6] = [
        Terrain::Plain,
        Terrain::Mountain,
        Terrain::Swamp,
        Terrain::Forest,
        Terrain::Hill,
        Terrain::Water,
    ];

    /// Lowercase display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Terrain::Plain => "plain",
            Terrain::Mountain => "mountain",
            Terrain::Swamp => "swamp",
            Terrain::Forest => "forest",
            Terrain::Hill => "hill",
            Terrain::Water => "water",
        }
    }
}

/// Building types. Each building occupies one acre of a fixed terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    /// Platinum production.
    Alchemy,
    /// Food production.
    Farm,
    /// Cheaper military.
    Smithy,
    /// Improvement bonus and improvement protection.
    Masonry,
    /// Ore production.
    OreMine,
    /// Offensive power.
    GryphonNest,
    /// Gem production.
    DiamondMine,
    /// Mana production.
    Tower,
    /// Wizard strength.
    WizardGuild,
    /// Reduces the defensive modifiers of invasion targets.
    Temple,
    /// Lumber production.
    Lumberyard,
    /// Houses peasants that help defend.
    ForestHaven,
    /// Cheaper construction.
    Factory,
    /// Defensive power.
    GuardTower,
    /// Fewer casualties.
    Shrine,
    /// Houses military.
    Barracks,
    /// Research.
    School,
    /// Boat production and protection.
    Dock,
}

impl BuildingKind {
    /// Every building type, in canonical order.
    pub const ALL: [BuildingKind; 18] = [
        BuildingKind::Alchemy,
        BuildingKind::Farm,
        BuildingKind::Smithy,
        BuildingKind::Masonry,
        BuildingKind::OreMine,
        BuildingKind::GryphonNest,
        BuildingKind::DiamondMine,
        BuildingKind::Tower,
        BuildingKind::WizardGuild,
        BuildingKind::Temple,
        BuildingKind::Lumberyard,
        BuildingKind::ForestHaven,
        BuildingKind::Factory,
        BuildingKind::GuardTower,
        BuildingKind::Shrine,
        BuildingKind::Barracks,
        BuildingKind::School,
        BuildingKind::Dock,
    ];

    /// Terrain this building is constructed on.
    #[must_use]
    pub const fn terrain(self) -> Terrain {
        match self {
            BuildingKind::Alchemy
            | BuildingKind::Farm
            | BuildingKind::Smithy
            | BuildingKind::Masonry => Terrain::Plain,
            BuildingKind::OreMine | BuildingKind::GryphonNest | BuildingKind::DiamondMine => {
                Terrain::Mountain
            }
            BuildingKind::Tower | BuildingKind::WizardGuild | BuildingKind::Temple => {
                Terrain::Swamp
            }
            BuildingKind::Lumberyard | BuildingKind::ForestHaven => Terrain::Forest,
            BuildingKind::Factory
            | BuildingKind::GuardTower
            | BuildingKind::Shrine
            | BuildingKind::Barracks
            | BuildingKind::School => Terrain::Hill,
            BuildingKind::Dock => Terrain::Water,
        }
    }

    /// Building types constructed on `terrain`.
    pub fn on_terrain(terrain: Terrain) -> impl Iterator<Item = BuildingKind> {
        Self::ALL.into_iter().filter(move |b| b.terrain() == terrain)
    }
}

/// Land, buildings and construction queue of one dominion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Territory {
    /// Acres held per terrain.
    #[serde(default)]
    pub land: BTreeMap<Terrain, u64>,
    /// Completed buildings.
    #[serde(default)]
    pub buildings: BTreeMap<BuildingKind, u64>,
    /// Buildings under construction.
    #[serde(default)]
    pub queued: BTreeMap<BuildingKind, u64>,
}

impl Territory {
    /// Total acres across all terrain.
    #[must_use]
    pub fn total_land(&self) -> u64 {
        self.land.values().sum()
    }

    /// Acres of one terrain.
    #[must_use]
    pub fn land_of(&self, terrain: Terrain) -> u64 {
        self.land.get(&terrain).copied().unwrap_or(0)
    }

    /// Completed buildings of one kind.
    #[must_use]
    pub fn buildings_of(&self, kind: BuildingKind) -> u64 {
        self.buildings.get(&kind).copied().unwrap_or(0)
    }

    /// Queued buildings of one kind.
    #[must_use]
    pub fn queued_of(&self, kind: BuildingKind) -> u64 {
        self.queued.get(&kind).copied().unwrap_or(0)
    }

    /// Completed plus queued buildings on a terrain.
    #[must_use]
    pub fn built_on(&self, terrain: Terrain) -> u64 {
        BuildingKind::on_terrain(terrain)
            .map(|kind| self.buildings_of(kind) + self.queued_of(kind))
            .sum()
    }

    /// Acres of a terrain with neither a building nor construction on them.
    #[must_use]
    pub fn barren_on(&self, terrain: Terrain) -> u64 {
        self.land_of(terrain).saturating_sub(self.built_on(terrain))
    }

    /// Total barren acres.
    #[must_use]
    pub fn total_barren(&self) -> u64 {
        Terrain::ALL.iter().map(|&t| self.barren_on(t)).sum()
    }

    /// Share of total land held as `terrain` (0.0 - 1.0).
    #[must_use]
    pub fn land_fraction(&self, terrain: Terrain) -> f64 {
        fraction(self.land_of(terrain), self.total_land())
    }

    /// Share of total land covered by completed `kind` buildings (0.0 - 1.0).
    #[must_use]
    pub fn building_fraction(&self, kind: BuildingKind) -> f64 {
        fraction(self.buildings_of(kind), self.total_land())
    }

    /// Share of total land that is barren (0.0 - 1.0).
    #[must_use]
    pub fn barren_fraction(&self) -> f64 {
        fraction(self.total_barren(), self.total_land())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn territory() -> Territory {
        let mut t = Territory::default();
        t.land.insert(Terrain::Plain, 100);
        t.land.insert(Terrain::Forest, 100);
        t.buildings.insert(BuildingKind::Farm, 60);
        t.queued.insert(BuildingKind::Alchemy, 10);
        t.buildings.insert(BuildingKind::ForestHaven, 50);
        t
    }

    #[test]
    fn test_every_terrain_has_a_building() {
        for terrain in Terrain::ALL {
            assert!(BuildingKind::on_terrain(terrain).next().is_some());
        }
    }

    #[test]
    fn test_barren_counts_queued_as_built() {
        let t = territory();
        assert_eq!(t.barren_on(Terrain::Plain), 30);
        assert_eq!(t.barren_on(Terrain::Forest), 50);
        assert_eq!(t.total_barren(), 80);
    }

    #[test]
    fn test_fractions() {
        let t = territory();
        assert!((t.land_fraction(Terrain::Plain) - 0.5).abs() < 1e-9);
        assert!((t.building_fraction(BuildingKind::ForestHaven) - 0.25).abs() < 1e-9);
        assert!((t.barren_fraction() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_empty_territory_fractions_are_zero() {
        let t = Territory::default();
        assert_eq!(t.land_fraction(Terrain::Hill), 0.0);
        assert_eq!(t.barren_fraction(), 0.0);
    }
}
