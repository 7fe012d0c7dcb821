//! Resolved races and the race registry.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::data::RaceData;
use crate::error::ConfigError;
use crate::land::Terrain;
use crate::perks::{RacePerk, Side, UnitPerk};
use crate::units::{Slot, UnitType, SLOT_COUNT};

/// A validated race with units indexed by slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Race {
    /// Unique key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Home terrain.
    pub home_terrain: Terrain,
    /// Whether invasions earn research points.
    pub uses_research: bool,
    units: [UnitType; SLOT_COUNT],
    perks: Vec<RacePerk>,
}

impl Race {
    /// Validate race data and index its units by slot.
    pub fn from_data(data: RaceData) -> Result<Self, ConfigError> {
        data.validate()?;

        let mut units = data.units;
        units.sort_by_key(|u| u.slot);
        let units: [UnitType; SLOT_COUNT] =
            units
                .try_into()
                .map_err(|_| ConfigError::InvalidUnitSlots {
                    race: data.key.clone(),
                })?;

        Ok(Self {
            key: data.key,
            name: data.name,
            home_terrain: data.home_terrain,
            uses_research: data.uses_research,
            units,
            perks: data.perks,
        })
    }

    /// Unit type in a slot.
    #[must_use]
    pub fn unit(&self, slot: Slot) -> &UnitType {
        &self.units[slot.index()]
    }

    /// All unit types in slot order.
    pub fn units(&self) -> impl Iterator<Item = &UnitType> {
        self.units.iter()
    }

    /// Race-wide perks.
    #[must_use]
    pub fn perks(&self) -> &[RacePerk] {
        &self.perks
    }

    /// Whether the race has a perk matching the predicate.
    pub fn has_perk(&self, f: impl Fn(&RacePerk) -> bool) -> bool {
        self.perks.iter().any(f)
    }

    /// Flat power percentage for a side.
    #[must_use]
    pub fn power_percent(&self, side: Side) -> f64 {
        self.perks
            .iter()
            .map(|perk| match (perk, side) {
                (RacePerk::Offense(v), Side::Offense) | (RacePerk::Defense(v), Side::Defense) => *v,
                _ => 0.0,
            })
            .sum()
    }

    /// Sum of a scalar race perk selected by `f`.
    pub fn scalar(&self, f: impl Fn(&RacePerk) -> Option<f64>) -> f64 {
        self.perks.iter().filter_map(f).sum()
    }

    /// Whether units of this race kill in battle.
    #[must_use]
    pub fn kills(&self) -> bool {
        !self.has_perk(|p| matches!(p, RacePerk::DoesNotKill))
    }

    /// Whether any unit converts casualties.
    #[must_use]
    pub fn converts(&self) -> bool {
        self.units()
            .any(|u| u.has_perk(|p| matches!(p, UnitPerk::ConvertsTo { .. })))
    }
}

/// Registry of loaded races keyed by race key.
#[derive(Debug, Clone, Default)]
pub struct RaceRegistry {
    races: BTreeMap<String, Race>,
}

impl RaceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            races: BTreeMap::new(),
        }
    }

    /// Validate and register a race. Replaces an existing race with the same key.
    pub fn insert(&mut self, data: RaceData) -> Result<&Race, ConfigError> {
        let race = Race::from_data(data)?;
        let key = race.key.clone();
        self.races.insert(key.clone(), race);
        self.get(&key)
    }

    /// Look up a race.
    pub fn get(&self, key: &str) -> Result<&Race, ConfigError> {
        self.races
            .get(key)
            .ok_or_else(|| ConfigError::UnknownRace(key.to_string()))
    }

    /// Whether a race is registered.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.races.contains_key(key)
    }

    /// Registered race keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.races.keys().map(String::as_str)
    }

    /// Number of registered races.
    #[must_use]
    pub fn len(&self) -> usize {
        self.races.len()
    }

    /// Whether no race is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.races.is_empty()
    }

    /// Load one race from a RON file.
    pub fn load_from_file(&mut self, path: &Path) -> Result<String, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let data: RaceData = ron::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let race = self.insert(data)?;
        Ok(race.key.clone())
    }

    /// Load every `.ron` race in a directory.
    ///
    /// Files that fail to load are logged and skipped; the returned list holds
    /// the keys that loaded.
    pub fn load_from_directory(&mut self, dir: &Path) -> Result<Vec<String>, ConfigError> {
        if !dir.exists() {
            return Err(ConfigError::DirectoryNotFound(dir.display().to_string()));
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| ConfigError::Io {
            path: dir.display().to_string(),
            message: e.to_string(),
        })? {
            let entry = entry.map_err(|e| ConfigError::Io {
                path: dir.display().to_string(),
                message: e.to_string(),
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "ron") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut loaded = Vec::new();
        for path in paths {
            match self.load_from_file(&path) {
                Ok(key) => loaded.push(key),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to load race");
                }
            }
        }

        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(key: &str) -> RaceData {
        let units = Slot::ALL
            .iter()
            .map(|&slot| UnitType {
                slot,
                name: format!("{key} {slot}"),
                offense: f64::from(slot.number()),
                defense: 1.0,
                need_boat: false,
                perks: Vec::new(),
            })
            .rev()
            .collect();
        RaceData {
            key: key.to_string(),
            name: key.to_uppercase(),
            home_terrain: Terrain::Hill,
            uses_research: true,
            units,
            perks: vec![RacePerk::Offense(5.0), RacePerk::DoesNotKill],
        }
    }

    #[test]
    fn test_units_indexed_by_slot() {
        let race = Race::from_data(data("dwarf")).unwrap();
        for slot in Slot::ALL {
            assert_eq!(race.unit(slot).slot, slot);
        }
        assert_eq!(race.unit(Slot::ALL[3]).offense, 4.0);
    }

    #[test]
    fn test_race_perk_helpers() {
        let race = Race::from_data(data("dwarf")).unwrap();
        assert_eq!(race.power_percent(Side::Offense), 5.0);
        assert_eq!(race.power_percent(Side::Defense), 0.0);
        assert!(!race.kills());
        assert!(!race.converts());
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = RaceRegistry::new();
        registry.insert(data("dwarf")).unwrap();
        assert!(registry.contains("dwarf"));
        assert!(registry.get("goblin").is_err());
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["dwarf"]);
    }

    #[test]
    fn test_missing_directory() {
        let mut registry = RaceRegistry::new();
        let result = registry.load_from_directory(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(ConfigError::DirectoryNotFound(_))));
    }
}
