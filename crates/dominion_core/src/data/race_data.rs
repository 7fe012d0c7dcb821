//! Race data as authored in RON files.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::land::Terrain;
use crate::perks::{PowerPerk, RacePerk, UnitPerk};
use crate::units::{Slot, UnitType};

/// Data-driven race definition.
///
/// # Example RON
///
/// ```ron
/// RaceData(
///     key: "human",
///     name: "Human",
///     home_terrain: Plain,
///     units: [
///         UnitType(slot: 1, name: "Spearman", offense: 3.0, defense: 0.0),
///         UnitType(slot: 2, name: "Archer", offense: 0.0, defense: 3.0),
///         UnitType(slot: 3, name: "Knight", offense: 6.0, defense: 2.0, need_boat: true),
///         UnitType(slot: 4, name: "Cavalry", offense: 0.0, defense: 6.0),
///     ],
///     perks: [Offense(5.0)],
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceData {
    /// Unique key, referenced by dominions and versus-race perks.
    pub key: String,

    /// Display name.
    pub name: String,

    /// Terrain the race builds its home on.
    pub home_terrain: Terrain,

    /// Whether the race earns research points from invasions.
    #[serde(default = "default_uses_research")]
    pub uses_research: bool,

    /// One unit per slot.
    pub units: Vec<UnitType>,

    /// Race-wide perks.
    #[serde(default)]
    pub perks: Vec<RacePerk>,
}

/// Races use research unless stated otherwise.
const fn default_uses_research() -> bool {
    true
}

impl RaceData {
    /// Check internal consistency.
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let slots: BTreeSet<Slot> = self.units.iter().map(|u| u.slot).collect();
        if self.units.len() != Slot::ALL.len() || slots.len() != Slot::ALL.len() {
            return Err(ConfigError::InvalidUnitSlots {
                race: self.key.clone(),
            });
        }

        for unit in &self.units {
            validate_unit(unit)?;
        }

        let mut seen = BTreeSet::new();
        for perk in &self.perks {
            let key = perk.key();
            if !seen.insert(key.clone()) {
                return Err(ConfigError::DuplicateRacePerk {
                    race: self.key.clone(),
                    key,
                });
            }
            validate_race_perk(&self.key, perk)?;
        }

        Ok(())
    }
}

fn validate_unit(unit: &UnitType) -> Result<(), ConfigError> {
    let invalid = |key: String, reason: &str| ConfigError::InvalidPerk {
        owner: unit.name.clone(),
        key,
        reason: reason.to_string(),
    };

    if !unit.offense.is_finite() || !unit.defense.is_finite() {
        return Err(invalid("base_power".to_string(), "power must be finite"));
    }

    let mut seen = BTreeSet::new();
    for perk in &unit.perks {
        let key = perk.key();
        if !seen.insert(key.clone()) {
            return Err(ConfigError::DuplicatePerk {
                unit: unit.name.clone(),
                key,
            });
        }

        match perk {
            UnitPerk::Offense(power) | UnitPerk::Defense(power) => {
                if let Some(cap) = power.ratio_cap() {
                    if cap.ratio == 0.0 || !cap.ratio.is_finite() || !cap.max.is_finite() {
                        return Err(invalid(key, "ratio must be non-zero and finite"));
                    }
                }
                match power {
                    PowerPerk::StaggeredLandRange(bands) => {
                        if bands.is_empty() {
                            return Err(invalid(key, "needs at least one band"));
                        }
                        if bands.windows(2).any(|w| w[0].range >= w[1].range) {
                            return Err(invalid(key, "bands must be in ascending range order"));
                        }
                    }
                    PowerPerk::Pairing { slot, .. } if *slot == unit.slot => {
                        return Err(invalid(key, "unit cannot pair with itself"));
                    }
                    PowerPerk::FromBuilding { buildings, .. }
                    | PowerPerk::VersusBuilding { buildings, .. }
                        if buildings.is_empty() =>
                    {
                        return Err(invalid(key, "needs at least one building"));
                    }
                    _ => {}
                }
            }
            UnitPerk::FixedCasualties { percent, .. } if !(0.0..=100.0).contains(percent) => {
                return Err(invalid(key, "percent must be within 0-100"));
            }
            UnitPerk::Carries { capacity } if *capacity == 0 => {
                return Err(invalid(key, "capacity must be positive"));
            }
            UnitPerk::FewerCasualtiesFromLand { cap, .. }
            | UnitPerk::FewerCasualtiesVersusLand { cap, .. }
                if cap.ratio == 0.0 =>
            {
                return Err(invalid(key, "ratio must be non-zero"));
            }
            _ => {}
        }
    }

    Ok(())
}

fn validate_race_perk(race: &str, perk: &RacePerk) -> Result<(), ConfigError> {
    match perk {
        RacePerk::PowerFromTerritory { cap, .. } if cap.ratio == 0.0 => {
            Err(ConfigError::InvalidPerk {
                owner: race.to_string(),
                key: perk.key(),
                reason: "ratio must be non-zero".to_string(),
            })
        }
        RacePerk::DrafteeDefense(value) if *value < 0.0 => Err(ConfigError::InvalidPerk {
            owner: race.to_string(),
            key: perk.key(),
            reason: "draftee defense cannot be negative".to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::RatioCap;
    use crate::perks::Band;

    fn unit(slot: u8, perks: Vec<UnitPerk>) -> UnitType {
        UnitType {
            slot: Slot::new(slot).unwrap(),
            name: format!("Unit {slot}"),
            offense: 3.0,
            defense: 3.0,
            need_boat: false,
            perks,
        }
    }

    fn race(units: Vec<UnitType>) -> RaceData {
        RaceData {
            key: "test".to_string(),
            name: "Test".to_string(),
            home_terrain: Terrain::Plain,
            uses_research: true,
            units,
            perks: vec![RacePerk::Offense(5.0)],
        }
    }

    fn four(perks: Vec<UnitPerk>) -> Vec<UnitType> {
        vec![
            unit(1, perks),
            unit(2, vec![]),
            unit(3, vec![]),
            unit(4, vec![]),
        ]
    }

    #[test]
    fn test_valid_race() {
        assert!(race(four(vec![UnitPerk::Immortal])).validate().is_ok());
    }

    #[test]
    fn test_missing_slot_rejected() {
        let mut units = four(vec![]);
        units.pop();
        assert!(matches!(
            race(units).validate(),
            Err(ConfigError::InvalidUnitSlots { .. })
        ));
    }

    #[test]
    fn test_duplicate_slot_rejected() {
        let mut units = four(vec![]);
        units[3].slot = Slot::new(1).unwrap();
        assert!(race(units).validate().is_err());
    }

    #[test]
    fn test_duplicate_perk_key_rejected() {
        let perks = vec![
            UnitPerk::Offense(PowerPerk::FromPrestige(RatioCap::new(100.0, 1.0))),
            UnitPerk::Offense(PowerPerk::FromPrestige(RatioCap::new(50.0, 2.0))),
        ];
        assert!(matches!(
            race(four(perks)).validate(),
            Err(ConfigError::DuplicatePerk { .. })
        ));
    }

    #[test]
    fn test_same_perk_on_both_sides_allowed() {
        let perks = vec![
            UnitPerk::Offense(PowerPerk::FromPrestige(RatioCap::new(100.0, 1.0))),
            UnitPerk::Defense(PowerPerk::FromPrestige(RatioCap::new(100.0, 1.0))),
        ];
        assert!(race(four(perks)).validate().is_ok());
    }

    #[test]
    fn test_unordered_bands_rejected() {
        let perks = vec![UnitPerk::Offense(PowerPerk::StaggeredLandRange(vec![
            Band {
                range: 75.0,
                value: 1.0,
            },
            Band {
                range: 60.0,
                value: 0.5,
            },
        ]))];
        assert!(race(four(perks)).validate().is_err());
    }

    #[test]
    fn test_zero_ratio_rejected() {
        let perks = vec![UnitPerk::Defense(PowerPerk::FromLand {
            terrain: Terrain::Forest,
            cap: RatioCap::new(0.0, 2.0),
        })];
        assert!(race(four(perks)).validate().is_err());
    }

    #[test]
    fn test_self_pairing_rejected() {
        let perks = vec![UnitPerk::Offense(PowerPerk::Pairing {
            slot: Slot::new(1).unwrap(),
            value: 1.0,
        })];
        assert!(race(four(perks)).validate().is_err());
    }

    #[test]
    fn test_duplicate_race_perk_rejected() {
        let mut data = race(four(vec![]));
        data.perks.push(RacePerk::Offense(2.0));
        assert!(matches!(
            data.validate(),
            Err(ConfigError::DuplicateRacePerk { .. })
        ));
    }

    #[test]
    fn test_parse_from_ron() {
        let ron_text = r#"
RaceData(
    key: "nox",
    name: "Nox",
    home_terrain: Swamp,
    units: [
        UnitType(slot: 1, name: "Imp", offense: 3.0, defense: 0.0),
        UnitType(slot: 2, name: "Shade", offense: 0.0, defense: 3.0),
        UnitType(slot: 3, name: "Lich", offense: 0.0, defense: 6.0,
            perks: [Defense(FromWizardRatio((ratio: 2.0, max: 2.0)))]),
        UnitType(slot: 4, name: "Nightshade", offense: 6.0, defense: 2.0, need_boat: true,
            perks: [
                Offense(FromLand(terrain: Swamp, cap: (ratio: 10.0, max: 1.5))),
                FixedCasualties(side: Offense, percent: 5.0),
            ]),
    ],
    perks: [Offense(5.0), PowerFromTerritory(side: Defense, terrain: Swamp, cap: (ratio: 20.0, max: 5.0))],
)
"#;
        let data: RaceData = ron::from_str(ron_text).unwrap();
        assert!(data.uses_research);
        assert_eq!(data.units.len(), 4);
        assert_eq!(data.units[3].perks.len(), 2);
        assert!(data.validate().is_ok());
    }
}
