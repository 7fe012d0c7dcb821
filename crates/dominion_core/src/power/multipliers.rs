//! Aggregate power multipliers and the battle-time reductions applied to
//! defense.

use serde::Serialize;

use crate::config::GameConfig;
use crate::dominion::Dominion;
use crate::economy::Improvement;
use crate::effects::{active_definitions, ActiveEffectProvider};
use crate::land::{BuildingKind, Terrain};
use crate::math::RatioCap;
use crate::perks::{RacePerk, Side};
use crate::races::Race;

/// A named source of percentage power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MultiplierSource {
    /// Gryphon nests (offense) or guard towers (defense).
    Buildings,
    /// Forges (offense) or walls (defense).
    Improvement,
    /// Flat racial bonus.
    Racial,
    /// Research.
    Research,
    /// Active effects.
    Spells,
    /// Racial land composition bonus.
    Territory,
    /// Prestige (offense only).
    Prestige,
    /// Attacker temples reducing the defender's total (defense only).
    Temples,
}

impl MultiplierSource {
    /// Label for breakdown output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Buildings => "buildings",
            Self::Improvement => "improvement",
            Self::Racial => "racial",
            Self::Research => "research",
            Self::Spells => "spells",
            Self::Territory => "territory",
            Self::Prestige => "prestige",
            Self::Temples => "temples",
        }
    }
}

/// Masonry boost applied to improvement bonuses.
#[must_use]
pub fn masonry_multiplier(config: &GameConfig, dominion: &Dominion) -> f64 {
    1.0 + dominion.territory.building_fraction(BuildingKind::Masonry)
        * config.masonry_improvement_ratio
}

/// Bonus fraction from an invested improvement.
#[must_use]
pub fn improvement_bonus(
    config: &GameConfig,
    dominion: &Dominion,
    improvement: Improvement,
) -> f64 {
    config.improvement_curve(improvement).map_or(0.0, |curve| {
        curve.bonus(
            dominion.improvement_points(improvement),
            dominion.total_land(),
            masonry_multiplier(config, dominion),
        )
    })
}

/// Named multiplier sources for one side, as fractions.
#[must_use]
pub fn multiplier_sources(
    config: &GameConfig,
    race: &Race,
    effects: &dyn ActiveEffectProvider,
    dominion: &Dominion,
    side: Side,
) -> Vec<(MultiplierSource, f64)> {
    let (building, building_cap, improvement) = match side {
        Side::Offense => (
            BuildingKind::GryphonNest,
            RatioCap::new(config.gryphon_nest_ratio, config.gryphon_nest_max),
            Improvement::Forges,
        ),
        Side::Defense => (
            BuildingKind::GuardTower,
            RatioCap::new(config.guard_tower_ratio, config.guard_tower_max),
            Improvement::Walls,
        ),
    };

    let spells: f64 = active_definitions(&config.effects, effects, dominion.id)
        .map(|effect| effect.power(side))
        .sum();

    let territory: f64 = race
        .perks()
        .iter()
        .map(|perk| match perk {
            RacePerk::PowerFromTerritory {
                side: s,
                terrain,
                cap,
            } if *s == side => cap.apply(dominion.territory.land_fraction(*terrain) * 100.0),
            _ => 0.0,
        })
        .sum();

    let research = match side {
        Side::Offense => dominion.tech.offense,
        Side::Defense => dominion.tech.defense,
    };

    let mut sources = vec![
        (
            MultiplierSource::Buildings,
            building_cap.apply_scaled(dominion.territory.building_fraction(building)),
        ),
        (
            MultiplierSource::Improvement,
            improvement_bonus(config, dominion, improvement),
        ),
        (MultiplierSource::Racial, race.power_percent(side) / 100.0),
        (MultiplierSource::Research, research / 100.0),
        (MultiplierSource::Spells, spells / 100.0),
        (MultiplierSource::Territory, territory / 100.0),
    ];
    if side == Side::Offense {
        sources.push((
            MultiplierSource::Prestige,
            dominion.prestige as f64 / config.prestige_power_divisor,
        ));
    }
    sources
}

/// Share of the target's defensive multiplier removed by the attacker's temples.
///
/// Zero when the target has an active effect that negates temples.
#[must_use]
pub fn temple_reduction(
    config: &GameConfig,
    effects: &dyn ActiveEffectProvider,
    attacker: &Dominion,
    target: &Dominion,
) -> f64 {
    let negated =
        active_definitions(&config.effects, effects, target.id).any(|e| e.negates_temples);
    if negated {
        return 0.0;
    }
    RatioCap::new(config.temple_ratio, config.temple_max)
        .apply_scaled(attacker.territory.building_fraction(BuildingKind::Temple))
}

/// Share of the target's raw defense removed by an active ambush effect.
#[must_use]
pub fn ambush_reduction(
    config: &GameConfig,
    effects: &dyn ActiveEffectProvider,
    attacker: &Dominion,
    target: &Dominion,
) -> f64 {
    let ambushing = active_definitions(&config.effects, effects, attacker.id).any(|e| e.ambush);
    if !ambushing {
        return 0.0;
    }
    RatioCap::new(config.ambush_ratio, config.ambush_max)
        .apply_scaled(target.territory.land_fraction(Terrain::Forest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RaceData;
    use crate::dominion::{DominionId, RealmId, RoundId};
    use crate::effects::{ActiveEffects, EffectDefinition, NoEffects};
    use crate::units::{Slot, UnitType};

    fn race(perks: Vec<RacePerk>) -> Race {
        let units = Slot::ALL
            .iter()
            .map(|&slot| UnitType {
                slot,
                name: format!("u{slot}"),
                offense: 1.0,
                defense: 1.0,
                need_boat: false,
                perks: Vec::new(),
            })
            .collect();
        Race::from_data(RaceData {
            key: "test".to_string(),
            name: "Test".to_string(),
            home_terrain: Terrain::Plain,
            uses_research: true,
            units,
            perks,
        })
        .unwrap()
    }

    fn dominion(id: u64) -> Dominion {
        let mut d = Dominion::new(DominionId(id), "D", "test", RealmId(1), RoundId(1));
        d.territory.land.insert(Terrain::Plain, 500);
        d.territory.land.insert(Terrain::Mountain, 300);
        d.territory.land.insert(Terrain::Forest, 200);
        d.prestige = 500;
        d
    }

    fn source(sources: &[(MultiplierSource, f64)], which: MultiplierSource) -> f64 {
        sources
            .iter()
            .find(|(s, _)| *s == which)
            .map_or(0.0, |(_, v)| *v)
    }

    #[test]
    fn test_gryphon_nests_capped() {
        let config = GameConfig::default();
        let mut d = dominion(1);
        d.territory.buildings.insert(BuildingKind::GryphonNest, 100);
        let sources = multiplier_sources(&config, &race(vec![]), &NoEffects, &d, Side::Offense);
        assert!((source(&sources, MultiplierSource::Buildings) - 0.16).abs() < 1e-9);

        d.territory.buildings.insert(BuildingKind::GryphonNest, 300);
        let sources = multiplier_sources(&config, &race(vec![]), &NoEffects, &d, Side::Offense);
        assert!((source(&sources, MultiplierSource::Buildings) - 0.32).abs() < 1e-9);
    }

    #[test]
    fn test_prestige_only_on_offense() {
        let config = GameConfig::default();
        let d = dominion(1);
        let offense = multiplier_sources(&config, &race(vec![]), &NoEffects, &d, Side::Offense);
        let defense = multiplier_sources(&config, &race(vec![]), &NoEffects, &d, Side::Defense);
        assert!((source(&offense, MultiplierSource::Prestige) - 0.05).abs() < 1e-9);
        assert_eq!(source(&defense, MultiplierSource::Prestige), 0.0);
    }

    #[test]
    fn test_racial_and_territory() {
        let config = GameConfig::default();
        let d = dominion(1);
        let r = race(vec![
            RacePerk::Defense(5.0),
            RacePerk::PowerFromTerritory {
                side: Side::Defense,
                terrain: Terrain::Mountain,
                cap: RatioCap::new(5.0, 10.0),
            },
        ]);
        let sources = multiplier_sources(&config, &r, &NoEffects, &d, Side::Defense);
        assert!((source(&sources, MultiplierSource::Racial) - 0.05).abs() < 1e-9);
        assert!((source(&sources, MultiplierSource::Territory) - 0.06).abs() < 1e-9);
    }

    #[test]
    fn test_spells_from_catalog() {
        let mut config = GameConfig::default();
        let mut howling = EffectDefinition::new("howling");
        howling.offense = 10.0;
        config.effects.push(howling);

        let d = dominion(1);
        let mut effects = ActiveEffects::new();
        effects.activate(d.id, "howling", d.id);
        let sources = multiplier_sources(&config, &race(vec![]), &effects, &d, Side::Offense);
        assert!((source(&sources, MultiplierSource::Spells) - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_temple_reduction_and_negation() {
        let mut config = GameConfig::default();
        let mut fool = EffectDefinition::new("fools_gold");
        fool.negates_temples = true;
        config.effects.push(fool);

        let mut attacker = dominion(1);
        attacker.territory.buildings.insert(BuildingKind::Temple, 100);
        let target = dominion(2);

        let reduction = temple_reduction(&config, &NoEffects, &attacker, &target);
        assert!((reduction - 0.18).abs() < 1e-9);

        let mut effects = ActiveEffects::new();
        effects.activate(target.id, "fools_gold", target.id);
        assert_eq!(temple_reduction(&config, &effects, &attacker, &target), 0.0);
    }

    #[test]
    fn test_ambush_requires_effect() {
        let mut config = GameConfig::default();
        let mut ambush = EffectDefinition::new("ambush");
        ambush.ambush = true;
        config.effects.push(ambush);

        let attacker = dominion(1);
        let target = dominion(2);
        assert_eq!(ambush_reduction(&config, &NoEffects, &attacker, &target), 0.0);

        let mut effects = ActiveEffects::new();
        effects.activate(attacker.id, "ambush", attacker.id);
        // 20% forest * 0.2
        assert!((ambush_reduction(&config, &effects, &attacker, &target) - 0.04).abs() < 1e-9);
    }
}
