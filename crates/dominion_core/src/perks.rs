//! Closed perk catalog.
//!
//! Perks are data-driven modifiers attached to unit types and races. Each
//! variant carries a typed payload (scalar, [`RatioCap`] pair or ordered
//! [`Band`] list) and is checked once when race data is loaded, so formulas
//! never have to interpret raw strings.

use serde::{Deserialize, Serialize};

use crate::economy::{Improvement, Resource};
use crate::land::{BuildingKind, Terrain};
use crate::math::RatioCap;
use crate::units::Slot;

/// Which side of a battle a value applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The invading force.
    Offense,
    /// The dominion being invaded.
    Defense,
}

impl Side {
    /// The other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Offense => Side::Defense,
            Side::Defense => Side::Offense,
        }
    }

    /// Suffix used in perk keys.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Side::Offense => "offense",
            Side::Defense => "defense",
        }
    }
}

/// One step of a staggered land-range perk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Minimum relative size in percent for this band.
    pub range: f64,
    /// Power added per unit when this band is the last one matched.
    pub value: f64,
}

/// Per-unit power contribution, evaluated for offense or defense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PowerPerk {
    /// `+1` per `ratio`% of own land that is `terrain`.
    FromLand {
        /// Terrain counted.
        terrain: Terrain,
        /// Ratio and cap.
        cap: RatioCap,
    },
    /// `+1` per `ratio`% of own land covered by any of `buildings`.
    FromBuilding {
        /// Buildings counted.
        buildings: Vec<BuildingKind>,
        /// Ratio and cap.
        cap: RatioCap,
    },
    /// `+ratio` per wizard per acre.
    FromWizardRatio(RatioCap),
    /// `+ratio` per wizard per acre, after wizard strength bonuses.
    FromImprovedWizardRatio(RatioCap),
    /// `+ratio` per spy per acre.
    FromSpyRatio(RatioCap),
    /// `+ratio` per spy per acre, after spy strength bonuses.
    FromImprovedSpyRatio(RatioCap),
    /// `+1` per `ratio` prestige.
    FromPrestige(RatioCap),
    /// `+1` per `ratio` hours since the round started.
    FromRoundHours(RatioCap),
    /// `+1` per `ratio` victories.
    FromVictories(RatioCap),
    /// `+1` per `ratio` of a stockpiled resource.
    FromResource {
        /// Resource counted.
        resource: Resource,
        /// Ratio and cap.
        cap: RatioCap,
    },
    /// Flat bonus against a specific opposing race.
    VersusRace {
        /// Opposing race key.
        race: String,
        /// Power added per unit.
        value: f64,
    },
    /// `+1` per `ratio`% of the opponent's land covered by `buildings`.
    VersusBuilding {
        /// Buildings counted on the opponent.
        buildings: Vec<BuildingKind>,
        /// Ratio and cap.
        cap: RatioCap,
    },
    /// `+1` per `ratio`% of the opponent's land that is `terrain`.
    VersusLand {
        /// Terrain counted on the opponent.
        terrain: Terrain,
        /// Ratio and cap.
        cap: RatioCap,
    },
    /// `+1` per `ratio`% of the opponent's land that is barren.
    VersusBarrenLand(RatioCap),
    /// `+1` per `ratio` opponent prestige.
    VersusPrestige(RatioCap),
    /// `+1` per `ratio` of an opponent's stockpiled resource.
    VersusResource {
        /// Resource counted on the opponent.
        resource: Resource,
        /// Ratio and cap.
        cap: RatioCap,
    },
    /// Bonus shared by up to as many units as there are paired units.
    ///
    /// The total `value × min(paired, quantity)` is added once for the unit
    /// type and spread across its quantity.
    Pairing {
        /// Slot of the partner unit.
        slot: Slot,
        /// Power added per paired unit.
        value: f64,
    },
    /// Bonus when own committed headcount exceeds the opponent's.
    MobOutnumbering {
        /// Power added per unit.
        value: f64,
    },
    /// Bonus when own committed headcount is below the opponent's.
    MobOutnumbered {
        /// Power added per unit.
        value: f64,
    },
    /// Bonus picked from the last band whose range the land ratio reaches.
    StaggeredLandRange(Vec<Band>),
}

impl PowerPerk {
    /// Key used for uniqueness checks and breakdown labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            PowerPerk::FromLand { .. } => "from_land",
            PowerPerk::FromBuilding { .. } => "from_building",
            PowerPerk::FromWizardRatio(_) => "from_wizard_ratio",
            PowerPerk::FromImprovedWizardRatio(_) => "from_improved_wizard_ratio",
            PowerPerk::FromSpyRatio(_) => "from_spy_ratio",
            PowerPerk::FromImprovedSpyRatio(_) => "from_improved_spy_ratio",
            PowerPerk::FromPrestige(_) => "from_prestige",
            PowerPerk::FromRoundHours(_) => "from_round_hours",
            PowerPerk::FromVictories(_) => "from_victories",
            PowerPerk::FromResource { .. } => "from_resource",
            PowerPerk::VersusRace { .. } => "vs_race",
            PowerPerk::VersusBuilding { .. } => "vs_building",
            PowerPerk::VersusLand { .. } => "vs_land",
            PowerPerk::VersusBarrenLand(_) => "vs_barren_land",
            PowerPerk::VersusPrestige(_) => "vs_prestige",
            PowerPerk::VersusResource { .. } => "vs_resource",
            PowerPerk::Pairing { .. } => "pairing",
            PowerPerk::MobOutnumbering { .. } => "mob_outnumbering",
            PowerPerk::MobOutnumbered { .. } => "mob_outnumbered",
            PowerPerk::StaggeredLandRange(_) => "staggered_land_range",
        }
    }

    /// Every ratio/cap pair carried by this perk.
    #[must_use]
    pub fn ratio_cap(&self) -> Option<RatioCap> {
        match self {
            PowerPerk::FromLand { cap, .. }
            | PowerPerk::FromBuilding { cap, .. }
            | PowerPerk::FromResource { cap, .. }
            | PowerPerk::VersusBuilding { cap, .. }
            | PowerPerk::VersusLand { cap, .. }
            | PowerPerk::VersusResource { cap, .. } => Some(*cap),
            PowerPerk::FromWizardRatio(cap)
            | PowerPerk::FromImprovedWizardRatio(cap)
            | PowerPerk::FromSpyRatio(cap)
            | PowerPerk::FromImprovedSpyRatio(cap)
            | PowerPerk::FromPrestige(cap)
            | PowerPerk::FromRoundHours(cap)
            | PowerPerk::FromVictories(cap)
            | PowerPerk::VersusBarrenLand(cap)
            | PowerPerk::VersusPrestige(cap) => Some(*cap),
            _ => None,
        }
    }
}

/// Perks attached to a unit type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitPerk {
    /// Offensive power contribution.
    Offense(PowerPerk),
    /// Defensive power contribution.
    Defense(PowerPerk),
    /// Loses a flat percentage of units, ignoring every other modifier.
    FixedCasualties {
        /// Side it applies to.
        side: Side,
        /// Percent of units lost.
        percent: f64,
    },
    /// Reduces casualties by a percentage.
    FewerCasualties {
        /// Side it applies to.
        side: Side,
        /// Percent reduction.
        percent: f64,
    },
    /// Reduces casualties based on own land composition (percent).
    FewerCasualtiesFromLand {
        /// Side it applies to.
        side: Side,
        /// Own terrain counted.
        terrain: Terrain,
        /// Ratio and cap, in percent reduction.
        cap: RatioCap,
    },
    /// Reduces casualties based on the opponent's land composition (percent).
    FewerCasualtiesVersusLand {
        /// Side it applies to.
        side: Side,
        /// Opponent terrain counted.
        terrain: Terrain,
        /// Ratio and cap, in percent reduction.
        cap: RatioCap,
    },
    /// Never dies unless the battle is an overwhelmed failure.
    Immortal,
    /// Never dies, even when overwhelmed.
    TrueImmortal,
    /// Immortal while the land ratio is at least `range` percent.
    ImmortalVersusLandRange {
        /// Minimum relative size in percent.
        range: f64,
    },
    /// Immortal except against the listed races.
    ImmortalExceptVersus {
        /// Race keys that can kill this unit.
        races: Vec<String>,
    },
    /// Only dies to opposing units whose raw power reaches `threshold`.
    OnlyDiesVersusRawPower {
        /// Minimum per-unit raw power able to kill this unit.
        threshold: f64,
    },
    /// Reduces casualties of the whole force by half of its share in it.
    ReduceCombatLosses,
    /// Sinks enemy boats.
    SinksBoats {
        /// Side on which the unit sinks boats.
        side: Side,
        /// Boats sunk per unit.
        per_unit: f64,
    },
    /// Converts inflicted casualties into new units.
    ConvertsTo {
        /// Slot the converted units join.
        slot: Slot,
    },
    /// Returns home faster after invading.
    FasterReturn {
        /// Ticks shaved off the return trip.
        ticks: u32,
    },
    /// Kills target peasants during battle.
    BurnsPeasants {
        /// Peasants killed per unit sent.
        per_unit: f64,
    },
    /// Kills target peasants during battle.
    EatsPeasants {
        /// Peasants eaten per unit sent.
        per_unit: f64,
    },
    /// Damages the target's castle improvements.
    DamagesImprovements {
        /// Improvement points destroyed per unit sent.
        per_unit: f64,
        /// Improvements targeted.
        improvements: Vec<Improvement>,
    },
    /// Plunders resources on a successful invasion.
    Plunders {
        /// Resource taken.
        resource: Resource,
        /// Amount per unit needed to break the target.
        per_unit: f64,
    },
    /// Can carry other units.
    Carries {
        /// Units carried per carrier.
        capacity: u32,
    },
    /// Must be carried when sent.
    NeedsCarrier,
}

impl UnitPerk {
    /// Key used for uniqueness checks. A unit holds at most one perk per key.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            UnitPerk::Offense(p) => format!("offense_{}", p.name()),
            UnitPerk::Defense(p) => format!("defense_{}", p.name()),
            UnitPerk::FixedCasualties { side, .. } => format!("fixed_casualties_{}", side.suffix()),
            UnitPerk::FewerCasualties { side, .. } => format!("fewer_casualties_{}", side.suffix()),
            UnitPerk::FewerCasualtiesFromLand { side, .. } => {
                format!("fewer_casualties_{}_from_land", side.suffix())
            }
            UnitPerk::FewerCasualtiesVersusLand { side, .. } => {
                format!("fewer_casualties_{}_vs_land", side.suffix())
            }
            UnitPerk::Immortal => "immortal".to_string(),
            UnitPerk::TrueImmortal => "true_immortal".to_string(),
            UnitPerk::ImmortalVersusLandRange { .. } => "immortal_vs_land_range".to_string(),
            UnitPerk::ImmortalExceptVersus { .. } => "immortal_except_vs".to_string(),
            UnitPerk::OnlyDiesVersusRawPower { .. } => "only_dies_vs_raw_power".to_string(),
            UnitPerk::ReduceCombatLosses => "reduce_combat_losses".to_string(),
            UnitPerk::SinksBoats { side, .. } => format!("sink_boats_{}", side.suffix()),
            UnitPerk::ConvertsTo { .. } => "conversion".to_string(),
            UnitPerk::FasterReturn { .. } => "faster_return".to_string(),
            UnitPerk::BurnsPeasants { .. } => "burns_peasants".to_string(),
            UnitPerk::EatsPeasants { .. } => "eats_peasants".to_string(),
            UnitPerk::DamagesImprovements { .. } => "damages_improvements".to_string(),
            UnitPerk::Plunders { .. } => "plunders".to_string(),
            UnitPerk::Carries { .. } => "carries".to_string(),
            UnitPerk::NeedsCarrier => "needs_carrier".to_string(),
        }
    }
}

/// Perks attached to a whole race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RacePerk {
    /// Offensive power, percent.
    Offense(f64),
    /// Defensive power, percent.
    Defense(f64),
    /// Power percent from own land composition.
    PowerFromTerritory {
        /// Side it applies to.
        side: Side,
        /// Terrain counted.
        terrain: Terrain,
        /// `+1%` per `ratio`% of land, capped.
        cap: RatioCap,
    },
    /// Units of this race never kill in battle.
    DoesNotKill,
    /// Defensive casualties, percent (negative reduces).
    DefensiveCasualties(f64),
    /// Prestige gain, percent.
    PrestigeGain(f64),
    /// Defensive power per draftee, replacing the default.
    DrafteeDefense(f64),
    /// Conversion rate bonus, percent.
    Conversions(f64),
    /// Generated land bonus, percent.
    GeneratedLand(f64),
    /// Souls gained per enemy unit killed on a successful invasion.
    SoulHarvest(f64),
    /// Champions gained per own unit lost on a successful invasion.
    ChampionAccrual(f64),
}

impl RacePerk {
    /// Key used for uniqueness checks.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            RacePerk::Offense(_) => "offense".to_string(),
            RacePerk::Defense(_) => "defense".to_string(),
            RacePerk::PowerFromTerritory { side, .. } => {
                format!("{}_from_territory", side.suffix())
            }
            RacePerk::DoesNotKill => "does_not_kill".to_string(),
            RacePerk::DefensiveCasualties(_) => "defensive_casualties".to_string(),
            RacePerk::PrestigeGain(_) => "prestige_gain".to_string(),
            RacePerk::DrafteeDefense(_) => "draftee_dp".to_string(),
            RacePerk::Conversions(_) => "conversions".to_string(),
            RacePerk::GeneratedLand(_) => "generated_land".to_string(),
            RacePerk::SoulHarvest(_) => "soul_harvest".to_string(),
            RacePerk::ChampionAccrual(_) => "champion_accrual".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_keys_differ() {
        let offense = UnitPerk::FixedCasualties {
            side: Side::Offense,
            percent: 5.0,
        };
        let defense = UnitPerk::FixedCasualties {
            side: Side::Defense,
            percent: 5.0,
        };
        assert_ne!(offense.key(), defense.key());
    }

    #[test]
    fn test_power_perk_keys_are_side_prefixed() {
        let perk = PowerPerk::FromPrestige(RatioCap::new(100.0, 2.0));
        assert_eq!(UnitPerk::Offense(perk.clone()).key(), "offense_from_prestige");
        assert_eq!(UnitPerk::Defense(perk).key(), "defense_from_prestige");
    }

    #[test]
    fn test_ratio_cap_exposed() {
        let perk = PowerPerk::VersusLand {
            terrain: Terrain::Forest,
            cap: RatioCap::new(10.0, 1.5),
        };
        assert_eq!(perk.ratio_cap(), Some(RatioCap::new(10.0, 1.5)));
        assert_eq!(PowerPerk::MobOutnumbering { value: 1.0 }.ratio_cap(), None);
    }

    #[test]
    fn test_opposite_side() {
        assert_eq!(Side::Offense.opposite(), Side::Defense);
        assert_eq!(Side::Defense.opposite(), Side::Offense);
    }
}
