//! Per-perk power contributions.
//!
//! Each [`PowerPerk`] variant is a pure function of a read-only
//! [`PerkContext`]. The engine folds them over a unit's perk list in
//! definition order, so every contribution can be tested on its own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::RoundInfo;
use crate::dominion::Dominion;
use crate::economy::Resource;
use crate::land::{BuildingKind, Terrain};
use crate::perks::PowerPerk;
use crate::units::{Slot, SlotCounts};

/// Preview values that replace live opponent data.
///
/// Used when a player estimates a battle from gathered intel instead of
/// the opponent's real state. Any field left `None` falls back to the live
/// opponent, if there is one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerOverrides {
    /// Opponent prestige.
    pub opponent_prestige: Option<u64>,
    /// Opponent race key.
    pub opponent_race: Option<String>,
    /// Opponent land share per terrain (0.0 - 1.0).
    pub opponent_land: BTreeMap<Terrain, f64>,
    /// Opponent building share per kind (0.0 - 1.0).
    pub opponent_buildings: BTreeMap<BuildingKind, f64>,
    /// Opponent barren land share (0.0 - 1.0).
    pub opponent_barren: Option<f64>,
    /// Opponent resource stockpiles.
    pub opponent_resources: BTreeMap<Resource, u64>,
    /// Opponent military headcount for mob perks.
    pub opponent_headcount: Option<u64>,
}

/// Opponent data as seen by versus perks: override first, live value second.
#[derive(Debug, Clone, Copy)]
pub struct OpponentView<'a> {
    live: Option<&'a Dominion>,
    overrides: &'a PowerOverrides,
    committed: Option<&'a SlotCounts>,
}

impl<'a> OpponentView<'a> {
    /// View over a live opponent and preview overrides.
    #[must_use]
    pub const fn new(
        live: Option<&'a Dominion>,
        overrides: &'a PowerOverrides,
        committed: Option<&'a SlotCounts>,
    ) -> Self {
        Self {
            live,
            overrides,
            committed,
        }
    }

    /// Opponent prestige.
    #[must_use]
    pub fn prestige(&self) -> Option<u64> {
        self.overrides
            .opponent_prestige
            .or_else(|| self.live.map(|d| d.prestige))
    }

    /// Opponent race key.
    #[must_use]
    pub fn race(&self) -> Option<&'a str> {
        self.overrides
            .opponent_race
            .as_deref()
            .or_else(|| self.live.map(|d| d.race.as_str()))
    }

    /// Opponent land share of a terrain.
    #[must_use]
    pub fn land_fraction(&self, terrain: Terrain) -> Option<f64> {
        self.overrides
            .opponent_land
            .get(&terrain)
            .copied()
            .or_else(|| self.live.map(|d| d.territory.land_fraction(terrain)))
    }

    /// Opponent land share covered by any of `kinds`.
    #[must_use]
    pub fn building_fraction(&self, kinds: &[BuildingKind]) -> Option<f64> {
        let mut any = false;
        let mut total = 0.0;
        for &kind in kinds {
            let share = self
                .overrides
                .opponent_buildings
                .get(&kind)
                .copied()
                .or_else(|| self.live.map(|d| d.territory.building_fraction(kind)));
            if let Some(share) = share {
                any = true;
                total += share;
            }
        }
        any.then_some(total)
    }

    /// Opponent barren land share.
    #[must_use]
    pub fn barren_fraction(&self) -> Option<f64> {
        self.overrides
            .opponent_barren
            .or_else(|| self.live.map(|d| d.territory.barren_fraction()))
    }

    /// Opponent resource stockpile.
    #[must_use]
    pub fn resource(&self, resource: Resource) -> Option<u64> {
        self.overrides
            .opponent_resources
            .get(&resource)
            .copied()
            .or_else(|| self.live.map(|d| d.resource(resource)))
    }

    /// Opponent military headcount facing this force.
    ///
    /// Committed units when the opponent is attacking, otherwise its units
    /// at home.
    #[must_use]
    pub fn headcount(&self) -> Option<u64> {
        self.overrides
            .opponent_headcount
            .or_else(|| self.committed.map(SlotCounts::total))
            .or_else(|| self.live.map(|d| d.military.home.total()))
    }
}

/// Everything a perk may read while computing one unit's power.
#[derive(Debug, Clone, Copy)]
pub struct PerkContext<'a> {
    /// Dominion owning the unit.
    pub dominion: &'a Dominion,
    /// Round timing.
    pub round: &'a RoundInfo,
    /// Opponent data, if any.
    pub opponent: OpponentView<'a>,
    /// Relative size in percent, if known.
    pub range: Option<f64>,
    /// Units committed by the owning dominion.
    pub committed: &'a SlotCounts,
    /// Units of this type committed.
    pub quantity: u64,
    /// Towers improvement bonus, for improved wizard ratio.
    pub towers_bonus: f64,
}

impl PerkContext<'_> {
    fn committed_of(&self, slot: Slot) -> u64 {
        self.committed[slot]
    }

    fn own_headcount(&self) -> u64 {
        self.committed.total()
    }
}

/// Power one perk adds to each unit of its type.
#[must_use]
pub fn contribution(perk: &PowerPerk, ctx: &PerkContext<'_>) -> f64 {
    let dominion = ctx.dominion;
    match perk {
        PowerPerk::FromLand { terrain, cap } => {
            cap.apply(dominion.territory.land_fraction(*terrain) * 100.0)
        }
        PowerPerk::FromBuilding { buildings, cap } => {
            let share: f64 = buildings
                .iter()
                .map(|&kind| dominion.territory.building_fraction(kind))
                .sum();
            cap.apply(share * 100.0)
        }
        PowerPerk::FromWizardRatio(cap) => cap.apply_scaled(dominion.wizard_ratio()),
        PowerPerk::FromImprovedWizardRatio(cap) => {
            let strength = 1.0 + dominion.tech.wizard_strength / 100.0 + ctx.towers_bonus;
            cap.apply_scaled(dominion.wizard_ratio() * strength)
        }
        PowerPerk::FromSpyRatio(cap) => cap.apply_scaled(dominion.spy_ratio()),
        PowerPerk::FromImprovedSpyRatio(cap) => {
            let strength = 1.0 + dominion.tech.spy_strength / 100.0;
            cap.apply_scaled(dominion.spy_ratio() * strength)
        }
        PowerPerk::FromPrestige(cap) => cap.apply(dominion.prestige as f64),
        PowerPerk::FromRoundHours(cap) => cap.apply(ctx.round.elapsed_hours() as f64),
        PowerPerk::FromVictories(cap) => cap.apply(f64::from(dominion.victories)),
        PowerPerk::FromResource { resource, cap } => {
            cap.apply(dominion.resource(*resource) as f64)
        }
        PowerPerk::VersusRace { race, value } => match ctx.opponent.race() {
            Some(opponent) if opponent == race => *value,
            _ => 0.0,
        },
        PowerPerk::VersusBuilding { buildings, cap } => ctx
            .opponent
            .building_fraction(buildings)
            .map_or(0.0, |share| cap.apply(share * 100.0)),
        PowerPerk::VersusLand { terrain, cap } => ctx
            .opponent
            .land_fraction(*terrain)
            .map_or(0.0, |share| cap.apply(share * 100.0)),
        PowerPerk::VersusBarrenLand(cap) => ctx
            .opponent
            .barren_fraction()
            .map_or(0.0, |share| cap.apply(share * 100.0)),
        PowerPerk::VersusPrestige(cap) => ctx
            .opponent
            .prestige()
            .map_or(0.0, |prestige| cap.apply(prestige as f64)),
        PowerPerk::VersusResource { resource, cap } => ctx
            .opponent
            .resource(*resource)
            .map_or(0.0, |amount| cap.apply(amount as f64)),
        PowerPerk::Pairing { slot, value } => {
            if ctx.quantity == 0 {
                return 0.0;
            }
            let paired = ctx.committed_of(*slot).min(ctx.quantity);
            value * paired as f64 / ctx.quantity as f64
        }
        PowerPerk::MobOutnumbering { value } => match ctx.opponent.headcount() {
            Some(theirs) if ctx.own_headcount() > theirs => *value,
            _ => 0.0,
        },
        PowerPerk::MobOutnumbered { value } => match ctx.opponent.headcount() {
            Some(theirs) if ctx.own_headcount() < theirs => *value,
            _ => 0.0,
        },
        PowerPerk::StaggeredLandRange(bands) => ctx.range.map_or(0.0, |range| {
            bands
                .iter()
                .filter(|band| range >= band.range)
                .last()
                .map_or(0.0, |band| band.value)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dominion::{DominionId, RealmId, RoundId};
    use crate::math::RatioCap;
    use crate::perks::Band;

    fn round() -> RoundInfo {
        RoundInfo {
            id: RoundId(1),
            started: true,
            offense_disabled: false,
            start_tick: 0,
            current_tick: 48,
        }
    }

    fn dominion() -> Dominion {
        let mut d = Dominion::new(DominionId(1), "Own", "human", RealmId(1), RoundId(1));
        d.territory.land.insert(Terrain::Plain, 600);
        d.territory.land.insert(Terrain::Swamp, 400);
        d.territory.buildings.insert(BuildingKind::Tower, 100);
        d.military.wizards = 500;
        d.prestige = 600;
        d
    }

    fn opponent() -> Dominion {
        let mut d = Dominion::new(DominionId(2), "Other", "goblin", RealmId(2), RoundId(1));
        d.territory.land.insert(Terrain::Forest, 250);
        d.territory.land.insert(Terrain::Hill, 750);
        d.prestige = 400;
        d.military.home = SlotCounts::new([100, 0, 0, 0]);
        d
    }

    fn eval(
        perk: &PowerPerk,
        opp: Option<&Dominion>,
        overrides: &PowerOverrides,
        range: Option<f64>,
    ) -> f64 {
        let own = dominion();
        let round = round();
        let committed = SlotCounts::new([50, 0, 0, 200]);
        let ctx = PerkContext {
            dominion: &own,
            round: &round,
            opponent: OpponentView::new(opp, overrides, None),
            range,
            committed: &committed,
            quantity: 200,
            towers_bonus: 0.0,
        };
        contribution(perk, &ctx)
    }

    #[test]
    fn test_from_land_capped() {
        let perk = PowerPerk::FromLand {
            terrain: Terrain::Swamp,
            cap: RatioCap::new(10.0, 3.0),
        };
        // 40% swamp / 10 = 4, capped to 3
        assert_eq!(eval(&perk, None, &PowerOverrides::default(), None), 3.0);
    }

    #[test]
    fn test_wizard_ratio_scales() {
        let perk = PowerPerk::FromWizardRatio(RatioCap::new(2.0, 5.0));
        // 0.5 wizards per acre * 2
        assert!((eval(&perk, None, &PowerOverrides::default(), None) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_hours() {
        let perk = PowerPerk::FromRoundHours(RatioCap::new(12.0, 2.0));
        assert_eq!(eval(&perk, None, &PowerOverrides::default(), None), 2.0);
    }

    #[test]
    fn test_versus_requires_opponent() {
        let perk = PowerPerk::VersusLand {
            terrain: Terrain::Forest,
            cap: RatioCap::new(5.0, 10.0),
        };
        let none = PowerOverrides::default();
        assert_eq!(eval(&perk, None, &none, None), 0.0);
        assert_eq!(eval(&perk, Some(&opponent()), &none, None), 5.0);
    }

    #[test]
    fn test_versus_prestige_prefers_override() {
        let perk = PowerPerk::VersusPrestige(RatioCap::new(100.0, 10.0));
        let opp = opponent();
        assert_eq!(eval(&perk, Some(&opp), &PowerOverrides::default(), None), 4.0);

        let overrides = PowerOverrides {
            opponent_prestige: Some(900),
            ..PowerOverrides::default()
        };
        assert_eq!(eval(&perk, Some(&opp), &overrides, None), 9.0);
        assert_eq!(eval(&perk, None, &overrides, None), 9.0);
    }

    #[test]
    fn test_versus_race() {
        let perk = PowerPerk::VersusRace {
            race: "goblin".to_string(),
            value: 1.5,
        };
        assert_eq!(eval(&perk, Some(&opponent()), &PowerOverrides::default(), None), 1.5);
        assert_eq!(eval(&perk, None, &PowerOverrides::default(), None), 0.0);
    }

    #[test]
    fn test_pairing_spread_over_quantity() {
        let perk = PowerPerk::Pairing {
            slot: Slot::ALL[0],
            value: 2.0,
        };
        // 50 paired of 200 sent: total 100 spread over 200 units
        assert_eq!(eval(&perk, None, &PowerOverrides::default(), None), 0.5);
    }

    #[test]
    fn test_mob_perks() {
        let opp = opponent();
        let none = PowerOverrides::default();
        let outnumbering = PowerPerk::MobOutnumbering { value: 1.0 };
        let outnumbered = PowerPerk::MobOutnumbered { value: 1.0 };
        // 250 committed vs 100 at home
        assert_eq!(eval(&outnumbering, Some(&opp), &none, None), 1.0);
        assert_eq!(eval(&outnumbered, Some(&opp), &none, None), 0.0);
        assert_eq!(eval(&outnumbering, None, &none, None), 0.0);
    }

    #[test]
    fn test_staggered_last_band_wins() {
        let perk = PowerPerk::StaggeredLandRange(vec![
            Band {
                range: 60.0,
                value: 1.0,
            },
            Band {
                range: 75.0,
                value: 2.0,
            },
        ]);
        let none = PowerOverrides::default();
        assert_eq!(eval(&perk, None, &none, Some(50.0)), 0.0);
        assert_eq!(eval(&perk, None, &none, Some(70.0)), 1.0);
        assert_eq!(eval(&perk, None, &none, Some(90.0)), 2.0);
        assert_eq!(eval(&perk, None, &none, None), 0.0);
    }
}
