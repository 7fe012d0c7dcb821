//! Land taken by a successful invasion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::delta::{DeltaKey, DominionDelta};
use crate::land::{BuildingKind, Terrain, Territory};
use crate::math::{apportion, floor_count};

/// Land one terrain loses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TerrainLoss {
    /// Acres lost.
    pub acres: u64,
    /// Of which barren.
    pub barren: u64,
    /// Completed buildings destroyed.
    pub buildings: BTreeMap<BuildingKind, u64>,
    /// Queued buildings cancelled.
    pub queued: BTreeMap<BuildingKind, u64>,
}

/// Land moved by one invasion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LandTransfer {
    /// Land the defender loses per terrain. Equal to land conquered.
    pub lost: BTreeMap<Terrain, TerrainLoss>,
    /// Extra land the attacker gains per terrain.
    pub generated: BTreeMap<Terrain, u64>,
}

impl LandTransfer {
    /// Acres conquered (removed from the defender).
    #[must_use]
    pub fn conquered(&self) -> u64 {
        self.lost.values().map(|l| l.acres).sum()
    }

    /// Acres conquered on one terrain.
    #[must_use]
    pub fn conquered_on(&self, terrain: Terrain) -> u64 {
        self.lost.get(&terrain).map_or(0, |l| l.acres)
    }

    /// Acres generated.
    #[must_use]
    pub fn generated_total(&self) -> u64 {
        self.generated.values().sum()
    }

    /// Acres generated on one terrain.
    #[must_use]
    pub fn generated_on(&self, terrain: Terrain) -> u64 {
        self.generated.get(&terrain).copied().unwrap_or(0)
    }

    /// Everything the attacker gains.
    #[must_use]
    pub fn gained(&self) -> u64 {
        self.conquered() + self.generated_total()
    }

    /// Defender-side changes: land, buildings and construction removed.
    #[must_use]
    pub fn defender_delta(&self) -> DominionDelta {
        let mut delta = DominionDelta::new();
        for (&terrain, loss) in &self.lost {
            delta.lose(DeltaKey::Land(terrain), loss.acres);
            for (&kind, &count) in &loss.buildings {
                delta.lose(DeltaKey::Building(kind), count);
            }
            for (&kind, &count) in &loss.queued {
                delta.lose(DeltaKey::QueuedBuilding(kind), count);
            }
        }
        delta
    }

    /// Attacker-side land arriving with the returning army.
    #[must_use]
    pub fn attacker_delta(&self) -> DominionDelta {
        let mut delta = DominionDelta::new();
        for terrain in Terrain::ALL {
            delta.gain(
                DeltaKey::Land(terrain),
                self.conquered_on(terrain) + self.generated_on(terrain),
            );
        }
        delta
    }
}

/// Land formulas.
#[derive(Debug, Clone, Copy)]
pub struct LandEngine<'a> {
    config: &'a GameConfig,
}

impl<'a> LandEngine<'a> {
    /// Create an engine.
    #[must_use]
    pub const fn new(config: &'a GameConfig) -> Self {
        Self { config }
    }

    /// Acres the defender loses.
    ///
    /// Piecewise in range `r` (defender / attacker land): quadratic below 55%,
    /// then two linear segments split at 75%. Scaled by attacker land and the
    /// land-loss multiplier, at least the minimum, never more than the
    /// defender owns.
    #[must_use]
    pub fn acres_lost(&self, attacker_land: u64, defender_land: u64, range: f64) -> u64 {
        let r = range / 100.0;
        let coefficient = if r < 0.55 {
            0.304 * r * r - 0.227 * r + 0.048
        } else if r < 0.75 {
            0.154 * r - 0.069
        } else {
            0.129 * r - 0.048
        };
        let acres = floor_count(coefficient * attacker_land as f64 * self.config.land_loss_multiplier);
        acres.max(self.config.min_acres_lost).min(defender_land)
    }

    /// Spread a loss over the defender's terrain and, within each terrain,
    /// over barren land, buildings and construction.
    #[must_use]
    pub fn distribute(&self, territory: &Territory, acres: u64) -> BTreeMap<Terrain, TerrainLoss> {
        let land: Vec<u64> = Terrain::ALL.iter().map(|&t| territory.land_of(t)).collect();
        let per_terrain = apportion(acres, &land);

        let mut lost = BTreeMap::new();
        for (terrain, acres) in Terrain::ALL.into_iter().zip(per_terrain) {
            if acres == 0 {
                continue;
            }
            let kinds: Vec<BuildingKind> = BuildingKind::on_terrain(terrain).collect();
            let mut weights = Vec::with_capacity(1 + kinds.len() * 2);
            weights.push(territory.barren_on(terrain));
            weights.extend(kinds.iter().map(|&k| territory.buildings_of(k)));
            weights.extend(kinds.iter().map(|&k| territory.queued_of(k)));

            let shares = apportion(acres, &weights);
            let mut loss = TerrainLoss {
                acres,
                barren: shares[0],
                ..TerrainLoss::default()
            };
            for (index, &kind) in kinds.iter().enumerate() {
                let built = shares[1 + index];
                let queued = shares[1 + kinds.len() + index];
                if built > 0 {
                    loss.buildings.insert(kind, built);
                }
                if queued > 0 {
                    loss.queued.insert(kind, queued);
                }
            }
            lost.insert(terrain, loss);
        }
        lost
    }

    /// Generated land per conquered acre.
    ///
    /// `bonus_percent` sums racial and research bonuses. Capped at the
    /// configured maximum.
    #[must_use]
    pub fn generated_ratio(&self, bonus_percent: f64) -> f64 {
        (self.config.generated_land_ratio * (1.0 + bonus_percent / 100.0))
            .clamp(0.0, self.config.generated_land_max)
    }

    /// Full land transfer for a successful invasion.
    ///
    /// `generated_ratio` is zero for hits that earn no bonus land.
    #[must_use]
    pub fn transfer(
        &self,
        attacker_land: u64,
        defender: &Territory,
        range: f64,
        generated_ratio: f64,
    ) -> LandTransfer {
        let acres = self.acres_lost(attacker_land, defender.total_land(), range);
        let lost = self.distribute(defender, acres);

        let conquered: Vec<u64> = Terrain::ALL
            .iter()
            .map(|t| lost.get(t).map_or(0, |l: &TerrainLoss| l.acres))
            .collect();
        let total_generated = floor_count(acres as f64 * generated_ratio);
        let generated = Terrain::ALL
            .into_iter()
            .zip(apportion(total_generated, &conquered))
            .filter(|(_, acres)| *acres > 0)
            .collect();

        LandTransfer { lost, generated }
    }
}
