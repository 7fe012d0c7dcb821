//! Invasion scenarios.
//!
//! A scenario is a RON file describing a round, a handful of dominions and
//! a list of invasions. Running it resolves each invasion in order through
//! an in-memory world, advancing ticks where asked, and reports what
//! happened.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dominion_core::config::{GameConfig, RoundInfo};
use dominion_core::dominion::{AllianceId, Dominion, DominionId, RealmId, RoundId};
use dominion_core::economy::{Improvement, Resource};
use dominion_core::error::{ConfigError, DominionError};
use dominion_core::invasion::{InvasionReport, InvasionResult, UnitOrder};
use dominion_core::land::{BuildingKind, Terrain};
use dominion_core::races::RaceRegistry;
use dominion_core::units::SlotCounts;
use dominion_core::world::InMemoryWorld;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Bad race data or an unknown race.
    #[error("Race data error: {0}")]
    Config(#[from] ConfigError),
    /// The engine failed for a reason other than a rejected order.
    #[error("Engine error: {0}")]
    Engine(#[from] DominionError),
    /// Failed to encode the report.
    #[error("Failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

const fn default_morale() -> u32 {
    Dominion::MORALE_CEILING
}

const fn default_prestige() -> u64 {
    250
}

/// Starting state of one dominion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DominionSetup {
    /// Dominion id, referenced by invasions.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Race key.
    pub race: String,
    /// Realm number.
    pub realm: u32,
    /// Alliance number, if any.
    #[serde(default)]
    pub alliance: Option<u32>,
    /// Acres per terrain.
    pub land: BTreeMap<Terrain, u64>,
    /// Completed buildings.
    #[serde(default)]
    pub buildings: BTreeMap<BuildingKind, u64>,
    /// Units at home per slot.
    #[serde(default)]
    pub units: [u64; 4],
    /// Draftees.
    #[serde(default)]
    pub draftees: u64,
    /// Peasants.
    #[serde(default)]
    pub peasants: u64,
    /// Morale.
    #[serde(default = "default_morale")]
    pub morale: u32,
    /// Prestige.
    #[serde(default = "default_prestige")]
    pub prestige: u64,
    /// Resource stockpiles.
    #[serde(default)]
    pub resources: BTreeMap<Resource, u64>,
    /// Improvement points.
    #[serde(default)]
    pub improvements: BTreeMap<Improvement, u64>,
    /// Protection ticks left.
    #[serde(default)]
    pub protection_ticks: u32,
}

impl DominionSetup {
    /// Build the dominion for a round.
    #[must_use]
    pub fn build(&self, round: RoundId) -> Dominion {
        let mut dominion = Dominion::new(
            DominionId(self.id),
            self.name.clone(),
            self.race.clone(),
            RealmId(self.realm),
            round,
        );
        dominion.alliance = self.alliance.map(AllianceId);
        dominion.territory.land.clone_from(&self.land);
        dominion.territory.buildings.clone_from(&self.buildings);
        dominion.military.home = SlotCounts::new(self.units);
        dominion.military.draftees = self.draftees;
        dominion.peasants = self.peasants;
        dominion.morale = self.morale;
        dominion.prestige = self.prestige;
        dominion.resources.clone_from(&self.resources);
        dominion.improvements.clone_from(&self.improvements);
        dominion.protection_ticks = self.protection_ticks;
        dominion
    }
}

/// One invasion to attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvasionOrder {
    /// Attacking dominion id.
    pub attacker: u64,
    /// Target dominion id.
    pub defender: u64,
    /// Units to send, by slot number.
    pub units: UnitOrder,
    /// Ticks to advance before sending.
    #[serde(default)]
    pub ticks_before: u32,
}

/// A complete scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Race data directory, relative to the scenario file.
    pub races: PathBuf,
    /// Game constants. Missing fields keep their defaults.
    #[serde(default)]
    pub config: GameConfig,
    /// Tick the round is at when the scenario starts.
    #[serde(default)]
    pub tick: u64,
    /// Dominions in play.
    pub dominions: Vec<DominionSetup>,
    /// Invasions, attempted in order.
    pub invasions: Vec<InvasionOrder>,
    /// Ticks to advance after the last invasion.
    #[serde(default)]
    pub ticks_after: u32,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        Ok(ron::from_str(ron)?)
    }

    /// Race directory for a scenario loaded from `scenario_path`.
    #[must_use]
    pub fn races_dir(&self, scenario_path: &Path) -> PathBuf {
        scenario_path
            .parent()
            .map_or_else(|| self.races.clone(), |dir| dir.join(&self.races))
    }

    /// The round the scenario plays in.
    #[must_use]
    pub fn round(&self) -> RoundInfo {
        RoundInfo {
            id: RoundId(1),
            started: true,
            offense_disabled: false,
            start_tick: 0,
            current_tick: self.tick,
        }
    }

    /// Resolve every invasion in order.
    ///
    /// Rejected orders are reported and the run goes on. Any other engine
    /// failure stops the run.
    pub fn run(&self, races: RaceRegistry) -> Result<ScenarioReport, ScenarioError> {
        let round = self.round();
        for setup in &self.dominions {
            races.get(&setup.race)?;
        }

        let mut world = InMemoryWorld::new(self.config.clone(), races, round);
        for setup in &self.dominions {
            world.insert(setup.build(round.id));
        }

        let mut invasions = Vec::with_capacity(self.invasions.len());
        for order in &self.invasions {
            for _ in 0..order.ticks_before {
                world.tick()?;
            }
            let attacker = DominionId(order.attacker);
            let defender = DominionId(order.defender);
            let outcome = match world.invade(attacker, defender, &order.units) {
                Ok(result) => {
                    let attacker_name = world.get(attacker)?.name;
                    let defender_name = world.get(defender)?.name;
                    InvasionOutcome::Resolved {
                        summary: InvasionReport::new(&result, &attacker_name, &defender_name)
                            .summary(),
                        result: Box::new(result),
                    }
                }
                Err(DominionError::Precondition(e)) => InvasionOutcome::Rejected {
                    code: e.code().to_string(),
                    message: e.to_string(),
                },
                Err(e) => return Err(e.into()),
            };
            invasions.push(ScenarioInvasion {
                attacker: order.attacker,
                defender: order.defender,
                tick: world.round().current_tick,
                outcome,
            });
        }

        for _ in 0..self.ticks_after {
            world.tick()?;
        }

        let dominions = self
            .dominions
            .iter()
            .map(|setup| world.get(DominionId(setup.id)))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            scenario = %self.name,
            invasions = invasions.len(),
            tick = world.round().current_tick,
            "Scenario finished"
        );

        Ok(ScenarioReport {
            name: self.name.clone(),
            invasions,
            dominions,
        })
    }
}

/// What became of one order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvasionOutcome {
    /// The invasion went ahead.
    Resolved {
        /// Player-facing summary.
        summary: String,
        /// Full result.
        result: Box<InvasionResult>,
    },
    /// The order failed a precondition.
    Rejected {
        /// Stable error code.
        code: String,
        /// Player-facing message.
        message: String,
    },
}

/// One attempted invasion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioInvasion {
    /// Attacking dominion id.
    pub attacker: u64,
    /// Target dominion id.
    pub defender: u64,
    /// Tick it was attempted on.
    pub tick: u64,
    /// What happened.
    pub outcome: InvasionOutcome,
}

/// Everything a scenario run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Invasions in order.
    pub invasions: Vec<ScenarioInvasion>,
    /// Final state of every dominion.
    pub dominions: Vec<Dominion>,
}

impl ScenarioReport {
    /// Plain-text rendering.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = format!("== {} ==\n", self.name);
        for (index, invasion) in self.invasions.iter().enumerate() {
            let _ = writeln!(
                out,
                "\n#{} tick {}: {} -> {}",
                index + 1,
                invasion.tick,
                invasion.attacker,
                invasion.defender
            );
            match &invasion.outcome {
                InvasionOutcome::Resolved { summary, .. } => {
                    let _ = writeln!(out, "{summary}");
                }
                InvasionOutcome::Rejected { code, message } => {
                    let _ = writeln!(out, "Rejected [{code}]: {message}");
                }
            }
        }
        out.push_str("\nFinal state:\n");
        for d in &self.dominions {
            let _ = writeln!(
                out,
                "  {} ({}): {} acres, {} prestige, {} morale, units {:?} home / {:?} returning",
                d.name,
                d.race,
                d.total_land(),
                d.prestige,
                d.morale,
                d.military.home.0,
                d.military.returning.0
            );
        }
        out
    }

    /// Pretty JSON rendering.
    pub fn to_json(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
