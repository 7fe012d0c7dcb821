//! # Dominion Core
//!
//! Combat resolution for a persistent, tick-based strategy game.
//!
//! This crate contains **only** deterministic logic:
//! - No IO beyond what callers inject through the collaborator traits
//! - No system randomness
//! - No wall-clock time (ticks come from [`config::RoundInfo`])
//!
//! Three engines do the work:
//!
//! - [`power::PowerEngine`] - offensive and defensive power for a force
//! - [`casualties::CasualtyEngine`] - casualty multipliers and starvation
//! - [`invasion::InvasionResolver`] - one invasion from order to committed
//!   result
//!
//! ## Crate Structure
//!
//! - [`land`], [`economy`], [`units`], [`dominion`] - the dominion model
//! - [`perks`], [`data`], [`races`] - race data and the closed perk catalog
//! - [`config`] - tunable constants and the active-effect catalog
//! - [`range`], [`effects`], [`queue`], [`events`] - collaborator traits
//!   and their in-memory implementations
//! - [`delta`] - per-dominion change accumulator
//! - [`conquest`] - land lost and generated
//! - [`world`] - in-memory store running invasions as units of work

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod casualties;
pub mod config;
pub mod conquest;
pub mod data;
pub mod delta;
pub mod dominion;
pub mod economy;
pub mod effects;
pub mod error;
pub mod events;
pub mod invasion;
pub mod land;
pub mod math;
pub mod perks;
pub mod power;
pub mod queue;
pub mod races;
pub mod range;
pub mod units;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::casualties::{CasualtyEngine, CasualtyRate, StarvationLosses};
    pub use crate::config::{GameConfig, RoundInfo};
    pub use crate::conquest::{LandEngine, LandTransfer};
    pub use crate::delta::{DeltaKey, DominionDelta};
    pub use crate::dominion::{AllianceId, Dominion, DominionId, Military, RealmId, RoundId};
    pub use crate::economy::{Improvement, Resource, TechPerks};
    pub use crate::effects::{ActiveEffectProvider, ActiveEffects, EffectDefinition, NoEffects};
    pub use crate::error::{
        ConfigError, DominionError, InvariantViolation, InvasionError, Result,
    };
    pub use crate::events::{EventKind, EventLog, EventSink, InvasionHistory, NoHistory};
    pub use crate::invasion::{
        InvasionReport, InvasionResolver, InvasionResult, Resolution, UnitOrder,
    };
    pub use crate::land::{BuildingKind, Terrain, Territory};
    pub use crate::perks::{Side, UnitPerk, RacePerk, PowerPerk};
    pub use crate::power::{DefenseOptions, Matchup, PowerBreakdown, PowerEngine, PowerOverrides};
    pub use crate::queue::{DeferredEffectQueue, DeferredQueue};
    pub use crate::races::{Race, RaceRegistry};
    pub use crate::range::{LandRange, RangeProvider};
    pub use crate::units::{Slot, SlotCounts};
    pub use crate::world::InMemoryWorld;
}
