//! Error types for the combat resolution core.
//!
//! Three families, kept apart because callers treat them differently:
//!
//! - [`InvasionError`] - a rejected order. User-correctable, shown verbatim,
//!   never has side effects.
//! - [`ConfigError`] - malformed race, perk or effect data. Fatal, not shown
//!   to players.
//! - [`InvariantViolation`] - arithmetic that should be impossible when the
//!   preconditions hold. Fails the whole unit of work.

use thiserror::Error;

use crate::dominion::DominionId;

/// Result type alias using [`DominionError`].
pub type Result<T> = std::result::Result<T, DominionError>;

/// Top-level error type at the orchestration boundary.
#[derive(Debug, Error)]
pub enum DominionError {
    /// The invasion order failed a precondition.
    #[error(transparent)]
    Precondition(#[from] InvasionError),

    /// Game data is malformed or missing.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// Resolution produced an impossible state.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    /// Referenced dominion does not exist in the store.
    #[error("Dominion not found: {0}")]
    NotFound(DominionId),

    /// The store could not complete the unit of work.
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl DominionError {
    /// Whether the error can be shown to the player as-is.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }
}

/// A rejected invasion order.
///
/// Every precondition has its own variant so callers can map them to
/// distinct messages. [`InvasionError::code`] gives a stable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvasionError {
    /// Offensive actions are switched off for the whole world.
    #[error("Offensive actions are currently disabled")]
    OffenseDisabled,

    /// The attacker is still under protection.
    #[error("You cannot invade while under protection")]
    AttackerUnderProtection,

    /// The target is still under protection.
    #[error("You cannot invade a dominion that is under protection")]
    TargetUnderProtection,

    /// Target is outside the allowed relative-size band.
    #[error("You cannot invade dominions outside of your range")]
    OutOfRange,

    /// Attacker and target play in different rounds.
    #[error("You must be in the same round to invade")]
    DifferentRound,

    /// Target belongs to the attacker's own realm.
    #[error("You cannot invade a dominion in your own realm")]
    SameRealm,

    /// Attacker targeted itself.
    #[error("You cannot invade yourself")]
    SelfTarget,

    /// A requested quantity was negative.
    #[error("Unit quantities must be non-negative (slot {slot}: {quantity})")]
    NegativeQuantity {
        /// Slot number from the request.
        slot: u8,
        /// Offending quantity.
        quantity: i64,
    },

    /// A requested slot does not exist.
    #[error("Unknown unit slot {0}")]
    UnknownSlot(u8),

    /// No unit with offensive power was sent.
    #[error("You need to send at least some units with offensive power")]
    NoOffensiveUnits,

    /// Attacker does not have enough units at home.
    #[error("You do not have enough units in slot {slot} (requested {requested}, available {available})")]
    InsufficientUnits {
        /// Unit slot.
        slot: u8,
        /// Units requested.
        requested: u64,
        /// Units at home.
        available: u64,
    },

    /// Not enough boats for units that need them.
    #[error("You do not have enough boats to send this many units (need {needed}, have {available})")]
    InsufficientBoats {
        /// Boats required.
        needed: u64,
        /// Boats at home.
        available: u64,
    },

    /// Attacker morale is too low.
    #[error("You do not have enough morale to invade (morale {morale}, need {required})")]
    MinMorale {
        /// Current morale.
        morale: u32,
        /// Required morale.
        required: u32,
    },

    /// Sending would leave less than a third of total defense at home.
    #[error("You need to leave at least 1/3 of your total defensive power at home")]
    ThirtyThreePercentRule,

    /// Sent offense exceeds 4/3 of remaining home defense.
    #[error("You need to leave more defensive power at home (4:3 rule)")]
    FourToThreeRule,

    /// The round has not started yet.
    #[error("You cannot invade until the round has started")]
    RoundNotStarted,

    /// Carrier capacity does not cover units that must be carried.
    #[error("You do not have enough carrier capacity for the units you are sending (need {needed}, capacity {capacity})")]
    InsufficientCarriers {
        /// Units needing a carrier.
        needed: u64,
        /// Total carrier capacity sent.
        capacity: u64,
    },
}

impl InvasionError {
    /// Stable machine-readable code for this rejection.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::OffenseDisabled => "OFFENSE_DISABLED",
            Self::AttackerUnderProtection => "ATTACKER_PROTECTED",
            Self::TargetUnderProtection => "TARGET_PROTECTED",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::DifferentRound => "DIFFERENT_ROUND",
            Self::SameRealm => "SAME_REALM",
            Self::SelfTarget => "SELF_TARGET",
            Self::NegativeQuantity { .. } => "NEGATIVE_QUANTITY",
            Self::UnknownSlot(_) => "UNKNOWN_SLOT",
            Self::NoOffensiveUnits => "NO_OFFENSIVE_UNITS",
            Self::InsufficientUnits { .. } => "INSUFFICIENT_UNITS",
            Self::InsufficientBoats { .. } => "INSUFFICIENT_BOATS",
            Self::MinMorale { .. } => "MIN_MORALE",
            Self::ThirtyThreePercentRule => "RULE_33_PERCENT",
            Self::FourToThreeRule => "RULE_4_TO_3",
            Self::RoundNotStarted => "ROUND_NOT_STARTED",
            Self::InsufficientCarriers { .. } => "INSUFFICIENT_CARRIERS",
        }
    }
}

/// Malformed or missing game data.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Race key is not registered.
    #[error("Unknown race: {0}")]
    UnknownRace(String),

    /// Race does not define exactly one unit per slot.
    #[error("Race '{race}' must define units for slots 1-4 exactly once")]
    InvalidUnitSlots {
        /// Race key.
        race: String,
    },

    /// A unit carries two perks with the same key.
    #[error("Unit '{unit}' has duplicate perk '{key}'")]
    DuplicatePerk {
        /// Unit name.
        unit: String,
        /// Perk key.
        key: String,
    },

    /// A race carries two perks with the same key.
    #[error("Race '{race}' has duplicate race perk '{key}'")]
    DuplicateRacePerk {
        /// Race key.
        race: String,
        /// Perk key.
        key: String,
    },

    /// Perk payload is invalid.
    #[error("Invalid perk '{key}' on '{owner}': {reason}")]
    InvalidPerk {
        /// Unit or race owning the perk.
        owner: String,
        /// Perk key.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Slot number outside 1-4.
    #[error("Invalid unit slot: {0}")]
    InvalidSlot(u8),

    /// Failed to read a data file.
    #[error("Failed to read '{path}': {message}")]
    Io {
        /// Path to the file.
        path: String,
        /// Error message.
        message: String,
    },

    /// Failed to parse a data file.
    #[error("Failed to parse data file '{path}': {message}")]
    Parse {
        /// Path to the file.
        path: String,
        /// Error message.
        message: String,
    },

    /// Directory with data files does not exist.
    #[error("Data directory not found: {0}")]
    DirectoryNotFound(String),
}

/// A broken invariant detected during resolution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    /// A counter would go below zero.
    #[error("Negative result for {field} on dominion {dominion}: {current} + {delta}")]
    NegativeValue {
        /// Dominion the delta targets.
        dominion: DominionId,
        /// Field name.
        field: String,
        /// Current value.
        current: u64,
        /// Delta that was applied.
        delta: i64,
    },

    /// Arithmetic produced NaN or infinity.
    #[error("Non-finite value computed for {0}")]
    NonFinite(&'static str),

    /// Division by zero in a formula without a defined fallback.
    #[error("Division by zero in {0}")]
    DivisionByZero(&'static str),

    /// Land removed from the defender differs from land conquered.
    #[error("Land conservation broken: removed {removed}, conquered {conquered}")]
    LandNotConserved {
        /// Acres removed from the defender.
        removed: u64,
        /// Acres credited as conquered.
        conquered: u64,
    },

    /// Invariant failed for another reason.
    #[error("Invariant violated: {0}")]
    Other(String),
}
