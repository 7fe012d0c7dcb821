//! Unit slots, per-slot counts and resolved unit types.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::perks::{PowerPerk, Side, UnitPerk};

/// Number of combat unit slots per race.
pub const SLOT_COUNT: usize = 4;

/// A combat unit slot, 1 through 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Slot(u8);

impl Slot {
    /// All slots in order.
    pub const ALL: [Slot; SLOT_COUNT] = [Slot(1), Slot(2), Slot(3), Slot(4)];

    /// Create a slot from its number, if it is in range.
    #[must_use]
    pub const fn new(number: u8) -> Option<Self> {
        if number >= 1 && number as usize <= SLOT_COUNT {
            Some(Self(number))
        } else {
            None
        }
    }

    /// Slot number (1-4).
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Zero-based index into per-slot arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl TryFrom<u8> for Slot {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Slot::new(value).ok_or(ConfigError::InvalidSlot(value))
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> Self {
        slot.0
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit{}", self.0)
    }
}

/// A count per unit slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct SlotCounts(pub [u64; SLOT_COUNT]);

impl SlotCounts {
    /// All zero.
    pub const ZERO: Self = Self([0; SLOT_COUNT]);

    /// Create from a plain array ordered by slot.
    #[must_use]
    pub const fn new(counts: [u64; SLOT_COUNT]) -> Self {
        Self(counts)
    }

    /// Sum across slots.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    /// Whether every slot is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&c| c == 0)
    }

    /// Iterate `(slot, count)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, u64)> + '_ {
        Slot::ALL.into_iter().map(move |slot| (slot, self[slot]))
    }

    /// Per-slot saturating subtraction.
    #[must_use]
    pub fn saturating_sub(&self, other: &SlotCounts) -> SlotCounts {
        let mut out = *self;
        for slot in Slot::ALL {
            out[slot] = self[slot].saturating_sub(other[slot]);
        }
        out
    }

    /// Per-slot addition.
    #[must_use]
    pub fn plus(&self, other: &SlotCounts) -> SlotCounts {
        let mut out = *self;
        for slot in Slot::ALL {
            out[slot] = self[slot].saturating_add(other[slot]);
        }
        out
    }
}

impl Index<Slot> for SlotCounts {
    type Output = u64;

    fn index(&self, slot: Slot) -> &Self::Output {
        &self.0[slot.index()]
    }
}

impl IndexMut<Slot> for SlotCounts {
    fn index_mut(&mut self, slot: Slot) -> &mut Self::Output {
        &mut self.0[slot.index()]
    }
}

/// A resolved unit type.
///
/// Perks are kept in definition order and are unique by key; that is checked
/// when the owning race is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitType {
    /// Slot the unit occupies.
    pub slot: Slot,
    /// Display name.
    pub name: String,
    /// Base offensive power.
    pub offense: f64,
    /// Base defensive power.
    pub defense: f64,
    /// Whether the unit needs boats to be sent.
    #[serde(default)]
    pub need_boat: bool,
    /// Ordered perk list.
    #[serde(default)]
    pub perks: Vec<UnitPerk>,
}

impl UnitType {
    /// Base power on one side.
    #[must_use]
    pub const fn base_power(&self, side: Side) -> f64 {
        match side {
            Side::Offense => self.offense,
            Side::Defense => self.defense,
        }
    }

    /// Power perks applying to one side, in definition order.
    pub fn power_perks(&self, side: Side) -> impl Iterator<Item = &PowerPerk> + '_ {
        self.perks.iter().filter_map(move |perk| match (perk, side) {
            (UnitPerk::Offense(p), Side::Offense) | (UnitPerk::Defense(p), Side::Defense) => {
                Some(p)
            }
            _ => None,
        })
    }

    /// First perk matching a predicate.
    pub fn find_perk<T>(&self, f: impl Fn(&UnitPerk) -> Option<T>) -> Option<T> {
        self.perks.iter().find_map(f)
    }

    /// Whether any perk matches.
    pub fn has_perk(&self, f: impl Fn(&UnitPerk) -> bool) -> bool {
        self.perks.iter().any(f)
    }

    /// Fixed casualty percentage on one side, if any.
    #[must_use]
    pub fn fixed_casualties(&self, side: Side) -> Option<f64> {
        self.find_perk(|perk| match perk {
            UnitPerk::FixedCasualties { side: s, percent } if *s == side => Some(*percent),
            _ => None,
        })
    }

    /// Ticks this unit needs to return home after an invasion.
    #[must_use]
    pub fn return_ticks(&self, base: u32) -> u32 {
        let faster = self
            .find_perk(|perk| match perk {
                UnitPerk::FasterReturn { ticks } => Some(*ticks),
                _ => None,
            })
            .unwrap_or(0);
        base.saturating_sub(faster).max(1)
    }
}
