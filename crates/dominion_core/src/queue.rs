//! Changes that land after a delay (returning units, delayed prestige).

use serde::{Deserialize, Serialize};

use crate::delta::DominionDelta;
use crate::dominion::DominionId;

/// Identifier of a queued entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(pub u64);

/// Accepts changes to apply to a dominion after some ticks.
pub trait DeferredEffectQueue {
    /// Queue `delta` for `dominion`, due after `delay_ticks` ticks.
    fn schedule(&mut self, dominion: DominionId, delta: DominionDelta, delay_ticks: u32) -> EntryId;
}

/// One queued change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredEntry {
    /// Entry id.
    pub id: EntryId,
    /// Dominion receiving the change.
    pub dominion: DominionId,
    /// The change.
    pub delta: DominionDelta,
    /// Ticks until due.
    pub remaining: u32,
}

/// In-memory queue keyed by remaining ticks.
///
/// Delivery removes an entry, so it can only be handed out once. Callers
/// that may fail while applying a delivery work on a clone and keep it only
/// on success.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeferredQueue {
    entries: Vec<DeferredEntry>,
    next_id: u64,
}

impl DeferredQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decrement every pending entry by one tick.
    pub fn advance_tick(&mut self) {
        for entry in &mut self.entries {
            entry.remaining = entry.remaining.saturating_sub(1);
        }
    }

    /// Entries due now.
    pub fn due(&self) -> impl Iterator<Item = &DeferredEntry> {
        self.entries.iter().filter(|e| e.remaining == 0)
    }

    /// Take every due entry, ordered by id. Each entry is handed out once.
    pub fn deliver_due(&mut self) -> Vec<DeferredEntry> {
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.remaining == 0);
        self.entries = pending;
        due.sort_by_key(|e| e.id);
        due
    }

    /// Pending entries for a dominion.
    pub fn pending_for(&self, dominion: DominionId) -> impl Iterator<Item = &DeferredEntry> {
        self.entries.iter().filter(move |e| e.dominion == dominion)
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DeferredEffectQueue for DeferredQueue {
    fn schedule(&mut self, dominion: DominionId, delta: DominionDelta, delay_ticks: u32) -> EntryId {
        self.next_id += 1;
        let id = EntryId(self.next_id);
        tracing::debug!(entry = id.0, dominion = dominion.0, delay_ticks, "Scheduled deferred change");
        self.entries.push(DeferredEntry {
            id,
            dominion,
            delta,
            remaining: delay_ticks,
        });
        id
    }
}
