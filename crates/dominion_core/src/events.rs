//! Audit and world-news events, and the invasion history read back from them.

use serde::{Deserialize, Serialize};

use crate::dominion::DominionId;

/// Kind of recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// The attacker broke the target.
    InvasionSuccess,
    /// The target held.
    InvasionRepelled,
}

/// Data attached to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    /// Tick the event happened on.
    pub tick: u64,
    /// Human-readable line for the news feed.
    pub summary: String,
    /// Binary audit record.
    pub audit: Vec<u8>,
}

/// Receives events as invasions commit.
pub trait EventSink {
    /// Record one event.
    fn record(&mut self, kind: EventKind, source: DominionId, target: DominionId, payload: EventPayload);
}

/// Read side of the invasion log.
pub trait InvasionHistory {
    /// Successful invasions of `target` at or after `since_tick`.
    fn recent_invasions_of(&self, target: DominionId, since_tick: u64) -> usize;

    /// Whether `attacker` successfully invaded `target` at or after `since_tick`.
    fn recently_invaded_by(&self, attacker: DominionId, target: DominionId, since_tick: u64) -> bool;
}

/// A recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Kind.
    pub kind: EventKind,
    /// Dominion that acted.
    pub source: DominionId,
    /// Dominion acted upon.
    pub target: DominionId,
    /// Attached data.
    pub payload: EventPayload,
}

/// In-memory append-only event log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in insertion order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events involving a dominion on either side.
    pub fn involving(&self, dominion: DominionId) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .filter(move |e| e.source == dominion || e.target == dominion)
    }

    fn successes_since(&self, since_tick: u64) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .filter(move |e| e.kind == EventKind::InvasionSuccess && e.payload.tick >= since_tick)
    }
}

impl EventSink for EventLog {
    fn record(&mut self, kind: EventKind, source: DominionId, target: DominionId, payload: EventPayload) {
        tracing::debug!(?kind, source = source.0, target = target.0, tick = payload.tick, "Recorded event");
        self.events.push(Event {
            kind,
            source,
            target,
            payload,
        });
    }
}

impl InvasionHistory for EventLog {
    fn recent_invasions_of(&self, target: DominionId, since_tick: u64) -> usize {
        self.successes_since(since_tick)
            .filter(|e| e.target == target)
            .count()
    }

    fn recently_invaded_by(&self, attacker: DominionId, target: DominionId, since_tick: u64) -> bool {
        self.successes_since(since_tick)
            .any(|e| e.source == attacker && e.target == target)
    }
}

/// History with no recorded invasions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl InvasionHistory for NoHistory {
    fn recent_invasions_of(&self, _target: DominionId, _since_tick: u64) -> usize {
        0
    }

    fn recently_invaded_by(&self, _attacker: DominionId, _target: DominionId, _since_tick: u64) -> bool {
        false
    }
}
