//! The immutable outcome record of an invasion.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::conquest::LandTransfer;
use crate::dominion::DominionId;
use crate::economy::{Improvement, Resource};
use crate::error::{DominionError, Result};
use crate::units::SlotCounts;

/// Audit format version.
pub const AUDIT_VERSION: u32 = 1;

/// Losses and gains of the attacker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttackerOutcome {
    /// Units sent per slot.
    pub units_sent: SlotCounts,
    /// Units lost per slot.
    pub units_lost: SlotCounts,
    /// Units converted from enemy casualties, per output slot.
    pub conversions: SlotCounts,
    /// Units on their way home per slot, conversions included.
    pub units_returning: SlotCounts,
    /// Ticks until the slowest unit returns.
    pub return_ticks: u32,
    /// Prestige change. Gains arrive with the slowest unit.
    pub prestige_change: i64,
    /// Morale change.
    pub morale_change: i64,
    /// Boats sunk by the defender.
    pub boats_lost: u64,
    /// Resources plundered.
    pub plunder: BTreeMap<Resource, u64>,
    /// Research points earned.
    pub research_points: u64,
    /// Souls collected.
    pub souls: u64,
    /// Champions gained.
    pub champions: u64,
    /// Discounted land credit.
    pub discounted_land: u64,
    /// Whether the hit counts as a victory.
    pub victory: bool,
}

/// Losses of the defender.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DefenderOutcome {
    /// Units lost per slot.
    pub units_lost: SlotCounts,
    /// Draftees lost.
    pub draftees_lost: u64,
    /// Peasants killed by units during battle.
    pub peasants_killed: u64,
    /// Improvement points destroyed.
    pub improvements_damaged: BTreeMap<Improvement, u64>,
    /// Prestige change.
    pub prestige_change: i64,
    /// Morale change.
    pub morale_change: i64,
    /// Boats sunk by the attacker.
    pub boats_lost: u64,
    /// Recent successful invasions of the defender before this one.
    pub recently_invaded: usize,
}

impl DefenderOutcome {
    /// Units and draftees lost.
    #[must_use]
    pub fn casualties(&self) -> u64 {
        self.units_lost.total() + self.draftees_lost
    }
}

/// Outcome of one invasion. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvasionResult {
    /// Audit format version.
    pub version: u32,
    /// Attacking dominion.
    pub attacker: DominionId,
    /// Defending dominion.
    pub defender: DominionId,
    /// Tick the invasion happened on.
    pub tick: u64,
    /// Relative size in percent.
    pub range: f64,
    /// Whether the attacker broke the defender.
    pub success: bool,
    /// Whether the attacker failed by a wide margin.
    pub overwhelmed: bool,
    /// Attacking offensive power.
    pub op: f64,
    /// Defending defensive power, reductions applied.
    pub dp: f64,
    /// Share of the defensive multiplier removed by temples.
    pub temple_reduction: f64,
    /// Share of raw defense removed by ambush.
    pub ambush_reduction: f64,
    /// Whether both sides share an alliance.
    pub allied: bool,
    /// Whether the attacker hit the same target inside the cooldown.
    pub repeat_invasion: bool,
    /// Land moved.
    pub land: LandTransfer,
    /// Attacker side.
    pub attacker_outcome: AttackerOutcome,
    /// Defender side.
    pub defender_outcome: DefenderOutcome,
}

impl InvasionResult {
    /// Acres conquered.
    #[must_use]
    pub fn land_conquered(&self) -> u64 {
        self.land.conquered()
    }

    /// Acres generated.
    #[must_use]
    pub fn land_generated(&self) -> u64 {
        self.land.generated_total()
    }

    /// Compact binary audit record.
    pub fn to_audit_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| {
            DominionError::Storage(format!("Failed to serialize invasion result: {e}"))
        })
    }

    /// Decode an audit record.
    pub fn from_audit_bytes(bytes: &[u8]) -> Result<Self> {
        let result: Self = bincode::deserialize(bytes).map_err(|e| {
            DominionError::Storage(format!("Failed to deserialize invasion result: {e}"))
        })?;
        if result.version != AUDIT_VERSION {
            return Err(DominionError::Storage(format!(
                "Audit version mismatch: expected {}, got {}",
                AUDIT_VERSION, result.version
            )));
        }
        Ok(result)
    }
}

/// Renders an [`InvasionResult`] for players and the news feed.
#[derive(Debug, Clone, Copy)]
pub struct InvasionReport<'a> {
    result: &'a InvasionResult,
    attacker: &'a str,
    defender: &'a str,
}

impl<'a> InvasionReport<'a> {
    /// Report with the display names of both sides.
    #[must_use]
    pub const fn new(result: &'a InvasionResult, attacker: &'a str, defender: &'a str) -> Self {
        Self {
            result,
            attacker,
            defender,
        }
    }

    /// One-line headline for the world news.
    #[must_use]
    pub fn headline(&self) -> String {
        let r = self.result;
        if r.success {
            format!(
                "{} invaded {} and captured {} acres of land",
                self.attacker,
                self.defender,
                r.land_conquered()
            )
        } else if r.overwhelmed {
            format!(
                "{} fended off an attack from {}, overwhelming the invaders",
                self.defender, self.attacker
            )
        } else {
            format!(
                "{} repelled an invasion by {}",
                self.defender, self.attacker
            )
        }
    }

    /// Multi-line summary for the attacker.
    #[must_use]
    pub fn summary(&self) -> String {
        let r = self.result;
        let a = &r.attacker_outcome;
        let d = &r.defender_outcome;

        let mut out = self.headline();
        out.push('\n');
        let _ = writeln!(
            out,
            "Offensive power {:.0} against defensive power {:.0} at {:.1}% range",
            r.op, r.dp, r.range
        );
        let _ = writeln!(
            out,
            "Attacker lost {} units, defender lost {} units and {} draftees",
            a.units_lost.total(),
            d.units_lost.total(),
            d.draftees_lost
        );
        if r.success {
            let _ = writeln!(
                out,
                "Land conquered {}, generated {}",
                r.land_conquered(),
                r.land_generated()
            );
        }
        if a.conversions.total() > 0 {
            let _ = writeln!(out, "{} new units converted", a.conversions.total());
        }
        if a.prestige_change != 0 {
            let _ = writeln!(out, "Prestige {:+}", a.prestige_change);
        }
        let _ = writeln!(out, "Morale {:+}", a.morale_change);
        let _ = write!(out, "Units return in {} ticks", a.return_ticks);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(success: bool, overwhelmed: bool) -> InvasionResult {
        InvasionResult {
            version: AUDIT_VERSION,
            attacker: DominionId(1),
            defender: DominionId(2),
            tick: 10,
            range: 80.0,
            success,
            overwhelmed,
            op: 1000.0,
            dp: 900.0,
            temple_reduction: 0.0,
            ambush_reduction: 0.0,
            allied: false,
            repeat_invasion: false,
            land: LandTransfer::default(),
            attacker_outcome: AttackerOutcome {
                units_sent: SlotCounts::new([100, 0, 0, 0]),
                units_lost: SlotCounts::new([8, 0, 0, 0]),
                return_ticks: 12,
                morale_change: 15,
                ..AttackerOutcome::default()
            },
            defender_outcome: DefenderOutcome::default(),
        }
    }

    #[test]
    fn test_audit_roundtrip() {
        let r = result(true, false);
        let bytes = r.to_audit_bytes().unwrap();
        assert_eq!(InvasionResult::from_audit_bytes(&bytes).unwrap(), r);
    }

    #[test]
    fn test_audit_rejects_garbage() {
        assert!(InvasionResult::from_audit_bytes(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_headlines() {
        let success = result(true, false);
        let report = InvasionReport::new(&success, "Aria", "Brom");
        assert!(report.headline().starts_with("Aria invaded Brom"));

        let overwhelmed = result(false, true);
        let report = InvasionReport::new(&overwhelmed, "Aria", "Brom");
        assert!(report.headline().contains("overwhelming"));

        let repelled = result(false, false);
        let report = InvasionReport::new(&repelled, "Aria", "Brom");
        assert_eq!(report.headline(), "Brom repelled an invasion by Aria");
    }

    #[test]
    fn test_summary_lines() {
        let r = result(true, false);
        let summary = InvasionReport::new(&r, "Aria", "Brom").summary();
        assert!(summary.contains("Attacker lost 8 units"));
        assert!(summary.contains("Morale +15"));
        assert!(summary.ends_with("Units return in 12 ticks"));
    }
}
