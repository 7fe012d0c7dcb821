//! Proptest strategies for dominions and orders.

use proptest::prelude::*;

use dominion_core::dominion::Dominion;
use dominion_core::land::Terrain;
use dominion_core::units::SlotCounts;

use crate::fixtures::DominionBuilder;

/// Per-slot counts up to `max` each.
pub fn slot_counts(max: u64) -> impl Strategy<Value = SlotCounts> {
    prop::array::uniform4(0..=max).prop_map(SlotCounts::new)
}

/// Acres per terrain, at least `min_total` overall.
pub fn terrain_acres(min_total: u64) -> impl Strategy<Value = [u64; 6]> {
    prop::array::uniform6(0u64..2_000).prop_map(move |mut acres| {
        let total: u64 = acres.iter().sum();
        if total < min_total {
            acres[0] += min_total - total;
        }
        acres
    })
}

/// Relative size in percent, covering every land-loss segment.
pub fn range_percent() -> impl Strategy<Value = f64> {
    40.0f64..=150.0
}

/// Morale across the playable span, above the soft ceiling included.
pub fn morale() -> impl Strategy<Value = u32> {
    0u32..=120
}

/// A human dominion with random land, units and draftees.
pub fn human_dominion(id: u64) -> impl Strategy<Value = Dominion> {
    (terrain_acres(100), slot_counts(5_000), 0u64..10_000, 0u64..50_000).prop_map(
        move |(acres, units, draftees, peasants)| {
            let mut builder = DominionBuilder::new(id, "human");
            for (terrain, acres) in Terrain::ALL.into_iter().zip(acres) {
                builder = builder.land(terrain, acres);
            }
            builder
                .units(units.0)
                .draftees(draftees)
                .peasants(peasants)
                .build()
        },
    )
}
