//! Property tests for the invariants every invasion must keep.

use std::collections::BTreeSet;

use dominion_core::casualties::{CasualtyContext, OpposingForce};
use dominion_core::invasion::morale_change;
use dominion_core::prelude::*;
use dominion_test_utils::fixtures::{attacker, defender, order, races, world, DominionBuilder};
use dominion_test_utils::strategies::{human_dominion, morale, range_percent, terrain_acres};
use proptest::prelude::*;

proptest! {
    /// A battle is never both won and overwhelmed, and the winner always
    /// had strictly more power.
    #[test]
    fn prop_overwhelmed_never_succeeds(
        target in human_dominion(2),
        sent in 1u64..=100,
    ) {
        let world = world([attacker(), target]);
        let order = order(&[(1, sent as i64)]);
        if let Ok(resolution) = world.preview(DominionId(1), DominionId(2), &order) {
            let result = resolution.result;
            prop_assert!(!(result.overwhelmed && result.success));
            prop_assert_eq!(result.success, result.op > result.dp);
            if !result.success {
                prop_assert_eq!(result.land_conquered(), 0);
            }
        }
    }

    /// Land removed from the defender equals land conquered on every
    /// terrain, and generated land never exceeds it.
    #[test]
    fn prop_land_conserved_per_terrain(
        acres in terrain_acres(50),
        farms in 0u64..=1_000,
        attacker_land in 100u64..10_000,
        range in range_percent(),
        ratio in 0.0f64..=1.0,
    ) {
        let mut builder = DominionBuilder::new(2, "human");
        for (terrain, acres) in Terrain::ALL.into_iter().zip(acres) {
            builder = builder.land(terrain, acres);
        }
        let target = builder.build();
        let farms = farms.min(target.territory.land_of(Terrain::Plain));
        let mut territory = target.territory.clone();
        territory.buildings.insert(BuildingKind::Farm, farms);

        let config = GameConfig::default();
        let engine = LandEngine::new(&config);
        let transfer = engine.transfer(attacker_land, &territory, range, ratio);

        prop_assert_eq!(
            transfer.conquered(),
            engine.acres_lost(attacker_land, territory.total_land(), range)
        );
        for terrain in Terrain::ALL {
            let conquered = transfer.conquered_on(terrain);
            prop_assert!(conquered <= territory.land_of(terrain));
            prop_assert!(transfer.generated_on(terrain) <= conquered);
            prop_assert_eq!(
                -transfer.defender_delta().get(DeltaKey::Land(terrain)),
                conquered as i64
            );
            prop_assert_eq!(
                transfer.attacker_delta().get(DeltaKey::Land(terrain)),
                (conquered + transfer.generated_on(terrain)) as i64
            );
        }
        for loss in transfer.lost.values() {
            let parts = loss.barren
                + loss.buildings.values().sum::<u64>()
                + loss.queued.values().sum::<u64>();
            prop_assert_eq!(parts, loss.acres);
        }
    }

    /// Acres lost stay between the minimum and everything the defender owns.
    #[test]
    fn prop_acres_lost_bounded(
        attacker_land in 1u64..20_000,
        defender_land in 0u64..20_000,
        range in range_percent(),
    ) {
        let config = GameConfig::default();
        let lost = LandEngine::new(&config).acres_lost(attacker_land, defender_land, range);
        prop_assert!(lost <= defender_land);
        prop_assert!(lost >= config.min_acres_lost.min(defender_land));
    }

    /// No pile of reductions pushes a multiplier under the floor.
    #[test]
    fn prop_casualty_multiplier_floor(
        shrines in 0u64..=1_000,
        infirmary in 0u64..1_000_000,
        research in 0.0f64..200.0,
    ) {
        let config = GameConfig::default();
        let races = races();
        let mut own = DominionBuilder::new(1, "human")
            .land(Terrain::Plain, 1_000)
            .building(BuildingKind::Shrine, shrines)
            .improvement(Improvement::Infirmary, infirmary)
            .build();
        own.tech.fewer_casualties_offense = research;
        own.tech.fewer_casualties_defense = research;
        let opponent = defender(2, 800);
        let committed = SlotCounts::new([100, 100, 100, 100]);
        let opposing = OpposingForce {
            per_unit: [0.0, 3.0, 0.0, 0.0],
            units: opponent.military.home,
            other_raw: 0.0,
        };
        let ctx = CasualtyContext {
            own: &own,
            opponent: &opponent,
            committed: &committed,
            range: 80.0,
            overwhelmed: false,
            opposing: &opposing,
        };

        let engine = CasualtyEngine::new(&config, &races, &NoEffects);
        for side in [Side::Offense, Side::Defense] {
            for rate in engine.rates(&ctx, side).unwrap() {
                if let CasualtyRate::Scaled(multiplier) = rate {
                    prop_assert!(multiplier >= config.casualty_multiplier_floor - 1e-12);
                }
            }
        }
        let draftees = engine.draftee_rate(&ctx).unwrap();
        prop_assert!(draftees.share(1.0) >= config.casualty_multiplier_floor - 1e-12);
    }

    /// Starvation never kills more than twice the deficit or 2% of the
    /// population, takes every peasant it can before any soldier, and never
    /// more than a pool holds.
    #[test]
    fn prop_starvation_bounded(
        dominion in human_dominion(1),
        deficit in 0u64..100_000,
    ) {
        let config = GameConfig::default();
        let races = races();
        let losses = CasualtyEngine::new(&config, &races, &NoEffects).starvation(&dominion, deficit);

        let by_deficit = (deficit as f64 * config.starvation_deficit_multiplier).floor() as u64;
        let by_population =
            (dominion.population() as f64 * config.starvation_population_max).floor() as u64;
        let target = by_deficit.min(by_population);
        prop_assert!(losses.total() <= target);
        prop_assert_eq!(losses.peasants, target.min(dominion.peasants));
        if losses.military() > 0 {
            prop_assert_eq!(losses.peasants, dominion.peasants);
        }
        prop_assert!(losses.draftees <= dominion.military.draftees);
        for slot in Slot::ALL {
            prop_assert!(losses.units[slot] <= dominion.military.home[slot]);
        }
    }

    /// Morale never drops below zero.
    #[test]
    fn prop_morale_never_negative(current in morale(), change in -100i64..=100) {
        prop_assert!(i64::from(current) + morale_change(current, change) >= 0);
    }

    /// Every queued entry is delivered exactly once, on its tick.
    #[test]
    fn prop_deferred_delivery_once(delays in prop::collection::vec(1u32..30, 1..20)) {
        let mut queue = DeferredQueue::new();
        let mut expected = Vec::new();
        for (index, &delay) in delays.iter().enumerate() {
            let mut delta = DominionDelta::new();
            delta.gain(DeltaKey::Peasants, index as u64 + 1);
            let id = queue.schedule(DominionId(1), delta, delay);
            expected.push((id, delay));
        }

        let mut seen = BTreeSet::new();
        for tick in 1..=30u32 {
            queue.advance_tick();
            for entry in queue.deliver_due() {
                prop_assert!(seen.insert(entry.id), "delivered twice");
                let due = expected.iter().find(|(id, _)| *id == entry.id).map(|(_, d)| *d);
                prop_assert_eq!(due, Some(tick));
            }
            prop_assert!(queue.deliver_due().is_empty());
        }
        prop_assert_eq!(seen.len(), delays.len());
        prop_assert!(queue.is_empty());
    }
}
