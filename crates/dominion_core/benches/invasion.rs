//! Invasion benchmarks for dominion_core.
//!
//! Run with: `cargo bench -p dominion_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dominion_core::prelude::*;
use dominion_test_utils::fixtures::{attacker, defender, order, races, round, world};

/// Power calculation for a single force.
pub fn power_benchmark(c: &mut Criterion) {
    let config = GameConfig::default();
    let races = races();
    let round = round();
    let engine = PowerEngine::new(&config, &races, &NoEffects, &round);
    let a = attacker();
    let d = defender(2, 500);

    c.bench_function("offensive_power", |b| {
        b.iter(|| {
            engine
                .offensive_power(black_box(&a), &Matchup::against(&d, 83.3))
                .unwrap_or_default()
        })
    });
    c.bench_function("defensive_power", |b| {
        b.iter(|| {
            engine
                .defensive_power(black_box(&d), &Matchup::alone(), &DefenseOptions::default())
                .unwrap_or_default()
        })
    });
}

/// Full resolution without committing.
pub fn resolve_benchmark(c: &mut Criterion) {
    let world = world([attacker(), defender(2, 500)]);
    let order = order(&[(1, 100)]);

    c.bench_function("resolve_invasion", |b| {
        b.iter(|| {
            world
                .preview(DominionId(1), DominionId(2), black_box(&order))
                .map(|r| r.result.land_conquered())
                .unwrap_or_default()
        })
    });
}

/// Resolve, commit and deliver every returning army.
pub fn round_trip_benchmark(c: &mut Criterion) {
    c.bench_function("invade_and_return", |b| {
        b.iter(|| {
            let mut world = world([attacker(), defender(2, 500)]);
            let _ = world.invade(DominionId(1), DominionId(2), &order(&[(1, 100)]));
            for _ in 0..12 {
                let _ = world.tick();
            }
            black_box(world.get(DominionId(1)).map(|d| d.total_land()).unwrap_or_default())
        })
    });
}

criterion_group!(benches, power_benchmark, resolve_benchmark, round_trip_benchmark);
criterion_main!(benches);
