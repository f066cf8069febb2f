//! Criterion benchmarks for the decorsim simulation.
//!
//! - `panel_field`: solar panels over freezers, all ticking.
//! - `snapshot`: serialize and deserialize a large field.

use criterion::{Criterion, criterion_group, criterion_main};
use decorsim_core::buffer::ResourceKind;
use decorsim_core::capability::CapabilityRegistry;
use decorsim_core::config::SimConfig;
use decorsim_core::pos::BlockPos;
use decorsim_core::sim::Simulation;
use decorsim_core::test_utils::*;

/// `side * side` panel columns, each freezer primed with water.
fn build_field(side: i32) -> (Simulation, MockWorld) {
    let mut sim = Simulation::with_config(SimConfig::default());
    let mut world = MockWorld::new();
    panel_field(&mut sim, side);
    for x in 0..side {
        for z in 0..side {
            offer_all(&mut sim, &mut world, BlockPos::new(x, 64, z), ResourceKind::Fluid, 1000);
        }
    }
    // Warm up past the first recalculation.
    sim.run(&mut world, 40);
    (sim, world)
}

fn bench_panel_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("panel_field");
    group.sample_size(50);

    let (mut sim, mut world) = build_field(32);
    group.bench_function("2048_devices_step", |b| {
        b.iter(|| {
            sim.step(&mut world);
            world.phases.clear();
            world.effects.clear();
        });
    });

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");
    group.sample_size(30);

    let (sim, _) = build_field(32);
    group.bench_function("serialize_2048_devices", |b| {
        b.iter(|| {
            sim.serialize().unwrap();
        });
    });

    let data = sim.serialize().unwrap();
    group.bench_function("deserialize_2048_devices", |b| {
        b.iter(|| {
            Simulation::deserialize(&data, SimConfig::default(), CapabilityRegistry::standard()).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_panel_field, bench_snapshot);
criterion_main!(benches);
