//! Property-based tests for the decorsim core.
//!
//! Buffer bounds, conservation across exchange calls, balancer fixed points
//! and run-to-run determinism.

use decorsim_core::buffer::{ResourceBuffer, ResourceKind};
use decorsim_core::config::SimConfig;
use decorsim_core::device::{DeviceSpec, SaveData, ValveMode};
use decorsim_core::pos::{BlockPos, Direction};
use decorsim_core::sim::Simulation;
use decorsim_core::test_utils::*;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone)]
enum BufferOp {
    Fill(u32),
    Drain(u32),
    Receive(u32),
    Extract(u32),
}

fn arb_buffer_ops(max_ops: usize) -> impl Strategy<Value = Vec<BufferOp>> {
    proptest::collection::vec(
        prop_oneof![
            any::<u32>().prop_map(BufferOp::Fill),
            any::<u32>().prop_map(BufferOp::Drain),
            (0..5000u32).prop_map(BufferOp::Receive),
            (0..5000u32).prop_map(BufferOp::Extract),
        ],
        1..=max_ops,
    )
}

fn arb_spec() -> impl Strategy<Value = DeviceSpec> {
    prop_oneof![
        Just(DeviceSpec::Freezer),
        Just(DeviceSpec::SolarPanel),
        Just(DeviceSpec::TreeCutter),
        Just(DeviceSpec::PipeValve(ValveMode::Check)),
        Just(DeviceSpec::PipeValve(ValveMode::Analog)),
        Just(DeviceSpec::Hatch),
        Just(DeviceSpec::Gate),
    ]
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    (0..6usize).prop_map(|i| Direction::ALL[i])
}

/// Devices on a small 3x3x3 cube; later placements at taken positions are
/// rejected by the simulation.
fn arb_layout(max: usize) -> impl Strategy<Value = Vec<(DeviceSpec, BlockPos, Direction)>> {
    proptest::collection::vec(
        (arb_spec(), 0..3i32, 0..3i32, 0..3i32, arb_direction())
            .prop_map(|(spec, x, y, z, dir)| (spec, BlockPos::new(x, 64 + y, z), dir)),
        1..=max,
    )
}

fn build(layout: &[(DeviceSpec, BlockPos, Direction)]) -> Simulation {
    let mut sim = Simulation::with_config(SimConfig::default());
    for &(spec, pos, dir) in layout {
        let _ = sim.place(spec, pos, dir);
    }
    sim
}

fn energy_blob(amount: u32) -> SaveData {
    let mut data = SaveData::default();
    data.put("energy", i64::from(amount));
    data
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #[test]
    fn buffer_stays_within_bounds(
        capacity in 0..100_000u32,
        max_transfer in 0..10_000u32,
        ops in arb_buffer_ops(64),
    ) {
        let mut buffer = ResourceBuffer::new(capacity, max_transfer);
        for op in ops {
            let before = buffer.amount();
            match op {
                BufferOp::Fill(n) => {
                    let accepted = buffer.fill(n);
                    prop_assert!(accepted <= n);
                    prop_assert_eq!(buffer.amount(), before + accepted);
                }
                BufferOp::Drain(n) => {
                    let removed = buffer.drain(n);
                    prop_assert!(removed <= n);
                    prop_assert_eq!(buffer.amount(), before - removed);
                }
                BufferOp::Receive(n) => {
                    let accepted = buffer.receive(n);
                    prop_assert!(accepted <= buffer.max_transfer());
                }
                BufferOp::Extract(n) => {
                    let removed = buffer.extract(n);
                    prop_assert!(removed <= buffer.max_transfer());
                }
            }
            prop_assert!(buffer.amount() <= buffer.capacity());
            prop_assert!(buffer.level_fraction() <= decorsim_core::fixed::Fixed64::ONE);
        }
    }

    #[test]
    fn host_offers_are_conserved(
        layout in arb_layout(12),
        offers in proptest::collection::vec((0..3i32, 0..3i32, 0..3i32, arb_direction(), 0..20_000u32), 1..20),
    ) {
        let mut sim = build(&layout);
        let mut world = MockWorld::new();
        for (x, y, z, side, amount) in offers {
            let pos = BlockPos::new(x, 64 + y, z);
            let before = sim.total(ResourceKind::Fluid);
            let accepted = sim.offer(&mut world, pos, side, ResourceKind::Fluid, amount);
            prop_assert!(accepted <= amount);
            prop_assert_eq!(sim.total(ResourceKind::Fluid), before + u64::from(accepted));
        }
    }

    #[test]
    fn shaded_network_conserves_energy(
        layout in arb_layout(16),
        charges in proptest::collection::vec(0..64_000u32, 16),
    ) {
        // No sky, no trees, no fluid: nothing produces or consumes energy,
        // so every push and balancing move must conserve the total.
        let mut sim = build(&layout);
        let mut world = MockWorld::new();
        world.default_environment.sky_visible = false;
        let positions: Vec<BlockPos> = sim.devices().map(|(_, d)| d.pos()).collect();
        for (pos, charge) in positions.iter().zip(charges) {
            sim.load_device(*pos, &energy_blob(charge));
        }
        let total = sim.total(ResourceKind::Energy);
        for _ in 0..200 {
            sim.step(&mut world);
            prop_assert_eq!(sim.total(ResourceKind::Energy), total);
        }
    }

    #[test]
    fn identical_runs_are_identical(layout in arb_layout(16), ticks in 1..300u64) {
        let run = || {
            let mut sim = build(&layout);
            let mut world = MockWorld::new();
            world.add_tree(BlockPos::new(1, 65, -1));
            world.default_environment.redstone_signal = 7;
            let mut events = sim.run(&mut world, ticks);
            events.truncate(64);
            (sim.state_hash(), events)
        };
        prop_assert_eq!(run(), run());
    }

    #[test]
    fn balancing_reaches_a_fixed_point(amounts in proptest::collection::vec(0..64_000u32, 2..6)) {
        let mut sim = Simulation::with_config(SimConfig::default());
        let mut world = MockWorld::new();
        world.default_environment.sky_visible = false;
        let positions: Vec<BlockPos> = (0..amounts.len() as i32).map(|x| BlockPos::new(x, 64, 0)).collect();
        for (pos, amount) in positions.iter().zip(&amounts) {
            sim.place(DeviceSpec::SolarPanel, *pos, Direction::North).unwrap();
            sim.load_device(*pos, &energy_blob(*amount));
        }
        let total = sim.total(ResourceKind::Energy);

        let mut rounds = 0;
        loop {
            let moved: u32 = positions.iter().map(|p| sim.balance(&mut world, *p)).sum();
            if moved == 0 {
                break;
            }
            rounds += 1;
            prop_assert!(rounds < 1000);
        }
        let again: u32 = positions.iter().map(|p| sim.balance(&mut world, *p)).sum();
        prop_assert_eq!(again, 0);
        prop_assert_eq!(sim.total(ResourceKind::Energy), total);
        let threshold = sim.config().solar_panel.balancing_threshold();
        for pair in positions.windows(2) {
            let a = sim.device_at(pair[0]).unwrap().amount(ResourceKind::Energy);
            let b = sim.device_at(pair[1]).unwrap().amount(ResourceKind::Energy);
            prop_assert!(a.abs_diff(b) <= threshold || a.max(b) < threshold);
        }
    }
}
