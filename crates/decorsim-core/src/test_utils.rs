//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use std::collections::{BTreeMap, BTreeSet};

use crate::buffer::ResourceKind;
use crate::device::{DeviceKind, Phase};
use crate::fixed::Fixed64;
use crate::pos::{BlockPos, Direction};
use crate::sim::Simulation;
use crate::world::{Effect, Environment, ItemKind, ParticleKind, ResourceSink, World};

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Sink tank
// ===========================================================================

/// A plain bounded tank standing in for a foreign acceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkTank {
    pub resource: ResourceKind,
    pub amount: u32,
    pub capacity: u32,
    pub max_rate: u32,
}

impl ResourceSink for SinkTank {
    fn receiving(&self, resource: ResourceKind) -> bool {
        resource == self.resource && self.amount < self.capacity
    }

    fn receive(&mut self, resource: ResourceKind, amount: u32) -> u32 {
        if resource != self.resource {
            return 0;
        }
        let accepted = amount.min(self.max_rate).min(self.capacity - self.amount);
        self.amount += accepted;
        accepted
    }
}

// ===========================================================================
// Mock world
// ===========================================================================

/// In-memory [`World`] recording every write.
#[derive(Debug, Clone, Default)]
pub struct MockWorld {
    pub default_environment: Environment,
    pub environments: BTreeMap<BlockPos, Environment>,
    pub trees: BTreeSet<BlockPos>,
    /// Positions whose block no longer backs a device.
    pub invalid: BTreeSet<BlockPos>,
    pub sinks: BTreeMap<BlockPos, SinkTank>,
    pub harvested: Vec<BlockPos>,
    pub phases: Vec<(BlockPos, Phase)>,
    pub effects: Vec<(BlockPos, Effect)>,
    pub particles: Vec<(BlockPos, ParticleKind, u32)>,
    pub drops: Vec<(BlockPos, ItemKind, u32)>,
}

impl MockWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable environment at `pos`, created from the default on first use.
    pub fn environment_at(&mut self, pos: BlockPos) -> &mut Environment {
        let default = self.default_environment;
        self.environments.entry(pos).or_insert(default)
    }

    pub fn add_tree(&mut self, pos: BlockPos) {
        self.trees.insert(pos);
    }

    pub fn add_sink(&mut self, pos: BlockPos, resource: ResourceKind, capacity: u32, max_rate: u32) {
        self.sinks.insert(
            pos,
            SinkTank {
                resource,
                amount: 0,
                capacity,
                max_rate,
            },
        );
    }

    pub fn sink_amount(&self, pos: BlockPos) -> u32 {
        self.sinks.get(&pos).map_or(0, |s| s.amount)
    }

    pub fn effect_count(&self, effect: Effect) -> usize {
        self.effects.iter().filter(|(_, e)| *e == effect).count()
    }
}

impl World for MockWorld {
    fn environment(&self, pos: BlockPos) -> Environment {
        self.environments.get(&pos).copied().unwrap_or(self.default_environment)
    }

    fn block_matches(&self, pos: BlockPos, _kind: DeviceKind) -> bool {
        !self.invalid.contains(&pos)
    }

    fn can_harvest(&self, pos: BlockPos) -> bool {
        self.trees.contains(&pos)
    }

    fn harvest(&mut self, pos: BlockPos) {
        self.trees.remove(&pos);
        self.harvested.push(pos);
    }

    fn set_phase(&mut self, pos: BlockPos, phase: Phase) {
        self.phases.push((pos, phase));
    }

    fn play_effect(&mut self, pos: BlockPos, effect: Effect) {
        self.effects.push((pos, effect));
    }

    fn spawn_particles(&mut self, pos: BlockPos, kind: ParticleKind, count: u32) {
        self.particles.push((pos, kind, count));
    }

    fn drop_item(&mut self, pos: BlockPos, item: ItemKind, count: u32) {
        self.drops.push((pos, item, count));
    }

    fn sink(&mut self, pos: BlockPos, _side: Direction, resource: ResourceKind) -> Option<&mut dyn ResourceSink> {
        self.sinks
            .get_mut(&pos)
            .filter(|s| s.resource == resource)
            .map(|s| s as &mut dyn ResourceSink)
    }
}

// ===========================================================================
// Simulation helpers
// ===========================================================================

/// Offer `amount` through the top face in as many transfers as the device's
/// per-transfer cap requires. Returns the total accepted.
pub fn offer_all(sim: &mut Simulation, world: &mut MockWorld, pos: BlockPos, resource: ResourceKind, amount: u32) -> u32 {
    let mut total = 0;
    while total < amount {
        let accepted = sim.offer(world, pos, Direction::Up, resource, amount - total);
        if accepted == 0 {
            break;
        }
        total += accepted;
    }
    total
}

/// A square field of solar panels with freezers underneath, `side * side`
/// columns starting at the origin.
pub fn panel_field(sim: &mut Simulation, side: i32) {
    use crate::device::DeviceSpec;
    for x in 0..side {
        for z in 0..side {
            let top = BlockPos::new(x, 65, z);
            let _ = sim.place(DeviceSpec::SolarPanel, top, Direction::North);
            let _ = sim.place(DeviceSpec::Freezer, top.below(), Direction::North);
        }
    }
}
