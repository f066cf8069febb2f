//! The simulation driver and state hashing.
//!
//! [`Simulation`] owns every device, the position grid and the capability
//! registry. The host calls [`Simulation::step`] once per world tick;
//! devices are visited in placement order, which makes cross-device
//! allocation reproducible.

use std::collections::BTreeMap;

use slotmap::SlotMap;
use tracing::debug;

use crate::buffer::ResourceKind;
use crate::capability::CapabilityRegistry;
use crate::config::SimConfig;
use crate::device::{Device, DeviceKind, DeviceSpec, KindState, Phase, SaveData};
use crate::event::DeviceEvent;
use crate::exchange::Exchange;
use crate::fixed::{Fixed64, Ticks};
use crate::id::DeviceId;
use crate::kinds::{self, Interaction, solar};
use crate::pos::{BlockPos, Direction};
use crate::world::{ItemKind, World};

// ---------------------------------------------------------------------------
// Errors and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaceError {
    #[error("a {existing:?} device already occupies {pos:?}")]
    Occupied { pos: BlockPos, existing: DeviceKind },
}

/// What became of a removed device's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub id: DeviceId,
    pub kind: DeviceKind,
    /// Item handed to the world in place of the device state.
    pub dropped: Option<ItemKind>,
    pub discarded_energy: u32,
    pub discarded_fluid: u32,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

pub struct Simulation {
    pub(crate) devices: SlotMap<DeviceId, Device>,
    pub(crate) grid: BTreeMap<BlockPos, DeviceId>,
    /// Live devices in placement order.
    pub(crate) order: Vec<DeviceId>,
    pub(crate) registry: CapabilityRegistry,
    pub(crate) config: SimConfig,
    pub(crate) tick: Ticks,
    /// Events raised outside of `step`, returned by the next `step`.
    pub(crate) pending: Vec<DeviceEvent>,
}

impl Simulation {
    /// Create an empty simulation. The configuration is validated (clamped)
    /// once here and immutable afterwards.
    pub fn new(config: SimConfig, registry: CapabilityRegistry) -> Self {
        Self {
            devices: SlotMap::with_key(),
            grid: BTreeMap::new(),
            order: Vec::new(),
            registry,
            config: config.validated(),
            tick: 0,
            pending: Vec::new(),
        }
    }

    /// A simulation with the standard capability registry.
    pub fn with_config(config: SimConfig) -> Self {
        Self::new(config, CapabilityRegistry::standard())
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Number of completed world ticks.
    pub fn tick(&self) -> Ticks {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn exchange<'a>(&'a mut self, world: &'a mut dyn World) -> Exchange<'a> {
        Exchange {
            devices: &mut self.devices,
            grid: &self.grid,
            registry: &self.registry,
            config: &self.config,
            world,
            events: &mut self.pending,
            tick: self.tick,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Create a device for a newly placed block. Buffers start empty.
    pub fn place(&mut self, spec: DeviceSpec, pos: BlockPos, facing: Direction) -> Result<DeviceId, PlaceError> {
        if let Some(existing) = self.device_at(pos) {
            return Err(PlaceError::Occupied {
                pos,
                existing: existing.kind(),
            });
        }
        let device = Device::new(spec, pos, facing, &self.config);
        let id = self.devices.insert(device);
        self.grid.insert(pos, id);
        self.order.push(id);
        debug!(?id, ?spec, ?pos, ?facing, "device placed");
        Ok(id)
    }

    /// Remove the device at `pos`. It stops ticking at once; its frozen
    /// product (if any) is dropped into the world and everything else is
    /// discarded.
    pub fn remove(&mut self, world: &mut dyn World, pos: BlockPos) -> Option<Removal> {
        let id = self.grid.remove(&pos)?;
        self.order.retain(|&o| o != id);
        let device = self.devices.remove(id)?;
        let dropped = kinds::removal_drop(&device);
        if let Some(item) = dropped {
            world.drop_item(pos, item, 1);
        }
        let removal = Removal {
            id,
            kind: device.kind(),
            dropped,
            discarded_energy: device.amount(ResourceKind::Energy),
            discarded_fluid: device.amount(ResourceKind::Fluid),
        };
        debug!(?id, kind = ?removal.kind, ?pos, ?dropped, "device removed");
        self.pending.push(DeviceEvent::Removed {
            device: id,
            kind: removal.kind,
            pos,
            dropped,
            tick: self.tick,
        });
        Some(removal)
    }

    // -----------------------------------------------------------------------
    // Ticking
    // -----------------------------------------------------------------------

    /// Advance one world tick: every live device is ticked once, in
    /// placement order. Returns the events raised since the last step.
    pub fn step(&mut self, world: &mut dyn World) -> Vec<DeviceEvent> {
        for i in 0..self.order.len() {
            let id = self.order[i];
            let mut ex = self.exchange(&mut *world);
            kinds::tick(&mut ex, id);
        }
        self.tick += 1;
        std::mem::take(&mut self.pending)
    }

    /// Run `ticks` steps, collecting all events.
    pub fn run(&mut self, world: &mut dyn World, ticks: u64) -> Vec<DeviceEvent> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            events.extend(self.step(&mut *world));
        }
        events
    }

    // -----------------------------------------------------------------------
    // Host-facing operations
    // -----------------------------------------------------------------------

    /// Offer `amount` of `resource` into the face `side` of the device at
    /// `pos`, as a cable, pipe or bucket of the host would. Returns the
    /// accepted amount; the caller keeps the rest.
    pub fn offer(
        &mut self,
        world: &mut dyn World,
        pos: BlockPos,
        side: Direction,
        resource: ResourceKind,
        amount: u32,
    ) -> u32 {
        let Some(id) = self.id_at(pos) else {
            return 0;
        };
        let mut ex = self.exchange(world);
        ex.offer_to(id, resource, side, amount)
    }

    /// Player interaction: toggles hatches and gates, takes ice out of a
    /// freezer. `None` when there is no device at `pos`.
    pub fn interact(&mut self, world: &mut dyn World, pos: BlockPos) -> Option<Interaction> {
        let id = self.id_at(pos)?;
        let mut ex = self.exchange(world);
        Some(kinds::interact(&mut ex, id))
    }

    /// Run one balancing pass for the producer at `pos` against its
    /// current peers. Returns the amount moved.
    pub fn balance(&mut self, world: &mut dyn World, pos: BlockPos) -> u32 {
        let Some(id) = self.id_at(pos) else {
            return 0;
        };
        let mut ex = self.exchange(world);
        let peers = crate::balancer::discover_peers(&mut ex, id, &solar::FEED_DIRECTIONS);
        crate::balancer::balance(&mut ex, id, &peers)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    pub(crate) fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.get_mut(id)
    }

    pub fn id_at(&self, pos: BlockPos) -> Option<DeviceId> {
        self.grid.get(&pos).copied()
    }

    pub fn device_at(&self, pos: BlockPos) -> Option<&Device> {
        self.id_at(pos).and_then(|id| self.devices.get(id))
    }

    /// Live devices in placement order.
    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &Device)> {
        self.order.iter().filter_map(|&id| self.devices.get(id).map(|d| (id, d)))
    }

    /// Total amount of `resource` held by all devices.
    pub fn total(&self, resource: ResourceKind) -> u64 {
        self.devices().map(|(_, d)| u64::from(d.amount(resource))).sum()
    }

    /// Comparator signal of the device at `pos`: freezer stage or buffer
    /// fill level.
    pub fn comparator_output(&self, pos: BlockPos) -> u8 {
        let Some(device) = self.device_at(pos) else {
            return 0;
        };
        match device.phase() {
            Phase::Freezer(phase) => phase.comparator_output(),
            _ => device
                .buffer(ResourceKind::Energy)
                .map_or(0, |b| (b.level_fraction() * Fixed64::from_num(15)).to_num::<u8>()),
        }
    }

    // -----------------------------------------------------------------------
    // Per-device save data
    // -----------------------------------------------------------------------

    pub fn save_device(&self, pos: BlockPos) -> Option<SaveData> {
        self.device_at(pos).map(Device::save)
    }

    /// Restore a device from its save blob. Returns `false` when there is no
    /// device at `pos`.
    pub fn load_device(&mut self, pos: BlockPos, data: &SaveData) -> bool {
        let Some(id) = self.id_at(pos) else {
            return false;
        };
        match self.devices.get_mut(id) {
            Some(device) => {
                device.load(data);
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Hashing
    // -----------------------------------------------------------------------

    /// Deterministic hash of the whole simulation state.
    pub fn state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.tick);
        for (_, device) in self.devices() {
            hash_device(&mut hasher, device);
        }
        hasher.finish()
    }
}

fn hash_device(hasher: &mut StateHash, device: &Device) {
    hasher.write_u32(device.kind() as u32);
    hasher.write_i32(device.pos().x);
    hasher.write_i32(device.pos().y);
    hasher.write_i32(device.pos().z);
    hasher.write_u32(device.facing().index() as u32);
    hasher.write_u32(device.amount(ResourceKind::Energy));
    hasher.write_u32(device.amount(ResourceKind::Fluid));
    hasher.write_u32(device.progress());
    hasher.write_u32(device.throttle().remaining());
    match device.phase() {
        Phase::Inert => hasher.write_u32(0),
        Phase::Freezer(p) => {
            hasher.write_u32(1);
            hasher.write_u32(u32::from(p.index()));
        }
        Phase::Exposition(e) => {
            hasher.write_u32(2);
            hasher.write_u32(u32::from(e));
        }
        Phase::Active(a) => {
            hasher.write_u32(3);
            hasher.write_u32(u32::from(a));
        }
        Phase::Open(o) => {
            hasher.write_u32(4);
            hasher.write_u32(u32::from(o));
        }
    }
    match device.state() {
        KindState::SolarPanel(s) => {
            hasher.write_u32(s.recalc.remaining());
            hasher.write_u64(s.rng.state());
            hasher.write_u32(s.production);
            hasher.write_u32(s.feed_in);
            hasher.write_u32(u32::from(s.output_enabled));
        }
        KindState::TreeCutter(s) => hasher.write_u32(s.active_timer),
        KindState::Hatch(s) | KindState::Gate(s) => {
            hasher.write_u32(u32::from(s.powered));
            hasher.write_u32(u32::from(s.open));
        }
        KindState::PipeValve(s) => hasher.write_u32(s.mode as u32),
        KindState::Freezer => {}
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for desync detection.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write(&v.to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{FreezerPhase, ValveMode};
    use crate::test_utils::{MockWorld, offer_all};

    const ORIGIN: BlockPos = BlockPos::new(0, 64, 0);

    fn sim() -> Simulation {
        Simulation::with_config(SimConfig::default())
    }

    #[test]
    fn place_rejects_occupied_position() {
        let mut sim = sim();
        sim.place(DeviceSpec::Freezer, ORIGIN, Direction::North).unwrap();
        let err = sim.place(DeviceSpec::Hatch, ORIGIN, Direction::North).unwrap_err();
        assert_eq!(
            err,
            PlaceError::Occupied {
                pos: ORIGIN,
                existing: DeviceKind::Freezer
            }
        );
        assert_eq!(sim.len(), 1);
    }

    #[test]
    fn removed_devices_stop_ticking_and_free_the_position() {
        let mut sim = sim();
        let mut world = MockWorld::new();
        let id = sim.place(DeviceSpec::SolarPanel, ORIGIN, Direction::North).unwrap();
        sim.step(&mut world);
        let removal = sim.remove(&mut world, ORIGIN).unwrap();
        assert_eq!(removal.id, id);
        assert_eq!(removal.discarded_energy, 40 * 32);
        assert!(sim.device(id).is_none());
        assert!(sim.is_empty());
        let events = sim.step(&mut world);
        assert!(matches!(events.as_slice(), [DeviceEvent::Removed { .. }]));
        assert!(sim.remove(&mut world, ORIGIN).is_none());
        let again = sim.place(DeviceSpec::SolarPanel, ORIGIN, Direction::North).unwrap();
        assert_ne!(again, id);
    }

    #[test]
    fn removing_a_frozen_freezer_drops_its_product() {
        let mut sim = Simulation::with_config(SimConfig {
            freezer: crate::config::FreezerConfig {
                tick_interval: 1,
                ..Default::default()
            },
            ..SimConfig::default()
        });
        let mut world = MockWorld::new();
        sim.place(DeviceSpec::Freezer, ORIGIN, Direction::North).unwrap();
        offer_all(&mut sim, &mut world, ORIGIN, ResourceKind::Fluid, 1000);
        offer_all(&mut sim, &mut world, ORIGIN, ResourceKind::Energy, 32_000);
        sim.run(&mut world, 20);
        assert_eq!(sim.device_at(ORIGIN).unwrap().phase(), Phase::Freezer(FreezerPhase::Ice));
        assert_eq!(sim.comparator_output(ORIGIN), 8);
        let removal = sim.remove(&mut world, ORIGIN).unwrap();
        assert_eq!(removal.dropped, Some(ItemKind::Ice));
        assert_eq!(world.drops, vec![(ORIGIN, ItemKind::Ice, 1)]);
    }

    #[test]
    fn offer_to_missing_device_is_refused() {
        let mut sim = sim();
        let mut world = MockWorld::new();
        assert_eq!(sim.offer(&mut world, ORIGIN, Direction::Up, ResourceKind::Fluid, 100), 0);
        assert_eq!(sim.interact(&mut world, ORIGIN), None);
    }

    #[test]
    fn offer_respects_per_transfer_cap() {
        let mut sim = sim();
        let mut world = MockWorld::new();
        sim.place(DeviceSpec::Freezer, ORIGIN, Direction::North).unwrap();
        assert_eq!(sim.offer(&mut world, ORIGIN, Direction::Up, ResourceKind::Energy, 50_000), 8192);
    }

    #[test]
    fn aborted_device_resets_progress() {
        let mut sim = sim();
        let mut world = MockWorld::new();
        world.add_tree(ORIGIN.offset(Direction::North));
        sim.place(DeviceSpec::TreeCutter, ORIGIN, Direction::North).unwrap();
        sim.run(&mut world, 6);
        assert_eq!(sim.device_at(ORIGIN).unwrap().progress(), 10);
        world.invalid.insert(ORIGIN);
        let events = sim.run(&mut world, 5);
        assert_eq!(sim.device_at(ORIGIN).unwrap().progress(), 0);
        assert!(events.iter().any(|e| matches!(e, DeviceEvent::Aborted { .. })));
        world.invalid.clear();
        sim.run(&mut world, 5);
        assert_eq!(sim.device_at(ORIGIN).unwrap().progress(), 5);
    }

    #[test]
    fn identical_runs_hash_identically() {
        let build = || {
            let mut sim = sim();
            let mut world = MockWorld::new();
            sim.place(DeviceSpec::SolarPanel, ORIGIN, Direction::North).unwrap();
            sim.place(DeviceSpec::Freezer, ORIGIN.below(), Direction::North).unwrap();
            sim.place(DeviceSpec::PipeValve(ValveMode::Check), ORIGIN.above(), Direction::Down)
                .unwrap();
            sim.run(&mut world, 200);
            sim.state_hash()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn state_hash_changes_with_state() {
        let mut sim = sim();
        let mut world = MockWorld::new();
        sim.place(DeviceSpec::SolarPanel, ORIGIN, Direction::North).unwrap();
        let before = sim.state_hash();
        sim.step(&mut world);
        assert_ne!(sim.state_hash(), before);
    }

    #[test]
    fn save_blob_round_trips_through_load() {
        let mut sim = sim();
        let mut world = MockWorld::new();
        sim.place(DeviceSpec::Freezer, ORIGIN, Direction::North).unwrap();
        offer_all(&mut sim, &mut world, ORIGIN, ResourceKind::Fluid, 1500);
        let data = sim.save_device(ORIGIN).unwrap();
        let mut other = Simulation::with_config(SimConfig::default());
        other.place(DeviceSpec::Freezer, ORIGIN, Direction::North).unwrap();
        assert!(other.load_device(ORIGIN, &data));
        assert_eq!(other.device_at(ORIGIN).unwrap().amount(ResourceKind::Fluid), 1500);
        assert!(!other.load_device(ORIGIN.above(), &data));
    }

    #[test]
    fn state_hash_order_matters() {
        let mut h1 = StateHash::new();
        h1.write_u32(1);
        h1.write_u32(2);

        let mut h2 = StateHash::new();
        h2.write_u32(2);
        h2.write_u32(1);

        assert_ne!(h1.finish(), h2.finish());
    }
}
