//! The world adapter: everything the simulation reads from or writes to the
//! host game. Devices never hold onto world state between calls.

use serde::{Deserialize, Serialize};

use crate::buffer::ResourceKind;
use crate::device::{DeviceKind, Phase};
use crate::fixed::Fixed64;
use crate::pos::{BlockPos, Direction};

/// Environmental inputs at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub sky_visible: bool,
    /// Sky light, `0..=15`.
    pub light_level: u8,
    /// Rain strength, `0..=1`.
    pub rain: Fixed64,
    /// Thunder strength, `0..=1`.
    pub thunder: Fixed64,
    /// Sun angle in radians, `0..2π`. Zero is noon.
    pub celestial_angle: Fixed64,
    /// Strongest redstone signal received, `0..=15`.
    pub redstone_signal: u8,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            sky_visible: true,
            light_level: 15,
            rain: Fixed64::ZERO,
            thunder: Fixed64::ZERO,
            celestial_angle: Fixed64::ZERO,
            redstone_signal: 0,
        }
    }
}

impl Environment {
    pub fn powered(&self) -> bool {
        self.redstone_signal > 0
    }
}

/// One-shot sound/visual effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Freezer phase change.
    SandFall,
    /// Tree cutter working on its target.
    WoodHit,
    /// Tree cutter finished a harvest.
    WoodBreak,
    DoorOpen,
    DoorClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleKind {
    WoodChips,
}

/// Items a device can hand back to the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Ice,
    PackedIce,
    BlueIce,
}

/// A non-device acceptor in the world, such as another mod's tank or cable.
pub trait ResourceSink {
    /// Whether the sink would currently take anything of `resource`.
    fn receiving(&self, resource: ResourceKind) -> bool;

    /// Take up to `amount`, returning what was accepted.
    fn receive(&mut self, resource: ResourceKind, amount: u32) -> u32;
}

/// Host game interface.
///
/// Device-to-device lookups (neighbour state, acceptors) are answered by the
/// simulation's own grid; the world only supplies what lives outside it.
pub trait World {
    fn environment(&self, pos: BlockPos) -> Environment;

    /// Whether the block at `pos` still backs a device of `kind`. A mismatch
    /// makes the device reset itself instead of updating.
    fn block_matches(&self, _pos: BlockPos, _kind: DeviceKind) -> bool {
        true
    }

    /// Whether the block at `pos` is a tree a cutter can fell.
    fn can_harvest(&self, pos: BlockPos) -> bool;

    /// Fell the tree at `pos`.
    fn harvest(&mut self, pos: BlockPos);

    fn set_phase(&mut self, pos: BlockPos, phase: Phase);

    fn play_effect(&mut self, pos: BlockPos, effect: Effect);

    fn spawn_particles(&mut self, pos: BlockPos, kind: ParticleKind, count: u32);

    fn drop_item(&mut self, pos: BlockPos, item: ItemKind, count: u32);

    /// A non-device acceptor at `pos`, reached through its `side` face.
    fn sink(
        &mut self,
        _pos: BlockPos,
        _side: Direction,
        _resource: ResourceKind,
    ) -> Option<&mut dyn ResourceSink> {
        None
    }
}
