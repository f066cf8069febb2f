use serde::{Deserialize, Serialize};

use crate::buffer::ResourceKind;
use crate::device::{DeviceKind, Phase};
use crate::fixed::Ticks;
use crate::id::DeviceId;
use crate::pos::BlockPos;
use crate::world::ItemKind;

/// Discrete transitions reported by [`crate::sim::Simulation::step`] and the
/// other mutating calls. Emitted on change only, never per tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceEvent {
    PhaseChanged {
        device: DeviceId,
        pos: BlockPos,
        from: Phase,
        to: Phase,
        tick: Ticks,
    },
    /// A tree cutter completed a cut.
    Harvested {
        device: DeviceId,
        target: BlockPos,
        tick: Ticks,
    },
    /// A balancing chunk moved between peers.
    Balanced {
        from: DeviceId,
        to: DeviceId,
        resource: ResourceKind,
        amount: u32,
        tick: Ticks,
    },
    /// The device switched to its idle interval.
    Idle {
        device: DeviceId,
        pos: BlockPos,
        tick: Ticks,
    },
    /// The backing block no longer matched; progress and timers were reset.
    Aborted {
        device: DeviceId,
        pos: BlockPos,
        tick: Ticks,
    },
    Removed {
        device: DeviceId,
        kind: DeviceKind,
        pos: BlockPos,
        dropped: Option<ItemKind>,
        tick: Ticks,
    },
}

impl DeviceEvent {
    pub fn tick(&self) -> Ticks {
        match self {
            DeviceEvent::PhaseChanged { tick, .. }
            | DeviceEvent::Harvested { tick, .. }
            | DeviceEvent::Balanced { tick, .. }
            | DeviceEvent::Idle { tick, .. }
            | DeviceEvent::Aborted { tick, .. }
            | DeviceEvent::Removed { tick, .. } => *tick,
        }
    }
}
