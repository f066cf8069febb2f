//! Per-kind device policies.
//!
//! The engine is generic; each kind module supplies its update step, its
//! capability resolvers and its interaction handling. Dispatch is a plain
//! match on [`DeviceKind`].

pub mod freezer;
pub mod gate;
pub mod hatch;
pub mod pipe_valve;
pub mod solar;
pub mod tree_cutter;

use tracing::debug;

use crate::capability::CapabilityRegistry;
use crate::config::SimConfig;
use crate::device::{Device, DeviceKind};
use crate::event::DeviceEvent;
use crate::exchange::Exchange;
use crate::id::DeviceId;
use crate::world::ItemKind;

/// Result of a player interaction with a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Nothing happened.
    None,
    /// A hatch or gate changed its open state.
    Toggled { open: bool },
    /// Frozen product taken out of a freezer.
    Extracted(ItemKind),
}

pub(crate) fn register_all(registry: &mut CapabilityRegistry) {
    freezer::register(registry);
    solar::register(registry);
    tree_cutter::register(registry);
    pipe_valve::register(registry);
}

/// The regular update interval of a kind, in ticks.
pub fn interval(kind: DeviceKind, config: &SimConfig) -> u32 {
    match kind {
        DeviceKind::Freezer => config.freezer.tick_interval,
        DeviceKind::SolarPanel => config.solar_panel.tick_interval,
        DeviceKind::TreeCutter => config.tree_cutter.tick_interval,
        DeviceKind::PipeValve => 0,
        DeviceKind::Hatch | DeviceKind::Gate => config.door.tick_interval,
    }
}

/// Run one world tick for a device: count its throttle down and, when it
/// fires, re-arm it and run the kind's update.
pub(crate) fn tick(ex: &mut Exchange<'_>, id: DeviceId) {
    let config = ex.config();
    let Some(device) = ex.device_mut(id) else {
        return;
    };
    if !device.kind.capabilities().ticking || !device.throttle.tick() {
        return;
    }
    let (kind, pos) = (device.kind, device.pos);
    device.throttle.arm(interval(kind, config));

    if !ex.world.block_matches(pos, kind) {
        abort(ex, id);
        return;
    }

    match kind {
        DeviceKind::Freezer => freezer::update(ex, id),
        DeviceKind::SolarPanel => solar::update(ex, id),
        DeviceKind::TreeCutter => tree_cutter::update(ex, id),
        DeviceKind::Hatch => hatch::update(ex, id),
        DeviceKind::Gate => gate::update(ex, id),
        DeviceKind::PipeValve => {}
    }
}

fn abort(ex: &mut Exchange<'_>, id: DeviceId) {
    let config = ex.config();
    let Some(device) = ex.device_mut(id) else {
        return;
    };
    let lost_progress = device.progress > 0;
    let (kind, pos) = (device.kind, device.pos);
    device.abort();
    device.throttle.arm(interval(kind, config));
    if lost_progress {
        debug!(?id, ?kind, ?pos, "backing block mismatch, device reset");
        let tick = ex.tick();
        ex.emit(DeviceEvent::Aborted { device: id, pos, tick });
    }
}

/// Handle a player interaction.
pub(crate) fn interact(ex: &mut Exchange<'_>, id: DeviceId) -> Interaction {
    let Some(kind) = ex.device(id).map(Device::kind) else {
        return Interaction::None;
    };
    match kind {
        DeviceKind::Freezer => freezer::extract_ice(ex, id).map_or(Interaction::None, Interaction::Extracted),
        DeviceKind::Hatch => hatch::toggle(ex, id),
        DeviceKind::Gate => gate::toggle(ex, id),
        DeviceKind::SolarPanel | DeviceKind::TreeCutter | DeviceKind::PipeValve => Interaction::None,
    }
}

/// The item a device turns into when removed, if any.
pub(crate) fn removal_drop(device: &Device) -> Option<ItemKind> {
    match device.kind {
        DeviceKind::Freezer => freezer::frozen_product(device),
        _ => None,
    }
}
