//! Freezer: turns a tank of water into ice, packed ice and finally blue ice
//! while it is powered and not inhibited by redstone.

use tracing::debug;

use crate::buffer::ResourceKind;
use crate::capability::{self, CapabilityRegistry};
use crate::config::FreezerConfig;
use crate::device::{Device, DeviceKind, FreezerPhase, Phase};
use crate::exchange::Exchange;
use crate::id::DeviceId;
use crate::world::{Effect, ItemKind};

pub(crate) fn register(registry: &mut CapabilityRegistry) {
    registry.register(DeviceKind::Freezer, ResourceKind::Energy, capability::energy_store_all_sides);
    registry.register(DeviceKind::Freezer, ResourceKind::Fluid, capability::fluid_store_all_sides);
}

/// Current stage derived from the tank and progress.
pub fn phase_of(device: &Device, config: &FreezerConfig) -> FreezerPhase {
    FreezerPhase::derive(device.amount(ResourceKind::Fluid), config.fluid_minimum, device.progress)
}

pub(crate) fn update(ex: &mut Exchange<'_>, id: DeviceId) {
    let config = &ex.config().freezer;
    let Some(pos) = ex.device(id).map(Device::pos) else {
        return;
    };
    let inhibited = ex.world.environment(pos).powered();
    let Some(device) = ex.device_mut(id) else {
        return;
    };
    let last = phase_of(device, config);

    let fluid = device.amount(ResourceKind::Fluid);
    let energy = device.amount(ResourceKind::Energy);
    if fluid < config.fluid_minimum {
        device.progress = 0;
    } else if energy == 0 || inhibited {
        device.progress = device.progress.saturating_sub(config.reheat_rate());
    } else if device.progress >= FreezerConfig::PROGRESS_MAX {
        device.progress = FreezerConfig::PROGRESS_MAX;
        if let Some(buffer) = device.energy.as_mut() {
            buffer.drain(config.holding_cost());
        }
    } else {
        if let Some(buffer) = device.energy.as_mut() {
            buffer.drain(config.freezing_cost());
        }
        device.set_progress(device.progress + config.cooldown_rate);
    }

    let current = phase_of(device, config);
    if current != last {
        ex.world.play_effect(pos, Effect::SandFall);
    }
    ex.publish_phase(id, Phase::Freezer(current));
}

/// The item matching the current frozen stage.
pub fn frozen_product(device: &Device) -> Option<ItemKind> {
    match device.phase {
        Phase::Freezer(FreezerPhase::Ice) => Some(ItemKind::Ice),
        Phase::Freezer(FreezerPhase::PackedIce) => Some(ItemKind::PackedIce),
        Phase::Freezer(FreezerPhase::BlueIce) => Some(ItemKind::BlueIce),
        _ => None,
    }
}

/// Take the frozen product out: consumes one batch of fluid and restarts
/// the process.
pub(crate) fn extract_ice(ex: &mut Exchange<'_>, id: DeviceId) -> Option<ItemKind> {
    let config = &ex.config().freezer;
    let device = ex.device_mut(id)?;
    let item = frozen_product(device)?;
    if let Some(fluid) = device.fluid.as_mut() {
        fluid.drain(config.fluid_minimum);
    }
    device.progress = 0;
    device.throttle.reset();
    let pos = device.pos;
    debug!(?id, ?pos, ?item, "ice extracted");
    let current = phase_of(device, config);
    ex.world.play_effect(pos, Effect::SandFall);
    ex.publish_phase(id, Phase::Freezer(current));
    Some(item)
}
