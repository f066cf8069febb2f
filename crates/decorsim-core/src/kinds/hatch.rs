//! Hatch: opens while powered, closes when the signal goes away, and can be
//! toggled by hand in between.

use crate::device::{Device, DoorState, KindState, Phase};
use crate::exchange::Exchange;
use crate::id::DeviceId;
use crate::kinds::Interaction;
use crate::world::Effect;

pub(crate) fn door_mut<'d>(ex: &'d mut Exchange<'_>, id: DeviceId) -> Option<&'d mut DoorState> {
    match &mut ex.device_mut(id)?.state {
        KindState::Hatch(state) | KindState::Gate(state) => Some(state),
        _ => None,
    }
}

/// Open or close a door-like device. Returns whether anything changed.
pub(crate) fn set_open(ex: &mut Exchange<'_>, id: DeviceId, open: bool) -> bool {
    let Some(state) = door_mut(ex, id) else {
        return false;
    };
    if state.open == open {
        return false;
    }
    state.open = open;
    let Some(pos) = ex.device(id).map(Device::pos) else {
        return false;
    };
    ex.world.play_effect(pos, if open { Effect::DoorOpen } else { Effect::DoorClose });
    ex.publish_phase(id, Phase::Open(open));
    true
}

pub(crate) fn update(ex: &mut Exchange<'_>, id: DeviceId) {
    let Some(pos) = ex.device(id).map(Device::pos) else {
        return;
    };
    let powered = ex.world.environment(pos).powered();
    let Some(state) = door_mut(ex, id) else {
        return;
    };
    if state.powered == powered {
        return;
    }
    state.powered = powered;
    set_open(ex, id, powered);
}

pub(crate) fn toggle(ex: &mut Exchange<'_>, id: DeviceId) -> Interaction {
    let Some(open) = door_mut(ex, id).map(|s| !s.open) else {
        return Interaction::None;
    };
    set_open(ex, id, open);
    Interaction::Toggled { open }
}
