//! Pipe valves: one-way fluid conduits without storage. Fluid offered at
//! the inlet is forwarded to the outlet neighbour within the same call.

use crate::buffer::ResourceKind;
use crate::capability::{CapabilityRegistry, Handler};
use crate::device::{Device, DeviceKind, KindState, ValveMode};
use crate::exchange::Exchange;
use crate::id::DeviceId;
use crate::pos::Direction;

/// Full redstone signal strength.
const FULL_SIGNAL: u32 = 15;

const INLET: Handler = Handler {
    accept: forward,
    receiving: always,
};

fn always(_: &Device) -> bool {
    true
}

pub(crate) fn register(registry: &mut CapabilityRegistry) {
    registry.register(DeviceKind::PipeValve, ResourceKind::Fluid, resolve);
}

/// Inlet on the face opposite the facing, a refusing handler on the outlet
/// face, nothing elsewhere.
fn resolve(device: &Device, side: Direction) -> Option<Handler> {
    if side == device.facing().opposite() {
        Some(INLET)
    } else if side == device.facing() {
        Some(Handler::REFUSE)
    } else {
        None
    }
}

fn mode(device: &Device) -> ValveMode {
    match &device.state {
        KindState::PipeValve(state) => state.mode,
        _ => ValveMode::Check,
    }
}

/// Amount a valve lets through for an offer of `amount` at redstone
/// `signal`, before the downstream acceptor has its say.
pub fn allowed_flow(mode: ValveMode, signal: u8, amount: u32, slope: u32, max_flow: u32) -> u32 {
    if amount == 0 {
        return 0;
    }
    let signal = u32::from(signal);
    let mut amount = amount;
    if mode.redstone_controlled() {
        if signal == 0 {
            return 0;
        }
        if mode == ValveMode::Analog && signal < FULL_SIGNAL {
            amount = signal.saturating_mul(slope).clamp(1, amount);
        }
    }
    amount.min(max_flow)
}

fn forward(ex: &mut Exchange<'_>, id: DeviceId, _side: Direction, amount: u32) -> u32 {
    let config = &ex.config().pipe_valve;
    let Some(device) = ex.device(id) else {
        return 0;
    };
    let (pos, facing, mode) = (device.pos(), device.facing(), mode(device));
    let signal = if mode.redstone_controlled() {
        ex.world.environment(pos).redstone_signal
    } else {
        0
    };
    let allowed = allowed_flow(mode, signal, amount, config.redstone_slope, config.max_flow);
    if allowed == 0 {
        return 0;
    }

    if let Some(device) = ex.device_mut(id) {
        device.busy = true;
    }
    let accepted = ex.offer(pos, facing, ResourceKind::Fluid, allowed);
    if let Some(device) = ex.device_mut(id) {
        device.busy = false;
    }
    accepted
}
