//! The neighbour resource exchange protocol.
//!
//! An [`Exchange`] is a short-lived view over the simulation handed to device
//! policies and handlers for one update. Every resource movement between
//! devices goes through it: a push drains the source first, offers the
//! amount to the neighbour and refunds whatever was not accepted, so nothing
//! is created or destroyed.

use std::collections::BTreeMap;

use slotmap::SlotMap;
use tracing::trace;

use crate::buffer::ResourceKind;
use crate::capability::{CapabilityRegistry, Handler};
use crate::config::SimConfig;
use crate::device::{Device, Phase};
use crate::event::DeviceEvent;
use crate::fixed::Ticks;
use crate::id::DeviceId;
use crate::pos::{BlockPos, Direction};
use crate::world::World;

/// What sits on the other side of a face, as seen by a pusher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// No acceptor at all.
    Absent,
    /// An acceptor that would take something now.
    Receiving,
    /// An acceptor that currently refuses. Carries the device when the
    /// acceptor is one.
    Refusing(Option<DeviceId>),
}

pub struct Exchange<'a> {
    pub(crate) devices: &'a mut SlotMap<DeviceId, Device>,
    pub(crate) grid: &'a BTreeMap<BlockPos, DeviceId>,
    pub(crate) registry: &'a CapabilityRegistry,
    pub(crate) config: &'a SimConfig,
    pub(crate) world: &'a mut dyn World,
    pub(crate) events: &'a mut Vec<DeviceEvent>,
    pub(crate) tick: Ticks,
}

impl<'a> Exchange<'a> {
    pub fn config(&self) -> &'a SimConfig {
        self.config
    }

    pub fn tick(&self) -> Ticks {
        self.tick
    }

    pub fn world(&mut self) -> &mut dyn World {
        &mut *self.world
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    pub(crate) fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.get_mut(id)
    }

    pub fn emit(&mut self, event: DeviceEvent) {
        self.events.push(event);
    }

    /// The device adjacent to `pos` in direction `dir`.
    pub fn neighbor(&self, pos: BlockPos, dir: Direction) -> Option<DeviceId> {
        self.grid.get(&pos.offset(dir)).copied()
    }

    /// The acceptor a device exposes for `resource` on face `side`.
    pub fn acceptor(&self, id: DeviceId, resource: ResourceKind, side: Direction) -> Option<Handler> {
        let device = self.devices.get(id)?;
        self.registry.resolve(device, resource, side)
    }

    /// Amount of `resource` held by a device, 0 if it has no such buffer.
    pub fn amount(&self, id: DeviceId, resource: ResourceKind) -> u32 {
        self.devices.get(id).map_or(0, |d| d.amount(resource))
    }

    /// Classify the acceptor adjacent to `from` in direction `dir`.
    pub fn probe(&mut self, from: BlockPos, dir: Direction, resource: ResourceKind) -> Probe {
        let side = dir.opposite();
        if let Some(target) = self.neighbor(from, dir) {
            let Some(handler) = self.acceptor(target, resource, side) else {
                return Probe::Absent;
            };
            let receiving = self
                .devices
                .get(target)
                .is_some_and(|d| !d.busy && (handler.receiving)(d));
            return if receiving {
                Probe::Receiving
            } else {
                Probe::Refusing(Some(target))
            };
        }
        match self.world.sink(from.offset(dir), side, resource) {
            Some(sink) if sink.receiving(resource) => Probe::Receiving,
            Some(_) => Probe::Refusing(None),
            None => Probe::Absent,
        }
    }

    /// Offer `amount` of `resource` to whatever is adjacent to `from` in
    /// direction `dir`. The amount has already been taken from its source;
    /// the caller owns the unaccepted remainder. Returns the accepted amount.
    pub fn offer(&mut self, from: BlockPos, dir: Direction, resource: ResourceKind, amount: u32) -> u32 {
        if amount == 0 {
            return 0;
        }
        let side = dir.opposite();
        if let Some(target) = self.neighbor(from, dir) {
            return self.offer_to(target, resource, side, amount);
        }
        match self.world.sink(from.offset(dir), side, resource) {
            Some(sink) if sink.receiving(resource) => sink.receive(resource, amount).min(amount),
            _ => 0,
        }
    }

    /// Offer `amount` directly to a device face.
    pub fn offer_to(&mut self, target: DeviceId, resource: ResourceKind, side: Direction, amount: u32) -> u32 {
        let Some(handler) = self.acceptor(target, resource, side) else {
            return 0;
        };
        let Some(device) = self.devices.get(target) else {
            return 0;
        };
        if device.busy || !(handler.receiving)(device) {
            return 0;
        }
        (handler.accept)(self, target, side, amount).min(amount)
    }

    /// Push up to `cap` of the source's `resource` to the neighbour in
    /// direction `dir`. Returns the amount that left the source.
    pub fn push(&mut self, source: DeviceId, dir: Direction, resource: ResourceKind, cap: u32) -> u32 {
        let Some(device) = self.devices.get_mut(source) else {
            return 0;
        };
        let pos = device.pos;
        let Some(buffer) = device.buffer_mut(resource) else {
            return 0;
        };
        let drawn = buffer.drain(cap);
        if drawn == 0 {
            return 0;
        }
        device.busy = true;

        let accepted = self.offer(pos, dir, resource, drawn);

        let refund = drawn - accepted;
        if let Some(device) = self.devices.get_mut(source) {
            device.busy = false;
            if let Some(buffer) = device.buffer_mut(resource) {
                let refunded = buffer.fill(refund);
                debug_assert_eq!(refunded, refund, "refund must fit the space just drained");
            }
        }
        trace!(?source, ?dir, ?resource, drawn, accepted, "push");
        accepted
    }

    /// Move up to `amount` between two devices of the same kind, bypassing
    /// the acceptor check. Returns the amount moved.
    pub fn peer_transfer(&mut self, from: DeviceId, to: DeviceId, resource: ResourceKind, amount: u32) -> u32 {
        if from == to {
            return 0;
        }
        let same_kind = match (self.devices.get(from), self.devices.get(to)) {
            (Some(a), Some(b)) => a.kind == b.kind,
            _ => false,
        };
        if !same_kind {
            return 0;
        }
        let drawn = self
            .devices
            .get_mut(from)
            .and_then(|d| d.buffer_mut(resource))
            .map_or(0, |b| b.drain(amount));
        let accepted = self
            .devices
            .get_mut(to)
            .and_then(|d| d.buffer_mut(resource))
            .map_or(0, |b| b.fill(drawn));
        if accepted < drawn {
            if let Some(buffer) = self.devices.get_mut(from).and_then(|d| d.buffer_mut(resource)) {
                buffer.fill(drawn - accepted);
            }
        }
        trace!(?from, ?to, ?resource, moved = accepted, "peer transfer");
        accepted
    }

    /// Store into a device's own buffer, capped by its per-transfer limit.
    pub fn receive_into(&mut self, id: DeviceId, resource: ResourceKind, amount: u32) -> u32 {
        self.devices
            .get_mut(id)
            .and_then(|d| d.buffer_mut(resource))
            .map_or(0, |b| b.receive(amount))
    }

    /// Write the device's phase to the world if it changed (or a write is
    /// forced). Returns whether the phase changed.
    pub fn publish_phase(&mut self, id: DeviceId, phase: Phase) -> bool {
        let Some(device) = self.devices.get_mut(id) else {
            return false;
        };
        let previous = device.phase;
        let changed = previous != phase;
        if !changed && !device.phase_dirty {
            return false;
        }
        device.phase = phase;
        device.phase_dirty = false;
        let pos = device.pos;
        self.world.set_phase(pos, phase);
        if changed {
            self.events.push(DeviceEvent::PhaseChanged {
                device: id,
                pos,
                from: previous,
                to: phase,
                tick: self.tick,
            });
        }
        changed
    }

    /// Record the switch to (or away from) the idle interval, emitting
    /// [`DeviceEvent::Idle`] on entry only.
    pub fn set_idle(&mut self, id: DeviceId, idle: bool) {
        let Some(device) = self.devices.get_mut(id) else {
            return;
        };
        let entering = idle && !device.idle;
        device.idle = idle;
        if entering {
            let pos = device.pos;
            self.events.push(DeviceEvent::Idle {
                device: id,
                pos,
                tick: self.tick,
            });
        }
    }
}
