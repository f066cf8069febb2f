//! Capability registry: which device faces accept which resource, and how.
//!
//! A lookup is keyed by device, resource kind and face. The registry maps
//! `(DeviceKind, ResourceKind)` to a resolver; the resolver inspects the
//! concrete device and face and returns the handler, if any.

use std::collections::BTreeMap;

use crate::buffer::ResourceKind;
use crate::device::{Device, DeviceKind};
use crate::exchange::Exchange;
use crate::id::DeviceId;
use crate::kinds;
use crate::pos::Direction;

/// Accept up to `amount` into the device through face `side`; returns what
/// was accepted. The amount has already left its source.
pub type AcceptFn = fn(&mut Exchange<'_>, DeviceId, Direction, u32) -> u32;

/// Whether the device would currently accept anything.
pub type ProbeFn = fn(&Device) -> bool;

/// Resolves the handler for one face of a device.
pub type Resolver = fn(&Device, Direction) -> Option<Handler>;

/// An acceptor exposed on a device face.
#[derive(Clone, Copy)]
pub struct Handler {
    pub accept: AcceptFn,
    pub receiving: ProbeFn,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

impl Handler {
    /// Stores energy into the device's buffer, capped per transfer.
    pub const ENERGY_STORE: Handler = Handler {
        accept: accept_energy,
        receiving: energy_headroom,
    };

    /// Stores fluid into the device's tank, capped per transfer.
    pub const FLUID_STORE: Handler = Handler {
        accept: accept_fluid,
        receiving: fluid_headroom,
    };

    /// Present but never accepting.
    pub const REFUSE: Handler = Handler {
        accept: refuse,
        receiving: never,
    };
}

fn accept_energy(ex: &mut Exchange<'_>, id: DeviceId, _side: Direction, amount: u32) -> u32 {
    ex.receive_into(id, ResourceKind::Energy, amount)
}

fn accept_fluid(ex: &mut Exchange<'_>, id: DeviceId, _side: Direction, amount: u32) -> u32 {
    ex.receive_into(id, ResourceKind::Fluid, amount)
}

fn refuse(_: &mut Exchange<'_>, _: DeviceId, _: Direction, _: u32) -> u32 {
    0
}

fn energy_headroom(device: &Device) -> bool {
    device.has_headroom(ResourceKind::Energy)
}

fn fluid_headroom(device: &Device) -> bool {
    device.has_headroom(ResourceKind::Fluid)
}

fn never(_: &Device) -> bool {
    false
}

/// Resolver exposing the energy store on every face.
pub fn energy_store_all_sides(_: &Device, _: Direction) -> Option<Handler> {
    Some(Handler::ENERGY_STORE)
}

/// Resolver exposing the fluid store on every face.
pub fn fluid_store_all_sides(_: &Device, _: Direction) -> Option<Handler> {
    Some(Handler::FLUID_STORE)
}

/// Resolver for devices that expose the resource but never take it in.
pub fn refuse_all_sides(_: &Device, _: Direction) -> Option<Handler> {
    Some(Handler::REFUSE)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    resolvers: BTreeMap<(DeviceKind, ResourceKind), Resolver>,
}

impl CapabilityRegistry {
    /// A registry with nothing registered: every lookup is a miss.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The registry with every built-in device kind.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        kinds::register_all(&mut registry);
        registry
    }

    /// Register (or replace) the resolver for one kind and resource.
    pub fn register(&mut self, kind: DeviceKind, resource: ResourceKind, resolver: Resolver) {
        self.resolvers.insert((kind, resource), resolver);
    }

    pub fn is_registered(&self, kind: DeviceKind, resource: ResourceKind) -> bool {
        self.resolvers.contains_key(&(kind, resource))
    }

    /// The handler the device exposes for `resource` on face `side`.
    pub fn resolve(&self, device: &Device, resource: ResourceKind, side: Direction) -> Option<Handler> {
        let resolver = self.resolvers.get(&(device.kind(), resource))?;
        resolver(device, side)
    }
}
