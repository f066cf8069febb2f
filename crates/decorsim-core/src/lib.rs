//! decorsim core: the tick-driven device simulation and bounded resource
//! exchange network behind a set of decorative, semi-functional blocks.
//!
//! Each call to [`sim::Simulation::step`] ticks every device once in
//! placement order. A device's [`throttle::Throttle`] gates its real work;
//! when it fires, the kind's policy reads buffers and the environment from
//! the [`world::World`], advances progress and phase, and may push resource
//! to neighbours through the [`exchange::Exchange`] protocol.
//!
//! # Key Types
//!
//! - [`sim::Simulation`] -- owns devices, the position grid and the registry.
//! - [`device::Device`] -- one simulated node; kind-specific state is a
//!   tagged [`device::KindState`].
//! - [`buffer::ResourceBuffer`] -- bounded, saturating energy/fluid store.
//! - [`capability::CapabilityRegistry`] -- which faces accept what.
//! - [`exchange::Exchange`] -- conserving push/offer protocol.
//! - [`balancer`] -- peer balancing between same-kind producers.
//! - [`config::SimConfig`] -- immutable per-kind parameters.
//! - [`serialize`] -- versioned bitcode snapshots.

pub mod balancer;
pub mod buffer;
pub mod capability;
pub mod config;
pub mod device;
pub mod event;
pub mod exchange;
pub mod fixed;
pub mod id;
pub mod kinds;
pub mod pos;
pub mod rng;
pub mod serialize;
pub mod sim;
pub mod throttle;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
