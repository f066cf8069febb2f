//! Whole-simulation snapshots.
//!
//! Binary serialization via `bitcode` with a versioned header. Devices are
//! stored in placement order; handles are reissued on load, so a restored
//! simulation has the same devices at the same positions but fresh
//! [`DeviceId`](crate::id::DeviceId)s.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::capability::CapabilityRegistry;
use crate::config::SimConfig;
use crate::device::Device;
use crate::sim::Simulation;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a decorsim snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xDEC0_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("two devices at {0:?}")]
    DuplicatePosition(crate::pos::BlockPos),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick count at the time the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SimulationSnapshot {
    header: SnapshotHeader,
    devices: Vec<Device>,
}

/// Decode only far enough to return the header.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    let snapshot: SimulationSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

// ---------------------------------------------------------------------------
// Simulation serialization methods
// ---------------------------------------------------------------------------

impl Simulation {
    /// Serialize every device and the tick counter. Configuration and the
    /// capability registry are not part of the snapshot.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = SimulationSnapshot {
            header: SnapshotHeader::new(self.tick),
            devices: self.devices().map(|(_, d)| d.clone()).collect(),
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Restore a simulation from [`serialize`](Self::serialize) output.
    /// Events pending at snapshot time are not restored.
    pub fn deserialize(
        data: &[u8],
        config: SimConfig,
        registry: CapabilityRegistry,
    ) -> Result<Self, DeserializeError> {
        let snapshot: SimulationSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;

        let mut sim = Simulation::new(config, registry);
        sim.tick = snapshot.header.tick;
        let mut devices = SlotMap::with_key();
        let mut grid = BTreeMap::new();
        let mut order = Vec::with_capacity(snapshot.devices.len());
        for mut device in snapshot.devices {
            let pos = device.pos;
            device.busy = false;
            let id = devices.insert(device);
            if grid.insert(pos, id).is_some() {
                return Err(DeserializeError::DuplicatePosition(pos));
            }
            order.push(id);
        }
        sim.devices = devices;
        sim.grid = grid;
        sim.order = order;
        Ok(sim)
    }
}
