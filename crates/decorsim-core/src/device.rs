//! The device model: one simulated node backing a placed block.
//!
//! Every kind shares the same [`Device`] shape (buffers, progress, throttle,
//! published phase). What differs per kind lives in the tagged
//! [`KindState`] and in the kind's policy module under `kinds`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::buffer::{ResourceBuffer, ResourceKind};
use crate::config::{FreezerConfig, SimConfig};
use crate::pos::{BlockPos, Direction};
use crate::rng::SimRng;
use crate::throttle::Throttle;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// Device kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Freezer,
    SolarPanel,
    TreeCutter,
    PipeValve,
    Hatch,
    Gate,
}

/// What a device kind can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub ticking: bool,
    pub energy_producer: bool,
    pub energy_consumer: bool,
    pub fluid_conduit: bool,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 6] = [
        DeviceKind::Freezer,
        DeviceKind::SolarPanel,
        DeviceKind::TreeCutter,
        DeviceKind::PipeValve,
        DeviceKind::Hatch,
        DeviceKind::Gate,
    ];

    pub fn capabilities(self) -> Capabilities {
        let none = Capabilities {
            ticking: true,
            energy_producer: false,
            energy_consumer: false,
            fluid_conduit: false,
        };
        match self {
            DeviceKind::Freezer => Capabilities {
                energy_consumer: true,
                ..none
            },
            DeviceKind::SolarPanel => Capabilities {
                energy_producer: true,
                ..none
            },
            DeviceKind::TreeCutter => Capabilities {
                energy_consumer: true,
                ..none
            },
            DeviceKind::PipeValve => Capabilities {
                ticking: false,
                fluid_conduit: true,
                ..none
            },
            DeviceKind::Hatch | DeviceKind::Gate => none,
        }
    }
}

/// Pipe valve variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValveMode {
    /// Always open in the forward direction.
    Check,
    /// Open while any redstone signal is present.
    Redstone,
    /// Flow scales with the redstone signal strength.
    Analog,
}

impl ValveMode {
    pub fn redstone_controlled(self) -> bool {
        !matches!(self, ValveMode::Check)
    }
}

/// What to place. Carries the per-placement choices a bare [`DeviceKind`]
/// does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceSpec {
    Freezer,
    SolarPanel,
    TreeCutter,
    PipeValve(ValveMode),
    Hatch,
    Gate,
}

impl DeviceSpec {
    pub fn kind(self) -> DeviceKind {
        match self {
            DeviceSpec::Freezer => DeviceKind::Freezer,
            DeviceSpec::SolarPanel => DeviceKind::SolarPanel,
            DeviceSpec::TreeCutter => DeviceKind::TreeCutter,
            DeviceSpec::PipeValve(_) => DeviceKind::PipeValve,
            DeviceSpec::Hatch => DeviceKind::Hatch,
            DeviceSpec::Gate => DeviceKind::Gate,
        }
    }
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Freezer stages, ordered from warmest to coldest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FreezerPhase {
    Empty,
    Liquid,
    Ice,
    PackedIce,
    BlueIce,
}

impl FreezerPhase {
    /// Step function of progress; `Empty` whenever there is not enough fluid.
    pub fn derive(fluid: u32, minimum: u32, progress: u32) -> Self {
        if fluid < minimum {
            FreezerPhase::Empty
        } else if progress >= FreezerConfig::PROGRESS_MAX {
            FreezerPhase::BlueIce
        } else if progress >= 70 {
            FreezerPhase::PackedIce
        } else if progress >= 30 {
            FreezerPhase::Ice
        } else {
            FreezerPhase::Liquid
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Comparator signal strength for this stage.
    pub fn comparator_output(self) -> u8 {
        (self.index() * 4).min(15)
    }
}

/// The externally visible block state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Kinds without a visible state.
    Inert,
    Freezer(FreezerPhase),
    /// Solar panel sun exposition, `0..=4`.
    Exposition(u8),
    /// Tree cutter working indicator.
    Active(bool),
    /// Hatch or gate open state.
    Open(bool),
}

// ---------------------------------------------------------------------------
// Per-kind state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolarState {
    /// Secondary timer for the expensive production recalculation.
    pub recalc: Throttle,
    pub rng: SimRng,
    /// Production per tick from the last recalculation.
    pub production: u32,
    /// Energy fed to neighbours per tick during the last activation.
    pub feed_in: u32,
    pub output_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutterState {
    /// Activations the cutter keeps reporting active.
    pub active_timer: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveState {
    pub mode: ValveMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorState {
    /// Redstone level seen at the last poll, for edge detection.
    pub powered: bool,
    pub open: bool,
}

/// Kind-specific state, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KindState {
    Freezer,
    SolarPanel(SolarState),
    TreeCutter(CutterState),
    PipeValve(ValveState),
    Hatch(DoorState),
    Gate(DoorState),
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// One simulated node at a fixed position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub(crate) kind: DeviceKind,
    pub(crate) pos: BlockPos,
    pub(crate) facing: Direction,
    pub(crate) energy: Option<ResourceBuffer>,
    pub(crate) fluid: Option<ResourceBuffer>,
    pub(crate) progress: u32,
    pub(crate) progress_max: u32,
    pub(crate) throttle: Throttle,
    /// Last phase written to the world.
    pub(crate) phase: Phase,
    /// Forces the next phase publication even if unchanged.
    pub(crate) phase_dirty: bool,
    /// Set while the device is issuing a transfer; refuses inbound offers.
    pub(crate) busy: bool,
    /// Whether the device is on its idle interval.
    pub(crate) idle: bool,
    pub(crate) state: KindState,
}

impl Device {
    /// A freshly placed device with empty buffers.
    pub fn new(spec: DeviceSpec, pos: BlockPos, facing: Direction, config: &SimConfig) -> Self {
        let mut device = Self {
            kind: spec.kind(),
            pos,
            facing,
            energy: None,
            fluid: None,
            progress: 0,
            progress_max: 0,
            throttle: Throttle::new(),
            phase: Phase::Inert,
            phase_dirty: false,
            busy: false,
            idle: false,
            state: KindState::Freezer,
        };
        match spec {
            DeviceSpec::Freezer => {
                let c = &config.freezer;
                device.energy = Some(ResourceBuffer::new(c.energy_capacity, c.max_energy_transfer));
                device.fluid = Some(ResourceBuffer::new(c.fluid_capacity, c.fluid_capacity));
                device.progress_max = FreezerConfig::PROGRESS_MAX;
                device.phase = Phase::Freezer(FreezerPhase::Empty);
            }
            DeviceSpec::SolarPanel => {
                let c = &config.solar_panel;
                device.energy = Some(ResourceBuffer::new(c.capacity, c.max_feed_per_activation()));
                device.phase = Phase::Exposition(1);
                device.state = KindState::SolarPanel(SolarState {
                    recalc: Throttle::new(),
                    rng: SimRng::for_position(pos),
                    production: 0,
                    feed_in: 0,
                    output_enabled: false,
                });
            }
            DeviceSpec::TreeCutter => {
                let c = &config.tree_cutter;
                let capacity = c.energy_capacity();
                device.energy = Some(ResourceBuffer::new(capacity, capacity));
                device.progress_max = c.cutting_time_ticks();
                device.phase = Phase::Active(false);
                device.state = KindState::TreeCutter(CutterState::default());
            }
            DeviceSpec::PipeValve(mode) => {
                device.state = KindState::PipeValve(ValveState { mode });
            }
            DeviceSpec::Hatch => {
                device.phase = Phase::Open(false);
                device.state = KindState::Hatch(DoorState::default());
            }
            DeviceSpec::Gate => {
                device.phase = Phase::Open(false);
                device.state = KindState::Gate(DoorState::default());
            }
        }
        device
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn pos(&self) -> BlockPos {
        self.pos
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn progress_max(&self) -> u32 {
        self.progress_max
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn state(&self) -> &KindState {
        &self.state
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn buffer(&self, resource: ResourceKind) -> Option<&ResourceBuffer> {
        match resource {
            ResourceKind::Energy => self.energy.as_ref(),
            ResourceKind::Fluid => self.fluid.as_ref(),
        }
    }

    pub(crate) fn buffer_mut(&mut self, resource: ResourceKind) -> Option<&mut ResourceBuffer> {
        match resource {
            ResourceKind::Energy => self.energy.as_mut(),
            ResourceKind::Fluid => self.fluid.as_mut(),
        }
    }

    /// Amount held of `resource`, 0 when the device has no such buffer.
    pub fn amount(&self, resource: ResourceKind) -> u32 {
        self.buffer(resource).map_or(0, ResourceBuffer::amount)
    }

    /// Whether a buffer of `resource` exists and has room left.
    pub fn has_headroom(&self, resource: ResourceKind) -> bool {
        self.buffer(resource).is_some_and(|b| !b.is_full())
    }

    /// Set progress, clamped to `[0, progress_max]`.
    pub(crate) fn set_progress(&mut self, progress: u32) {
        self.progress = progress.min(self.progress_max);
    }

    /// Local recovery when the backing block no longer matches: progress and
    /// every timer go back to their initial state. Buffers are kept.
    pub(crate) fn abort(&mut self) {
        self.progress = 0;
        self.throttle.reset();
        self.busy = false;
        self.idle = false;
        self.phase_dirty = true;
        match &mut self.state {
            KindState::SolarPanel(s) => {
                s.recalc.reset();
                s.production = 0;
                s.feed_in = 0;
            }
            KindState::TreeCutter(s) => s.active_timer = 0,
            _ => {}
        }
    }

    pub fn solar(&self) -> Option<&SolarState> {
        match &self.state {
            KindState::SolarPanel(s) => Some(s),
            _ => None,
        }
    }

    pub fn door(&self) -> Option<&DoorState> {
        match &self.state {
            KindState::Hatch(s) | KindState::Gate(s) => Some(s),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Save data
    // -----------------------------------------------------------------------

    /// Persisted state: buffer amounts and progress.
    pub fn save(&self) -> SaveData {
        let mut data = SaveData::default();
        if let Some(energy) = &self.energy {
            data.put("energy", energy.amount() as i64);
        }
        if let Some(fluid) = &self.fluid {
            data.put("fluid", fluid.amount() as i64);
        }
        if self.progress_max > 0 {
            data.put("progress", self.progress as i64);
        }
        data
    }

    /// Restore persisted state. Values are clamped; missing keys read as 0.
    /// The phase is republished on the next update.
    pub fn load(&mut self, data: &SaveData) {
        if let Some(energy) = &mut self.energy {
            energy.set_amount(data.get_u32("energy"));
        }
        if let Some(fluid) = &mut self.fluid {
            fluid.set_amount(data.get_u32("fluid"));
        }
        self.set_progress(data.get_u32("progress"));
        self.phase_dirty = true;
    }
}

/// Opaque integer key/value blob stored in the host's per-block save data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveData(BTreeMap<String, i64>);

impl SaveData {
    pub fn put(&mut self, key: &str, value: i64) {
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.0.get(key).copied()
    }

    fn get_u32(&self, key: &str) -> u32 {
        self.get(key).unwrap_or(0).clamp(0, u32::MAX as i64) as u32
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
