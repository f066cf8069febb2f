//! Immutable simulation configuration.
//!
//! [`SimConfig`] is built once at startup (from defaults or a data file),
//! passed through [`SimConfig::validated`] to clamp every value into its
//! supported range, and then shared by reference with every device. Nothing
//! in the simulation mutates it.

use serde::{Deserialize, Serialize};

/// Ticks per second of the host clock.
pub const TICKS_PER_SECOND: u32 = 20;

/// Top-level configuration, one section per device kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub freezer: FreezerConfig,
    pub solar_panel: SolarPanelConfig,
    pub tree_cutter: TreeCutterConfig,
    pub pipe_valve: PipeValveConfig,
    pub door: DoorConfig,
}

impl SimConfig {
    /// Clamp every section into its supported range.
    pub fn validated(self) -> Self {
        let config = Self {
            freezer: self.freezer.validated(),
            solar_panel: self.solar_panel.validated(),
            tree_cutter: self.tree_cutter.validated(),
            pipe_valve: self.pipe_valve.validated(),
            door: self.door.validated(),
        };
        tracing::info!(
            consumption = config.freezer.consumption,
            cooldown_rate = config.freezer.cooldown_rate,
            "freezer configured"
        );
        tracing::info!(
            peak = config.solar_panel.peak_production,
            capacity = config.solar_panel.capacity,
            max_feed_in = config.solar_panel.max_feed_in,
            "solar panel configured"
        );
        tracing::info!(
            boost = config.tree_cutter.boost_per_activation(),
            cutting_ticks = config.tree_cutter.cutting_time_ticks(),
            requires_power = config.tree_cutter.requires_power,
            "tree cutter configured"
        );
        tracing::info!(
            max_flow = config.pipe_valve.max_flow,
            redstone_slope = config.pipe_valve.redstone_slope,
            "pipe valve configured"
        );
        config
    }
}

// ---------------------------------------------------------------------------
// Freezer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreezerConfig {
    pub tick_interval: u32,
    pub fluid_capacity: u32,
    /// Fluid required before freezing can start.
    pub fluid_minimum: u32,
    pub energy_capacity: u32,
    pub max_energy_transfer: u32,
    /// Energy drained per tick while freezing.
    pub consumption: u32,
    /// Progress gained per activation while freezing.
    pub cooldown_rate: u32,
    /// Progress lost per activation while unpowered or inhibited. Derived
    /// from the cooldown rate when unset.
    pub reheat_rate: Option<u32>,
}

impl FreezerConfig {
    pub const PROGRESS_MAX: u32 = 100;

    pub fn validated(self) -> Self {
        let fluid_capacity = self.fluid_capacity.max(1);
        let energy_capacity = self.energy_capacity.max(1);
        Self {
            tick_interval: self.tick_interval.clamp(1, 200),
            fluid_capacity,
            fluid_minimum: self.fluid_minimum.clamp(1, fluid_capacity),
            energy_capacity,
            max_energy_transfer: self.max_energy_transfer.clamp(1, energy_capacity),
            consumption: self.consumption.clamp(8, 4096),
            cooldown_rate: self.cooldown_rate.clamp(1, 5),
            reheat_rate: self.reheat_rate.map(|r| r.clamp(1, 100)),
        }
    }

    pub fn reheat_rate(&self) -> u32 {
        self.reheat_rate
            .unwrap_or_else(|| (self.cooldown_rate / 2).clamp(1, 5))
    }

    /// Energy drained by one freezing activation.
    pub fn freezing_cost(&self) -> u32 {
        self.consumption.saturating_mul(self.tick_interval)
    }

    /// Energy drained by one activation holding the fully frozen state.
    pub fn holding_cost(&self) -> u32 {
        self.freezing_cost() / TICKS_PER_SECOND
    }
}

impl Default for FreezerConfig {
    fn default() -> Self {
        Self {
            tick_interval: 20,
            fluid_capacity: 2000,
            fluid_minimum: 1000,
            energy_capacity: 32000,
            max_energy_transfer: 8192,
            consumption: 144,
            cooldown_rate: 2,
            reheat_rate: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Solar panel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarPanelConfig {
    pub tick_interval: u32,
    /// Activations between production recalculations.
    pub accumulation_interval: u32,
    /// Multiplier on the tick interval while the sky is not visible.
    pub idle_factor: u32,
    /// Production per tick at noon in clear weather.
    pub peak_production: u32,
    pub capacity: u32,
    /// Maximum energy fed into one neighbour per tick.
    pub max_feed_in: u32,
}

impl SolarPanelConfig {
    pub fn validated(self) -> Self {
        Self {
            tick_interval: self.tick_interval.clamp(1, 100),
            accumulation_interval: self.accumulation_interval.clamp(1, 100),
            idle_factor: self.idle_factor.clamp(1, 100),
            peak_production: self.peak_production.clamp(12, 8192),
            capacity: self.capacity.clamp(1000, 10_000_000),
            max_feed_in: self.max_feed_in.clamp(1, 1_000_000),
        }
    }

    /// Battery level above which the panel starts feeding neighbours.
    pub fn feeding_threshold(&self) -> u32 {
        (self.capacity / 5).max(1000)
    }

    /// Minimum difference to a peer before a balancing chunk is moved; also
    /// the size of that chunk.
    pub fn balancing_threshold(&self) -> u32 {
        (self.capacity / 10).max(1000)
    }

    /// Maximum energy fed into one neighbour per activation.
    pub fn max_feed_per_activation(&self) -> u32 {
        self.max_feed_in.saturating_mul(self.tick_interval)
    }

    /// Ticks covered by one production recalculation.
    pub fn accumulation_ticks(&self) -> u32 {
        self.tick_interval * self.accumulation_interval
    }
}

impl Default for SolarPanelConfig {
    fn default() -> Self {
        Self {
            tick_interval: 4,
            accumulation_interval: 8,
            idle_factor: 10,
            peak_production: 40,
            capacity: 64000,
            max_feed_in: 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// Tree cutter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeCutterConfig {
    pub tick_interval: u32,
    pub idle_interval: u32,
    /// Progress multiplier applied while boost energy is available.
    pub boost_factor: u32,
    /// Boost energy drained per tick.
    pub boost_energy: u32,
    pub cutting_time_secs: u32,
    /// When set, the cutter makes no net progress without energy.
    pub requires_power: bool,
}

impl TreeCutterConfig {
    pub fn validated(self) -> Self {
        Self {
            tick_interval: self.tick_interval.clamp(1, 100),
            idle_interval: self.idle_interval.clamp(1, 1000),
            boost_factor: self.boost_factor.clamp(1, 100),
            boost_energy: self.boost_energy.clamp(4, 4096),
            cutting_time_secs: self.cutting_time_secs.clamp(10, 240),
            requires_power: self.requires_power,
        }
    }

    pub fn boost_per_activation(&self) -> u32 {
        self.boost_energy * self.tick_interval
    }

    pub fn energy_capacity(&self) -> u32 {
        (self.boost_per_activation() * 10).max(10000)
    }

    pub fn cutting_time_ticks(&self) -> u32 {
        self.cutting_time_secs * TICKS_PER_SECOND
    }
}

impl Default for TreeCutterConfig {
    fn default() -> Self {
        Self {
            tick_interval: 5,
            idle_interval: 40,
            boost_factor: 6,
            boost_energy: 64,
            cutting_time_secs: 60,
            requires_power: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipe valve
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeValveConfig {
    /// Maximum fluid forwarded per transfer.
    pub max_flow: u32,
    /// Fluid per redstone signal level for analog valves.
    pub redstone_slope: u32,
}

impl PipeValveConfig {
    pub fn validated(self) -> Self {
        Self {
            max_flow: self.max_flow.clamp(1, 32000),
            redstone_slope: self.redstone_slope.clamp(1, 32000),
        }
    }
}

impl Default for PipeValveConfig {
    fn default() -> Self {
        Self {
            max_flow: 1000,
            redstone_slope: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// Hatches and gates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorConfig {
    pub tick_interval: u32,
}

impl DoorConfig {
    pub fn validated(self) -> Self {
        Self {
            tick_interval: self.tick_interval.clamp(1, 20),
        }
    }
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self { tick_interval: 2 }
    }
}
