//! Solar panel: accumulates energy from sunlight into a battery and feeds
//! it to receiving neighbours. Adjacent panels that cannot take energy
//! directly are balanced against each other.

use crate::balancer;
use crate::buffer::ResourceKind;
use crate::capability::{self, CapabilityRegistry};
use crate::config::SolarPanelConfig;
use crate::device::{DeviceKind, KindState, Phase, SolarState};
use crate::exchange::{Exchange, Probe};
use crate::fixed::{Fixed64, f64_to_fixed64, ratio, scale, unit_clamp};
use crate::id::DeviceId;
use crate::pos::Direction;
use crate::world::Environment;

/// Faces a panel feeds through, in visiting order. Never up.
pub const FEED_DIRECTIONS: [Direction; 5] = [
    Direction::Down,
    Direction::East,
    Direction::South,
    Direction::West,
    Direction::North,
];

/// Exposition reported while the sky is hidden.
const SHADED_EXPOSITION: u8 = 2;

pub(crate) fn register(registry: &mut CapabilityRegistry) {
    registry.register(DeviceKind::SolarPanel, ResourceKind::Energy, capability::refuse_all_sides);
}

fn solar_mut<'d>(ex: &'d mut Exchange<'_>, id: DeviceId) -> Option<&'d mut SolarState> {
    match &mut ex.device_mut(id)?.state {
        KindState::SolarPanel(state) => Some(state),
        _ => None,
    }
}

pub(crate) fn update(ex: &mut Exchange<'_>, id: DeviceId) {
    let config = &ex.config().solar_panel;
    let Some(device) = ex.device(id) else {
        return;
    };
    let pos = device.pos;
    let Some(state) = device.solar() else {
        return;
    };
    let (output_enabled, production) = (state.output_enabled, state.production);

    // Feed receivers; remember panels that refused.
    let mut fed = 0u32;
    let mut peers = Vec::new();
    if output_enabled {
        for dir in FEED_DIRECTIONS {
            let stored = ex.amount(id, ResourceKind::Energy);
            if stored == 0 {
                break;
            }
            match ex.probe(pos, dir, ResourceKind::Energy) {
                Probe::Receiving => {
                    let per_tick = if stored > config.capacity / 10 {
                        config.max_feed_in
                    } else {
                        production.saturating_mul(2).max(config.peak_production / 4)
                    };
                    fed += ex.push(id, dir, ResourceKind::Energy, per_tick.saturating_mul(config.tick_interval));
                }
                Probe::Refusing(Some(peer))
                    if ex.device(peer).is_some_and(|d| d.kind() == DeviceKind::SolarPanel) =>
                {
                    peers.push(peer);
                }
                _ => {}
            }
        }
    }
    let feed_in = fed / config.tick_interval;
    if let Some(state) = solar_mut(ex, id) {
        state.feed_in = feed_in;
    }

    if feed_in == 0 && (ex.amount(id, ResourceKind::Energy) >= config.balancing_threshold() || production == 0) {
        balancer::balance(ex, id, &peers);
    }

    let env = ex.world.environment(pos);
    if !env.sky_visible {
        shade(ex, id, config);
        return;
    }
    ex.set_idle(id, false);

    let battery_empty = ex.amount(id, ResourceKind::Energy) == 0;
    let Some(state) = solar_mut(ex, id) else {
        return;
    };
    if battery_empty {
        state.output_enabled = false;
    }
    if !state.recalc.tick() {
        return;
    }
    let jitter = state.rng.coin();
    state.recalc.arm(config.accumulation_interval + jitter);

    let theta = sun_theta(env.celestial_angle);
    ex.publish_phase(id, Phase::Exposition(exposition(theta)));

    let production = production_per_tick(&env, theta, config);
    let Some(device) = ex.device_mut(id) else {
        return;
    };
    let stored = device
        .energy
        .as_mut()
        .map_or(0, |battery| {
            battery.fill(production.saturating_mul(config.accumulation_ticks()));
            battery.amount()
        });
    if let KindState::SolarPanel(state) = &mut device.state {
        state.production = production;
        if stored >= config.feeding_threshold() {
            state.output_enabled = true;
        }
    }
}

/// No sky: produce nothing, poll slowly, keep feeding from the battery.
fn shade(ex: &mut Exchange<'_>, id: DeviceId, config: &SolarPanelConfig) {
    let Some(device) = ex.device_mut(id) else {
        return;
    };
    device.throttle.arm(config.tick_interval.saturating_mul(config.idle_factor));
    let has_charge = device.amount(ResourceKind::Energy) > 0;
    if let KindState::SolarPanel(state) = &mut device.state {
        state.production = 0;
        if has_charge {
            state.output_enabled = true;
        }
    }
    ex.set_idle(id, true);
    ex.publish_phase(id, Phase::Exposition(SHADED_EXPOSITION));
}

/// Sun position in whole degrees, `0..360`, with sunrise at 0 and noon at 90.
pub fn sun_theta(celestial_angle: Fixed64) -> i32 {
    let degrees = celestial_angle * Fixed64::from_num(180) / Fixed64::PI;
    (degrees.to_num::<i32>() + 90).rem_euclid(360)
}

/// Exposition stage `0..=4` for the block state.
pub fn exposition(theta: i32) -> u8 {
    match theta {
        t if t > 340 => 2,
        t if t < 45 => 0,
        t if t < 80 => 1,
        t if t < 100 => 2,
        t if t < 135 => 3,
        t if t < 190 => 4,
        _ => 2,
    }
}

/// Squared sine of the sun's elevation: 0 below the horizon, 1 at noon.
pub fn sun_factor(theta: i32) -> Fixed64 {
    let folded = match theta {
        t if !(0..=180).contains(&t) => 0,
        t if t > 90 => 180 - t,
        t => t,
    };
    let rf = (std::f64::consts::FRAC_PI_2 * (f64::from(folded) / 90.0).sqrt()).sin();
    unit_clamp(f64_to_fixed64(rf * rf))
}

/// Weather efficiency: `1 - (rain * 0.6 + thunder * 0.3)`.
pub fn weather_factor(env: &Environment) -> Fixed64 {
    let loss = (env.rain * Fixed64::from_num(6) + env.thunder * Fixed64::from_num(3)) / Fixed64::from_num(10);
    unit_clamp(Fixed64::ONE - loss)
}

pub fn production_per_tick(env: &Environment, theta: i32, config: &SolarPanelConfig) -> u32 {
    let light = ratio(u32::from(env.light_level.min(15)), 15);
    let factor = unit_clamp(sun_factor(theta) * weather_factor(env) * light);
    scale(config.peak_production, factor)
}
