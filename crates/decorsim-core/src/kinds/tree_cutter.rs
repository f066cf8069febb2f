//! Tree cutter: fells the tree in front of it after a cutting time, faster
//! when boosted with energy.

use tracing::debug;

use crate::buffer::ResourceKind;
use crate::capability::{self, CapabilityRegistry};
use crate::device::{DeviceKind, KindState, Phase};
use crate::event::DeviceEvent;
use crate::exchange::Exchange;
use crate::id::DeviceId;
use crate::world::{Effect, ParticleKind};

/// Activations a boost keeps the cutter active.
const BOOST_ACTIVE_TIMER: u32 = 2;
/// Active timer when no power is required.
const UNPOWERED_ACTIVE_TIMER: u32 = 1024;
const HARVEST_PARTICLES: u32 = 8;

pub(crate) fn register(registry: &mut CapabilityRegistry) {
    registry.register(DeviceKind::TreeCutter, ResourceKind::Energy, capability::energy_store_all_sides);
}

pub(crate) fn update(ex: &mut Exchange<'_>, id: DeviceId) {
    let config = &ex.config().tree_cutter;
    let Some(device) = ex.device(id) else {
        return;
    };
    let (pos, target) = (device.pos(), device.pos().offset(device.facing()));

    if !ex.world.can_harvest(target) || ex.world.environment(pos).powered() {
        if let Some(device) = ex.device_mut(id) {
            device.progress = 0;
            device.throttle.arm(config.idle_interval);
            if let KindState::TreeCutter(state) = &mut device.state {
                state.active_timer = 0;
            }
        }
        ex.set_idle(id, true);
        ex.publish_phase(id, Phase::Active(false));
        return;
    }
    ex.set_idle(id, false);

    let Some(device) = ex.device_mut(id) else {
        return;
    };
    let interval = config.tick_interval;
    let boost = config.boost_per_activation();
    let mut progress = device.progress + interval;
    let boosted = device
        .energy
        .as_mut()
        .is_some_and(|battery| battery.amount() >= boost && battery.drain(boost) == boost);
    let KindState::TreeCutter(state) = &mut device.state else {
        return;
    };
    if boosted {
        progress += interval * config.boost_factor;
        state.active_timer = BOOST_ACTIVE_TIMER;
    } else if !config.requires_power {
        state.active_timer = UNPOWERED_ACTIVE_TIMER;
    } else {
        state.active_timer = state.active_timer.saturating_sub(1);
    }
    let mut active = state.active_timer > 0;
    if config.requires_power && !active {
        progress = progress.saturating_sub(2 * interval);
    }

    let harvested = progress >= device.progress_max;
    device.set_progress(if harvested { 0 } else { progress });

    if harvested {
        active = false;
        ex.world.harvest(target);
        ex.world.play_effect(pos, Effect::WoodBreak);
        ex.world.spawn_particles(target, ParticleKind::WoodChips, HARVEST_PARTICLES);
        debug!(?id, ?target, "tree harvested");
        let tick = ex.tick();
        ex.emit(DeviceEvent::Harvested { device: id, target, tick });
    } else if active {
        ex.world.play_effect(pos, Effect::WoodHit);
    }
    ex.publish_phase(id, Phase::Active(active));
}

#[cfg(test)]
mod tests {
    use crate::buffer::ResourceKind;
    use crate::config::{SimConfig, TreeCutterConfig};
    use crate::device::{DeviceSpec, Phase};
    use crate::pos::{BlockPos, Direction};
    use crate::sim::Simulation;
    use crate::test_utils::{MockWorld, offer_all};
    use crate::world::Effect;

    const POS: BlockPos = BlockPos::new(0, 64, 0);

    fn setup(config: TreeCutterConfig) -> (Simulation, MockWorld, BlockPos) {
        let mut sim = Simulation::with_config(SimConfig {
            tree_cutter: config,
            ..SimConfig::default()
        });
        let mut world = MockWorld::new();
        sim.place(DeviceSpec::TreeCutter, POS, Direction::North).unwrap();
        let tree = POS.offset(Direction::North);
        world.add_tree(tree);
        (sim, world, tree)
    }

    #[test]
    fn without_tree_goes_idle() {
        let (mut sim, mut world, tree) = setup(TreeCutterConfig::default());
        world.trees.remove(&tree);
        sim.step(&mut world);
        let d = sim.device_at(POS).unwrap();
        assert!(d.is_idle());
        assert_eq!(d.throttle().remaining(), 40);
        assert_eq!(d.progress(), 0);
    }

    #[test]
    fn unpowered_cutter_harvests_after_cutting_time() {
        let (mut sim, mut world, tree) = setup(TreeCutterConfig::default());
        // 1200 ticks of progress at 5 per activation: the 240th activation cuts.
        sim.run(&mut world, 5 * 238 + 1);
        assert!(world.harvested.is_empty());
        assert_eq!(sim.device_at(POS).unwrap().phase(), Phase::Active(true));
        sim.run(&mut world, 5);
        assert_eq!(world.harvested, vec![tree]);
        let d = sim.device_at(POS).unwrap();
        assert_eq!(d.progress(), 0);
        assert_eq!(d.phase(), Phase::Active(false));
        assert_eq!(world.effect_count(Effect::WoodBreak), 1);
    }

    #[test]
    fn boost_speeds_up_cutting() {
        let (mut sim, mut world, _) = setup(TreeCutterConfig::default());
        offer_all(&mut sim, &mut world, POS, ResourceKind::Energy, 10_000);
        sim.step(&mut world);
        let d = sim.device_at(POS).unwrap();
        assert_eq!(d.progress(), 5 + 30);
        assert_eq!(d.amount(ResourceKind::Energy), 10_000 - 320);
    }

    #[test]
    fn redstone_inhibits() {
        let (mut sim, mut world, _) = setup(TreeCutterConfig::default());
        sim.run(&mut world, 11);
        assert_eq!(sim.device_at(POS).unwrap().progress(), 15);
        world.environment_at(POS).redstone_signal = 3;
        sim.run(&mut world, 5);
        let d = sim.device_at(POS).unwrap();
        assert_eq!(d.progress(), 0);
        assert_eq!(d.phase(), Phase::Active(false));
    }

    #[test]
    fn required_power_without_energy_makes_no_progress() {
        let (mut sim, mut world, _) = setup(TreeCutterConfig {
            requires_power: true,
            ..TreeCutterConfig::default()
        });
        sim.run(&mut world, 50);
        let d = sim.device_at(POS).unwrap();
        assert_eq!(d.progress(), 0);
        assert_eq!(d.phase(), Phase::Active(false));
    }
}
