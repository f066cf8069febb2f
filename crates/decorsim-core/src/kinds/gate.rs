//! Double gate: two gate segments stacked vertically act as one gate.

use crate::device::{Device, DeviceKind};
use crate::exchange::Exchange;
use crate::id::DeviceId;
use crate::kinds::Interaction;
use crate::kinds::hatch::{door_mut, set_open};
use crate::pos::Direction;

/// The segment stacked directly above or below, above first.
pub(crate) fn partner(ex: &Exchange<'_>, id: DeviceId) -> Option<DeviceId> {
    let pos = ex.device(id)?.pos();
    [Direction::Up, Direction::Down].into_iter().find_map(|dir| {
        ex.neighbor(pos, dir)
            .filter(|&n| ex.device(n).is_some_and(|d| d.kind() == DeviceKind::Gate))
    })
}

pub(crate) fn update(ex: &mut Exchange<'_>, id: DeviceId) {
    let Some(pos) = ex.device(id).map(Device::pos) else {
        return;
    };
    let partner = partner(ex, id);
    let partner_pos = partner.and_then(|p| ex.device(p)).map(Device::pos);
    let powered = ex.world.environment(pos).powered()
        || partner_pos.is_some_and(|p| ex.world.environment(p).powered());

    let Some(state) = door_mut(ex, id) else {
        return;
    };
    if state.powered == powered {
        return;
    }
    state.powered = powered;
    set_open(ex, id, powered);
    if let Some(partner) = partner {
        if let Some(state) = door_mut(ex, partner) {
            state.powered = powered;
        }
        set_open(ex, partner, powered);
    }
}

pub(crate) fn toggle(ex: &mut Exchange<'_>, id: DeviceId) -> Interaction {
    let Some(open) = door_mut(ex, id).map(|s| !s.open) else {
        return Interaction::None;
    };
    set_open(ex, id, open);
    if let Some(partner) = partner(ex, id) {
        set_open(ex, partner, open);
    }
    Interaction::Toggled { open }
}

#[cfg(test)]
mod tests {
    use crate::config::SimConfig;
    use crate::device::DeviceSpec;
    use crate::kinds::Interaction;
    use crate::pos::{BlockPos, Direction};
    use crate::sim::Simulation;
    use crate::test_utils::MockWorld;

    const LOWER: BlockPos = BlockPos::new(0, 64, 0);
    const UPPER: BlockPos = BlockPos::new(0, 65, 0);

    fn setup() -> (Simulation, MockWorld) {
        let mut sim = Simulation::with_config(SimConfig::default());
        sim.place(DeviceSpec::Gate, LOWER, Direction::East).unwrap();
        sim.place(DeviceSpec::Gate, UPPER, Direction::East).unwrap();
        (sim, MockWorld::new())
    }

    fn is_open(sim: &Simulation, pos: BlockPos) -> bool {
        sim.device_at(pos).and_then(|d| d.door()).is_some_and(|d| d.open)
    }

    #[test]
    fn either_segment_powered_opens_both() {
        let (mut sim, mut world) = setup();
        world.environment_at(UPPER).redstone_signal = 4;
        sim.step(&mut world);
        assert!(is_open(&sim, LOWER));
        assert!(is_open(&sim, UPPER));
        world.environment_at(UPPER).redstone_signal = 0;
        sim.run(&mut world, 2);
        assert!(!is_open(&sim, LOWER));
        assert!(!is_open(&sim, UPPER));
    }

    #[test]
    fn interact_toggles_both_segments() {
        let (mut sim, mut world) = setup();
        assert_eq!(sim.interact(&mut world, UPPER), Some(Interaction::Toggled { open: true }));
        assert!(is_open(&sim, LOWER));
        assert!(is_open(&sim, UPPER));
        sim.run(&mut world, 4);
        assert!(is_open(&sim, LOWER));
    }

    #[test]
    fn lone_gate_has_no_partner() {
        let mut sim = Simulation::with_config(SimConfig::default());
        let mut world = MockWorld::new();
        sim.place(DeviceSpec::Gate, LOWER, Direction::East).unwrap();
        sim.place(DeviceSpec::Hatch, UPPER, Direction::East).unwrap();
        sim.interact(&mut world, LOWER);
        assert!(is_open(&sim, LOWER));
        assert!(!is_open(&sim, UPPER));
    }
}
