//! Peer balancing between adjacent devices of the same kind.
//!
//! Producers such as solar panels refuse energy, so a fully charged panel
//! next to an empty one never equalizes through the exchange protocol. The
//! balancer moves flat chunks from the richer device to poorer peers with
//! [`Exchange::peer_transfer`] until every peer is within one chunk.

use tracing::debug;

use crate::buffer::ResourceKind;
use crate::event::DeviceEvent;
use crate::exchange::{Exchange, Probe};
use crate::id::DeviceId;
use crate::pos::Direction;

/// Chunk size and resource balanced for a device, if its kind balances.
fn chunk_for(ex: &Exchange<'_>, id: DeviceId) -> Option<(ResourceKind, u32)> {
    let device = ex.device(id)?;
    device
        .kind()
        .capabilities()
        .energy_producer
        .then(|| (ResourceKind::Energy, ex.config().solar_panel.balancing_threshold()))
}

/// Same-kind neighbours in `directions` that expose the resource but refuse
/// it, in direction order.
pub fn discover_peers(ex: &mut Exchange<'_>, id: DeviceId, directions: &[Direction]) -> Vec<DeviceId> {
    let Some((resource, _)) = chunk_for(ex, id) else {
        return Vec::new();
    };
    let Some(device) = ex.device(id) else {
        return Vec::new();
    };
    let (pos, kind) = (device.pos(), device.kind());
    directions
        .iter()
        .filter_map(|&dir| match ex.probe(pos, dir, resource) {
            Probe::Refusing(Some(peer)) if ex.device(peer).is_some_and(|d| d.kind() == kind) => Some(peer),
            _ => None,
        })
        .collect()
}

/// Move one chunk to every peer holding less than `mine - chunk`, stopping
/// once this device drops below one chunk. Returns the total moved.
///
/// Once every peer is within one chunk of this device a pass moves nothing.
pub fn balance(ex: &mut Exchange<'_>, id: DeviceId, peers: &[DeviceId]) -> u32 {
    let Some((resource, chunk)) = chunk_for(ex, id) else {
        return 0;
    };
    let mut moved = 0;
    for &peer in peers {
        let mine = ex.amount(id, resource);
        let theirs = ex.amount(peer, resource);
        if theirs >= mine.saturating_sub(chunk) {
            continue;
        }
        let amount = ex.peer_transfer(id, peer, resource, chunk);
        if amount > 0 {
            moved += amount;
            debug!(from = ?id, to = ?peer, amount, "balanced");
            let tick = ex.tick();
            ex.emit(DeviceEvent::Balanced {
                from: id,
                to: peer,
                resource,
                amount,
                tick,
            });
        }
        if ex.amount(id, resource) < chunk {
            break;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use crate::buffer::ResourceKind;
    use crate::config::SimConfig;
    use crate::device::DeviceSpec;
    use crate::pos::{BlockPos, Direction};
    use crate::sim::Simulation;
    use crate::test_utils::MockWorld;

    fn row(amounts: &[u32]) -> (Simulation, MockWorld, Vec<BlockPos>) {
        let mut sim = Simulation::with_config(SimConfig::default());
        let world = MockWorld::new();
        let mut positions = Vec::new();
        for (i, &amount) in amounts.iter().enumerate() {
            let pos = BlockPos::new(i as i32, 64, 0);
            let id = sim.place(DeviceSpec::SolarPanel, pos, Direction::North).unwrap();
            sim.device_mut(id).unwrap().energy.as_mut().unwrap().set_amount(amount);
            positions.push(pos);
        }
        (sim, world, positions)
    }

    #[test]
    fn moves_one_chunk_per_poorer_peer() {
        let (mut sim, mut world, pos) = row(&[0, 60_000, 0]);
        let moved = sim.balance(&mut world, pos[1]);
        assert_eq!(moved, 12_800);
        assert_eq!(sim.device_at(pos[0]).unwrap().amount(ResourceKind::Energy), 6400);
        assert_eq!(sim.device_at(pos[1]).unwrap().amount(ResourceKind::Energy), 47_200);
        assert_eq!(sim.device_at(pos[2]).unwrap().amount(ResourceKind::Energy), 6400);
    }

    #[test]
    fn within_threshold_is_a_fixed_point() {
        let (mut sim, mut world, pos) = row(&[19_200, 21_600, 19_200]);
        for p in &pos {
            assert_eq!(sim.balance(&mut world, *p), 0);
        }
        assert_eq!(sim.device_at(pos[1]).unwrap().amount(ResourceKind::Energy), 21_600);
    }

    #[test]
    fn repeated_passes_converge_then_stop() {
        let (mut sim, mut world, pos) = row(&[0, 60_000, 0]);
        let mut passes = 0;
        while sim.balance(&mut world, pos[1]) > 0 {
            passes += 1;
            assert!(passes < 10);
        }
        assert_eq!(passes, 3);
        assert_eq!(sim.balance(&mut world, pos[1]), 0);
        let amounts: Vec<u32> = pos
            .iter()
            .map(|p| sim.device_at(*p).unwrap().amount(ResourceKind::Energy))
            .collect();
        assert_eq!(amounts, vec![19_200, 21_600, 19_200]);
    }

    #[test]
    fn only_same_kind_neighbours_are_peers() {
        let mut sim = Simulation::with_config(SimConfig::default());
        let mut world = MockWorld::new();
        let origin = BlockPos::new(0, 64, 0);
        let panel = sim.place(DeviceSpec::SolarPanel, origin, Direction::North).unwrap();
        sim.place(DeviceSpec::Hatch, origin.offset(Direction::East), Direction::North).unwrap();
        sim.device_mut(panel).unwrap().energy.as_mut().unwrap().set_amount(60_000);
        assert_eq!(sim.balance(&mut world, origin), 0);
    }
}
