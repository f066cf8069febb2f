use slotmap::new_key_type;

new_key_type! {
    /// Identifies a placed device. Stable for the device's lifetime; a
    /// removed device's key is never handed out again for a live device.
    pub struct DeviceId;
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn removed_keys_are_not_live() {
        let mut sm = SlotMap::<DeviceId, u32>::with_key();
        let a = sm.insert(1);
        sm.remove(a);
        let b = sm.insert(2);
        assert_ne!(a, b);
        assert!(sm.get(a).is_none());
    }

    #[test]
    fn ids_are_ordered_and_hashable() {
        use std::collections::{BTreeSet, HashMap};
        let mut sm = SlotMap::<DeviceId, ()>::with_key();
        let ids: Vec<DeviceId> = (0..3).map(|_| sm.insert(())).collect();
        let set: BTreeSet<DeviceId> = ids.iter().copied().collect();
        assert_eq!(set.len(), 3);
        let mut map = HashMap::new();
        map.insert(ids[0], "freezer");
        assert_eq!(map[&ids[0]], "freezer");
    }
}
