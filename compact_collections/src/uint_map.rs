// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::table;

/// Slot has never held a key.
const EMPTY: i32 = -1;
/// Slot held a key that was removed; a tombstone for probing.
const DELETED: i32 = -2;

/// An open-addressed map from non-negative `i32` keys to a value that is
/// either an object or an `i32`, never both at once.
///
/// This backs slot-indexed stores: keys are small dense or sparse
/// integers such as local-variable and operand indices. Because keys must
/// be non-negative, the key array itself encodes the slot state with the
/// reserved values `EMPTY = -1` and `DELETED = -2`, and the key doubles as its own
/// hash input. Probing, tombstones, and the 75% growth threshold match
/// [ValueIntMap](crate::ValueIntMap).
///
/// Storage is as lazy as the workload allows: nothing is allocated before
/// the first insertion, integer values live in a second region of the key
/// array that exists only once the first integer value is stored, and the
/// object array exists only once the first object value is stored. Per
/// key, writing one value kind resets the other; `remove` clears both so
/// a re-inserted key never observes a stale value.
///
/// Negative keys are a programmer error and panic; the sentinel encoding
/// depends on keys being non-negative.
#[derive(Debug)]
pub struct UintMap<V> {
    /// The table holds `1 << power` key slots.
    power: u32,
    key_count: usize,
    occupied_count: usize,
    /// Zero-length until the first insertion; `capacity` long after that,
    /// `2 * capacity` once integer values exist (the second half holds
    /// the per-slot integer values).
    keys: Box<[i32]>,
    /// Per-slot object values; allocated on the first object insertion.
    values: Option<Box<[Option<V>]>>,
    /// Offset of the integer-value region within `keys`; 0 while absent.
    ivalues_shift: usize,
}

impl<V> Default for UintMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> UintMap<V> {
    /// Create an empty map. Allocates nothing.
    pub fn new() -> Self {
        Self::with_power(table::MIN_POWER)
    }

    /// Create an empty map sized for an expected number of keys.
    pub fn with_capacity(key_count_hint: usize) -> Self {
        Self::with_power(table::power_for_hint(key_count_hint))
    }

    fn with_power(power: u32) -> Self {
        Self {
            power,
            key_count: 0,
            occupied_count: 0,
            keys: Box::default(),
            values: None,
            ivalues_shift: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.key_count
    }

    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    pub fn contains_key(&self, key: i32) -> bool {
        check_key(key);
        self.find_slot(key).is_some()
    }

    /// Object value stored for `key`, or `None` when the key is absent or
    /// currently holds an integer value.
    pub fn get_object(&self, key: i32) -> Option<&V> {
        check_key(key);
        let slot = self.find_slot(key)?;
        self.values.as_ref()?[slot].as_ref()
    }

    /// Integer value stored for `key`, or `default` when the key is
    /// absent or currently holds an object value.
    pub fn get_int(&self, key: i32, default: i32) -> i32 {
        check_key(key);
        match self.find_slot(key) {
            Some(slot) if !self.holds_object(slot) && self.ivalues_shift != 0 => {
                self.keys[self.ivalues_shift + slot]
            }
            _ => default,
        }
    }

    /// Integer value stored for `key`. The caller contract guarantees an
    /// integer value is present.
    ///
    /// # Panics
    ///
    /// If `key` is absent or holds an object value.
    pub fn get_existing_int(&self, key: i32) -> i32 {
        check_key(key);
        let Some(slot) = self.find_slot(key) else {
            panic!("get_existing_int called for an absent key");
        };
        if self.holds_object(slot) {
            panic!("get_existing_int called for a key holding an object value");
        }
        debug_assert!(self.ivalues_shift != 0, "live key with no value kind");
        self.keys[self.ivalues_shift + slot]
    }

    /// Insert `key` with an object value, clearing any integer value the
    /// key held.
    pub fn put_object(&mut self, key: i32, value: V) {
        check_key(key);
        let slot = self.find_or_add(key);
        let capacity = 1usize << self.power;
        let values = self
            .values
            .get_or_insert_with(|| core::iter::repeat_with(|| None).take(capacity).collect());
        values[slot] = Some(value);
        if self.ivalues_shift != 0 {
            self.keys[self.ivalues_shift + slot] = 0;
        }
    }

    /// Insert `key` with an integer value, clearing any object value the
    /// key held.
    pub fn put_int(&mut self, key: i32, value: i32) {
        check_key(key);
        let slot = self.find_or_add(key);
        self.ensure_int_region();
        self.keys[self.ivalues_shift + slot] = value;
        if let Some(values) = self.values.as_mut() {
            values[slot] = None;
        }
    }

    /// Remove `key` if present, leaving a tombstone and clearing both
    /// value kinds for the slot.
    pub fn remove(&mut self, key: i32) {
        check_key(key);
        if let Some(slot) = self.find_slot(key) {
            self.keys[slot] = DELETED;
            self.key_count -= 1;
            if self.ivalues_shift != 0 {
                self.keys[self.ivalues_shift + slot] = 0;
            }
            if let Some(values) = self.values.as_mut() {
                values[slot] = None;
            }
        }
    }

    /// Reset to empty, dropping every stored object. Allocations are
    /// kept.
    pub fn clear(&mut self) {
        let capacity = 1usize << self.power;
        for cell in self.keys.iter_mut().take(capacity) {
            *cell = EMPTY;
        }
        if self.ivalues_shift != 0 {
            for cell in self.keys[self.ivalues_shift..].iter_mut() {
                *cell = 0;
            }
        }
        if let Some(values) = self.values.as_mut() {
            for value in values.iter_mut() {
                *value = None;
            }
        }
        self.key_count = 0;
        self.occupied_count = 0;
    }

    /// Snapshot of the live keys, in unspecified order.
    pub fn keys(&self) -> Vec<i32> {
        let capacity = 1usize << self.power;
        self.keys
            .iter()
            .take(capacity)
            .copied()
            .filter(|&key| key >= 0)
            .collect()
    }

    fn holds_object(&self, slot: usize) -> bool {
        self.values
            .as_ref()
            .is_some_and(|values| values[slot].is_some())
    }

    /// Slot holding `key`, or `None`. The key is its own hash input.
    fn find_slot(&self, key: i32) -> Option<usize> {
        if self.keys.is_empty() {
            return None;
        }
        let fraction = table::fraction(key as u32);
        let mask = (1usize << self.power) - 1;
        let mut slot = table::home_slot(fraction, self.power);
        let mut step = 0;
        let mut probed = 0;
        loop {
            let stored = self.keys[slot];
            if stored == key {
                return Some(slot);
            }
            if stored == EMPTY {
                return None;
            }
            probed += 1;
            debug_assert!(
                probed <= self.occupied_count,
                "probed more slots than are occupied"
            );
            if step == 0 {
                step = table::probe_step(fraction, self.power);
            }
            slot = (slot + step) & mask;
        }
    }

    /// Slot for `key`, inserting it when absent. Growth or tombstone
    /// compaction happens before a fresh slot is taken; the first
    /// tombstone along the probe sequence is revived in preference to an
    /// empty slot.
    fn find_or_add(&mut self, key: i32) -> usize {
        if let Some(slot) = self.find_slot(key) {
            return slot;
        }
        if self.keys.is_empty() {
            self.keys = vec![EMPTY; 1usize << self.power].into_boxed_slice();
        } else if table::over_occupied(self.occupied_count, self.power) {
            self.rehash();
        }
        let fraction = table::fraction(key as u32);
        let mask = (1usize << self.power) - 1;
        let mut slot = table::home_slot(fraction, self.power);
        let mut step = 0;
        let mut first_deleted = None;
        let mut probed = 0;
        while self.keys[slot] != EMPTY {
            if self.keys[slot] == DELETED && first_deleted.is_none() {
                first_deleted = Some(slot);
            }
            probed += 1;
            debug_assert!(
                probed <= self.occupied_count,
                "probed more slots than are occupied"
            );
            if step == 0 {
                step = table::probe_step(fraction, self.power);
            }
            slot = (slot + step) & mask;
        }
        let slot = match first_deleted {
            // A revived tombstone was already counted as occupied.
            Some(deleted) => deleted,
            None => {
                self.occupied_count += 1;
                slot
            }
        };
        self.keys[slot] = key;
        self.key_count += 1;
        slot
    }

    /// Rebuild the table: double when at least half of the occupied slots
    /// are live, otherwise keep the capacity and only drop tombstones.
    /// The integer region and object array carry over with their keys.
    fn rehash(&mut self) {
        let new_power = if self.key_count * 2 >= self.occupied_count {
            self.power + 1
        } else {
            self.power
        };
        let old_capacity = 1usize << self.power;
        let old_shift = self.ivalues_shift;
        let old_keys = core::mem::take(&mut self.keys);
        let mut old_values = self.values.take();

        self.power = new_power;
        let capacity = 1usize << new_power;
        let mut keys = vec![EMPTY; capacity];
        if old_shift != 0 {
            keys.resize(capacity * 2, 0);
            self.ivalues_shift = capacity;
        }
        self.keys = keys.into_boxed_slice();
        if old_values.is_some() {
            self.values = Some(core::iter::repeat_with(|| None).take(capacity).collect());
        }
        self.key_count = 0;
        self.occupied_count = 0;

        for i in 0..old_capacity {
            let key = old_keys[i];
            if key < 0 {
                continue;
            }
            let slot = self.insert_fresh(key);
            if old_shift != 0 {
                self.keys[self.ivalues_shift + slot] = old_keys[old_shift + i];
            }
            if let Some(old_values) = old_values.as_mut() {
                let moved = old_values[i].take();
                if let Some(values) = self.values.as_mut() {
                    values[slot] = moved;
                }
            }
        }
    }

    /// Insert into a table known to contain no tombstones and to have
    /// room.
    fn insert_fresh(&mut self, key: i32) -> usize {
        let fraction = table::fraction(key as u32);
        let mask = (1usize << self.power) - 1;
        let mut slot = table::home_slot(fraction, self.power);
        let mut step = 0;
        while self.keys[slot] != EMPTY {
            if step == 0 {
                step = table::probe_step(fraction, self.power);
            }
            slot = (slot + step) & mask;
        }
        self.keys[slot] = key;
        self.key_count += 1;
        self.occupied_count += 1;
        slot
    }

    /// Reallocate the key array to twice the table size; the second half
    /// holds per-slot integer values from here on.
    fn ensure_int_region(&mut self) {
        if self.ivalues_shift != 0 {
            return;
        }
        let capacity = 1usize << self.power;
        debug_assert_eq!(self.keys.len(), capacity);
        let mut grown = Vec::with_capacity(capacity * 2);
        grown.extend_from_slice(&self.keys);
        grown.resize(capacity * 2, 0);
        self.keys = grown.into_boxed_slice();
        self.ivalues_shift = capacity;
    }
}

/// Keys must be non-negative; the in-array sentinel encoding depends on
/// it. A negative key is a defect in the caller.
fn check_key(key: i32) {
    assert!(key >= 0, "negative key: {key}");
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::Rng;

    use super::*;

    #[test]
    fn int_overwrites_object() {
        let mut map = UintMap::new();
        map.put_object(5, "x");
        assert_eq!(map.get_object(5), Some(&"x"));

        map.put_int(5, 42);
        assert_eq!(map.get_object(5), None);
        assert_eq!(map.get_int(5, -1), 42);
        assert_eq!(map.get_existing_int(5), 42);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn object_overwrites_int() {
        let mut map = UintMap::new();
        map.put_int(9, 7);
        assert_eq!(map.get_int(9, -1), 7);

        map.put_object(9, String::from("obj"));
        assert_eq!(map.get_object(9), Some(&String::from("obj")));
        assert_eq!(map.get_int(9, -1), -1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn int_only_maps_never_allocate_objects() {
        let mut map: UintMap<String> = UintMap::new();
        for key in 0..50 {
            map.put_int(key, key * 3);
        }
        assert!(map.values.is_none());
        for key in 0..50 {
            assert_eq!(map.get_int(key, -1), key * 3);
        }
    }

    #[test]
    fn object_only_maps_never_grow_the_key_array() {
        let mut map = UintMap::new();
        for key in 0..50 {
            map.put_object(key, key);
        }
        assert_eq!(map.ivalues_shift, 0);
        assert_eq!(map.keys.len(), 1usize << map.power);
        for key in 0..50 {
            assert_eq!(map.get_object(key), Some(&key));
        }
    }

    #[test]
    fn nothing_allocated_before_first_insert() {
        let map: UintMap<String> = UintMap::with_capacity(100);
        assert_eq!(map.keys.len(), 0);
        assert!(map.values.is_none());
        assert!(!map.contains_key(17));
        assert_eq!(map.get_int(17, -5), -5);
        assert_eq!(map.get_object(17), None);
    }

    #[test]
    fn membership_and_size() {
        let mut map: UintMap<&str> = UintMap::new();
        for key in [0, 1, 7, 100, 4096, i32::MAX] {
            map.put_int(key, key.wrapping_mul(2));
            assert!(map.contains_key(key));
        }
        assert_eq!(map.len(), 6);
        map.put_int(7, 0);
        assert_eq!(map.len(), 6);
        map.remove(7);
        assert!(!map.contains_key(7));
        assert_eq!(map.get_int(7, -1), -1);
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn removed_slot_holds_no_stale_value() {
        let mut map = UintMap::new();
        map.put_int(3, 33);
        map.put_object(4, "four");
        map.remove(3);
        map.remove(4);

        // Re-inserting with the other value kind must not expose the old
        // cells.
        map.put_object(3, "three");
        map.put_int(4, 44);
        assert_eq!(map.get_int(3, -1), -1);
        assert_eq!(map.get_object(3), Some(&"three"));
        assert_eq!(map.get_object(4), None);
        assert_eq!(map.get_int(4, -1), 44);
    }

    #[test]
    fn keys_snapshot() {
        let mut map: UintMap<()> = UintMap::new();
        for key in [2, 30, 400, 5000] {
            map.put_int(key, 0);
        }
        map.remove(30);
        let mut keys = map.keys();
        keys.sort();
        assert_eq!(keys, vec![2, 400, 5000]);
    }

    #[test]
    fn growth_preserves_both_value_kinds() {
        let mut map = UintMap::new();
        for key in 0..300 {
            if key % 2 == 0 {
                map.put_int(key, key * 10);
            } else {
                map.put_object(key, key * 10);
            }
        }
        assert_eq!(map.len(), 300);
        for key in 0..300 {
            if key % 2 == 0 {
                assert_eq!(map.get_int(key, -1), key * 10);
                assert_eq!(map.get_object(key), None);
            } else {
                assert_eq!(map.get_object(key), Some(&(key * 10)));
                assert_eq!(map.get_int(key, -1), -1);
            }
        }
    }

    #[test]
    fn clear_empties_and_stays_usable() {
        let mut map = UintMap::new();
        for key in 0..20 {
            map.put_object(key, key);
        }
        map.clear();
        assert!(map.is_empty());
        assert!(map.keys().is_empty());
        map.put_int(5, 55);
        assert_eq!(map.get_int(5, -1), 55);
        assert_eq!(map.len(), 1);
    }

    #[test]
    #[should_panic(expected = "negative key")]
    fn negative_key_is_fatal() {
        let mut map: UintMap<()> = UintMap::new();
        map.put_int(-1, 0);
    }

    #[test]
    #[should_panic(expected = "absent key")]
    fn get_existing_int_absent_key_is_fatal() {
        let map: UintMap<()> = UintMap::new();
        map.get_existing_int(12);
    }

    #[test]
    #[should_panic(expected = "object value")]
    fn get_existing_int_on_object_key_is_fatal() {
        let mut map = UintMap::new();
        map.put_object(12, "obj");
        map.get_existing_int(12);
    }

    #[test]
    fn random_workload_matches_hashmap_oracle() {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum Stored {
            Int(i32),
            Object(u64),
        }

        let mut rng = rand::rng();
        let mut map = UintMap::new();
        let mut oracle: HashMap<i32, Stored> = HashMap::new();
        for _ in 0..5000 {
            let key = rng.random_range(0..150);
            match rng.random_range(0..10) {
                0..3 => {
                    let value = rng.random_range(i32::MIN..i32::MAX);
                    map.put_int(key, value);
                    oracle.insert(key, Stored::Int(value));
                }
                3..6 => {
                    let value = rng.random::<u64>();
                    map.put_object(key, value);
                    oracle.insert(key, Stored::Object(value));
                }
                6..8 => {
                    map.remove(key);
                    oracle.remove(&key);
                }
                _ => match oracle.get(&key) {
                    Some(Stored::Int(value)) => {
                        assert_eq!(map.get_int(key, i32::MIN), *value);
                        assert_eq!(map.get_object(key), None);
                    }
                    Some(Stored::Object(value)) => {
                        assert_eq!(map.get_object(key), Some(value));
                        assert_eq!(map.get_int(key, i32::MIN), i32::MIN);
                    }
                    None => {
                        assert!(!map.contains_key(key));
                    }
                },
            }
            assert_eq!(map.len(), oracle.len());
        }
        for (key, stored) in &oracle {
            match stored {
                Stored::Int(value) => assert_eq!(map.get_int(*key, i32::MIN), *value),
                Stored::Object(value) => assert_eq!(map.get_object(*key), Some(value)),
            }
        }
    }
}
