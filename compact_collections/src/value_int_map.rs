// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::hash::Hash;

use ahash::RandomState;

use crate::table;

/// Hash code reserved for the null key, so `None` probes like any other
/// key.
const NULL_KEY_HASH: u32 = 0x4E55_4C4C;

/// One table slot. `Empty`, `Deleted` (tombstone), and the two live
/// states are all distinguishable: probe sequences that passed through a
/// slot before its deletion stay correct, and the null key is not
/// mistaken for an empty slot.
#[derive(Debug)]
enum Slot<K> {
    Empty,
    Deleted,
    /// The live null key.
    Null,
    /// A live key.
    Key(K),
}

/// An open-addressed map from optional keys to `i32` values.
///
/// This is the symbol-table workhorse: scopes map names to slot indices,
/// compiled code maps literals to operand positions. Keys are anything
/// `Hash + Eq`; `None` is the distinguished null key and behaves like any
/// other key. Collisions are resolved in-table with golden-ratio probing,
/// deletion leaves tombstones, and the table
/// rehashes at 75% occupancy, doubling when at least half of the occupied
/// slots are live and merely compacting tombstones otherwise.
///
/// Each slot caches its key's 32-bit hash code; probing compares the
/// cached code before falling back to `K::eq`, which short-circuits
/// expensive equality checks.
pub struct ValueIntMap<K> {
    /// The table holds `1 << power` slots; never less than
    /// `1 << MIN_POWER`.
    power: u32,
    /// Live entries.
    key_count: usize,
    /// Live plus tombstoned entries; what the growth threshold counts.
    occupied_count: usize,
    /// Zero-length until the first insertion.
    slots: Box<[Slot<K>]>,
    values: Box<[i32]>,
    hashes: Box<[u32]>,
    hasher: RandomState,
}

impl<K: core::fmt::Debug> core::fmt::Debug for ValueIntMap<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K> Default for ValueIntMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> ValueIntMap<K> {
    /// Create an empty map. Allocates nothing until the first insertion.
    pub fn new() -> Self {
        Self::with_power(table::MIN_POWER)
    }

    /// Create an empty map sized for an expected number of keys. Still
    /// allocates nothing until the first insertion.
    pub fn with_capacity(key_count_hint: usize) -> Self {
        Self::with_power(table::power_for_hint(key_count_hint))
    }

    fn with_power(power: u32) -> Self {
        Self {
            power,
            key_count: 0,
            occupied_count: 0,
            slots: Box::default(),
            values: Box::default(),
            hashes: Box::default(),
            hasher: RandomState::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.key_count
    }

    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Restartable single-pass iterator over the live entries, in
    /// physical slot order (hash-dependent, not insertion order).
    pub fn iter(&self) -> Iter<'_, K> {
        Iter { map: self, slot: 0 }
    }

    /// Key projection of [iter](Self::iter).
    pub fn keys(&self) -> Keys<'_, K> {
        Keys(self.iter())
    }

    /// Reset to empty. Drops every stored key and keeps the allocation.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::Empty;
        }
        self.key_count = 0;
        self.occupied_count = 0;
    }
}

impl<K: Hash + Eq> ValueIntMap<K> {
    pub fn contains_key(&self, key: Option<&K>) -> bool {
        self.find_slot(self.hash_key(key), key).is_some()
    }

    /// Value stored for `key`, or `default` when absent.
    pub fn get(&self, key: Option<&K>, default: i32) -> i32 {
        match self.find_slot(self.hash_key(key), key) {
            Some(slot) => self.values[slot],
            None => default,
        }
    }

    /// Value stored for `key`. The caller contract guarantees presence;
    /// an absent key is a defect in the caller, not a recoverable
    /// condition.
    ///
    /// # Panics
    ///
    /// If `key` is absent.
    pub fn get_existing(&self, key: Option<&K>) -> i32 {
        match self.find_slot(self.hash_key(key), key) {
            Some(slot) => self.values[slot],
            None => panic!("get_existing called for an absent key"),
        }
    }

    /// Insert `key` with `value`, overwriting any previous value.
    pub fn put(&mut self, key: Option<K>, value: i32) {
        let hash = self.hash_key(key.as_ref());
        let slot = match self.find_slot(hash, key.as_ref()) {
            Some(slot) => slot,
            None => self.add_absent(hash, key),
        };
        self.values[slot] = value;
    }

    /// Return the canonical stored key equal to `key`, inserting it with
    /// value 0 first when absent. Deduplicates equal-but-distinct key
    /// instances: interning two equal keys returns the same stored
    /// instance, and the map grows by one entry at most.
    pub fn intern(&mut self, key: Option<K>) -> Option<&K> {
        let hash = self.hash_key(key.as_ref());
        let slot = match self.find_slot(hash, key.as_ref()) {
            Some(slot) => slot,
            None => {
                let slot = self.add_absent(hash, key);
                self.values[slot] = 0;
                slot
            }
        };
        match &self.slots[slot] {
            Slot::Null => None,
            Slot::Key(stored) => Some(stored),
            Slot::Empty | Slot::Deleted => unreachable!("interned slot is not live"),
        }
    }

    /// Remove `key` if present, leaving a tombstone. Tombstones still
    /// count toward the growth threshold and are only dropped by a
    /// rehash.
    pub fn remove(&mut self, key: Option<&K>) {
        let hash = self.hash_key(key);
        if let Some(slot) = self.find_slot(hash, key) {
            self.slots[slot] = Slot::Deleted;
            self.key_count -= 1;
        }
    }

    fn hash_key(&self, key: Option<&K>) -> u32 {
        match key {
            None => NULL_KEY_HASH,
            Some(key) => {
                let hash = self.hasher.hash_one(key);
                (hash ^ (hash >> 32)) as u32
            }
        }
    }

    /// Slot holding `key`, or `None`. Probing skips tombstones and stops
    /// at the first empty slot; a live slot is a hit when its cached hash
    /// matches and the keys compare equal.
    fn find_slot(&self, hash: u32, key: Option<&K>) -> Option<usize> {
        if self.slots.is_empty() {
            return None;
        }
        let fraction = table::fraction(hash);
        let mask = (1usize << self.power) - 1;
        let mut slot = table::home_slot(fraction, self.power);
        let mut step = 0;
        let mut probed = 0;
        loop {
            match &self.slots[slot] {
                Slot::Empty => return None,
                Slot::Deleted => {}
                Slot::Null => {
                    if key.is_none() {
                        return Some(slot);
                    }
                }
                Slot::Key(stored) => {
                    if let Some(key) = key
                        && self.hashes[slot] == hash
                        && stored == key
                    {
                        return Some(slot);
                    }
                }
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

    /// Insert a key known to be absent, growing or compacting first when
    /// the table is over the occupancy threshold. The first tombstone
    /// along the probe sequence is revived in preference to a fresh empty
    /// slot. Returns the slot; the caller writes the value.
    fn add_absent(&mut self, hash: u32, key: Option<K>) -> usize {
        if self.slots.is_empty() {
            self.allocate(self.power);
        } else if table::over_occupied(self.occupied_count, self.power) {
            self.rehash();
        }
        let fraction = table::fraction(hash);
        let mask = (1usize << self.power) - 1;
        let mut slot = table::home_slot(fraction, self.power);
        let mut step = 0;
        let mut first_deleted = None;
        let mut probed = 0;
        while !matches!(self.slots[slot], Slot::Empty) {
            if matches!(self.slots[slot], Slot::Deleted) && first_deleted.is_none() {
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
        self.slots[slot] = match key {
            None => Slot::Null,
            Some(key) => Slot::Key(key),
        };
        self.hashes[slot] = hash;
        self.key_count += 1;
        slot
    }

    fn allocate(&mut self, power: u32) {
        let capacity = 1usize << power;
        self.power = power;
        self.slots = core::iter::repeat_with(|| Slot::Empty)
            .take(capacity)
            .collect();
        self.values = vec![0; capacity].into_boxed_slice();
        self.hashes = vec![0; capacity].into_boxed_slice();
    }

    /// Rebuild the table: double the capacity when at least half of the
    /// occupied slots are live, otherwise keep the capacity and only drop
    /// the tombstones. Every live key is reinserted via its cached hash.
    fn rehash(&mut self) {
        let new_power = if self.key_count * 2 >= self.occupied_count {
            self.power + 1
        } else {
            self.power
        };
        let old_slots = core::mem::take(&mut self.slots);
        let old_values = core::mem::take(&mut self.values);
        let old_hashes = core::mem::take(&mut self.hashes);
        self.allocate(new_power);
        self.key_count = 0;
        self.occupied_count = 0;
        for (i, old_slot) in old_slots.into_vec().into_iter().enumerate() {
            let key = match old_slot {
                Slot::Empty | Slot::Deleted => continue,
                Slot::Null => None,
                Slot::Key(key) => Some(key),
            };
            let slot = self.insert_fresh(old_hashes[i], key);
            self.values[slot] = old_values[i];
        }
    }

    /// Insert into a table known to contain no tombstones and to have
    /// room.
    fn insert_fresh(&mut self, hash: u32, key: Option<K>) -> usize {
        let fraction = table::fraction(hash);
        let mask = (1usize << self.power) - 1;
        let mut slot = table::home_slot(fraction, self.power);
        let mut step = 0;
        while !matches!(self.slots[slot], Slot::Empty) {
            if step == 0 {
                step = table::probe_step(fraction, self.power);
            }
            slot = (slot + step) & mask;
        }
        self.slots[slot] = match key {
            None => Slot::Null,
            Some(key) => Slot::Key(key),
        };
        self.hashes[slot] = hash;
        self.key_count += 1;
        self.occupied_count += 1;
        slot
    }
}

/// Iterator over the live entries of a [ValueIntMap] as
/// `(Option<&K>, i32)` pairs.
#[derive(Debug)]
pub struct Iter<'a, K> {
    map: &'a ValueIntMap<K>,
    slot: usize,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = (Option<&'a K>, i32);

    fn next(&mut self) -> Option<Self::Item> {
        while self.slot < self.map.slots.len() {
            let slot = self.slot;
            self.slot += 1;
            match &self.map.slots[slot] {
                Slot::Null => return Some((None, self.map.values[slot])),
                Slot::Key(key) => return Some((Some(key), self.map.values[slot])),
                Slot::Empty | Slot::Deleted => {}
            }
        }
        None
    }
}

/// Iterator over the live keys of a [ValueIntMap].
#[derive(Debug)]
pub struct Keys<'a, K>(Iter<'a, K>);

impl<'a, K> Iterator for Keys<'a, K> {
    type Item = Option<&'a K>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(key, _)| key)
    }
}
