// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hash arithmetic shared by the open-addressed maps.
//!
//! Both maps use the same scheme: a power-of-two table, a multiplicative
//! (golden-ratio) hash selecting the home slot from the top bits, and a
//! probe step derived from a different slice of the same product. The
//! step is forced odd, so with a power-of-two table the probe sequence
//! visits every slot before repeating.

/// Fractional part of the golden ratio in 32 bits.
const GOLDEN_RATIO: u32 = 0x9E37_79B9;

/// Smallest table power ever used; `1 << MIN_POWER` slots.
pub(crate) const MIN_POWER: u32 = 2;

/// Occupancy threshold: rehash once occupied slots (live plus tombstones)
/// reach three quarters of capacity.
#[inline]
pub(crate) fn over_occupied(occupied_count: usize, power: u32) -> bool {
    occupied_count * 4 >= (1usize << power) * 3
}

/// Spread a hash over the whole 32-bit range.
#[inline]
pub(crate) fn fraction(hash: u32) -> u32 {
    hash.wrapping_mul(GOLDEN_RATIO)
}

/// Home slot for a multiplied hash: the top `power` bits.
#[inline]
pub(crate) fn home_slot(fraction: u32, power: u32) -> usize {
    (fraction >> (32 - power)) as usize
}

/// Collision step for a multiplied hash: a lower slice of the product,
/// masked to the table and forced odd.
#[inline]
pub(crate) fn probe_step(fraction: u32, power: u32) -> usize {
    let mask = (1usize << power) - 1;
    let shift = 32i32 - 2 * power as i32;
    if shift >= 0 {
        (((fraction >> shift) as usize) & mask) | 1
    } else {
        ((fraction as usize) & (mask >> -shift)) | 1
    }
}

/// Table power for an expected key count: the smallest power whose
/// capacity keeps `hint` keys under the occupancy threshold.
pub(crate) fn power_for_hint(key_count_hint: usize) -> u32 {
    let minimal_capacity = key_count_hint * 4 / 3;
    let mut power = MIN_POWER;
    while (1usize << power) < minimal_capacity {
        power += 1;
    }
    power
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_step_is_odd() {
        for power in MIN_POWER..=20 {
            for hash in [0u32, 1, 7, 0xDEAD_BEEF, u32::MAX, GOLDEN_RATIO] {
                let step = probe_step(fraction(hash), power);
                assert_eq!(step & 1, 1);
                assert!(step < (1usize << power));
            }
        }
    }

    #[test]
    fn probe_sequence_covers_table() {
        // An odd step in a power-of-two table is a full cycle: starting
        // anywhere, every slot is reached before any repeats.
        let power = 4;
        let capacity = 1usize << power;
        let mask = capacity - 1;
        let f = fraction(12345);
        let step = probe_step(f, power);
        let mut slot = home_slot(f, power);
        let mut seen = vec![false; capacity];
        for _ in 0..capacity {
            assert!(!seen[slot]);
            seen[slot] = true;
            slot = (slot + step) & mask;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn home_slot_in_range() {
        for power in MIN_POWER..=16 {
            for hash in [0u32, 1, 0x8000_0000, u32::MAX] {
                assert!(home_slot(fraction(hash), power) < (1usize << power));
            }
        }
    }

    #[test]
    fn hint_sizing() {
        assert_eq!(power_for_hint(0), MIN_POWER);
        assert_eq!(power_for_hint(3), MIN_POWER);
        // 64 keys want at least 85 slots, so a 128-slot table.
        assert_eq!(power_for_hint(64), 7);
    }

    #[test]
    fn occupancy_threshold() {
        // A 4-slot table tolerates 2 occupied slots, not 3.
        assert!(!over_occupied(2, 2));
        assert!(over_occupied(3, 2));
        // A 16-slot table tolerates 11, not 12.
        assert!(!over_occupied(11, 4));
        assert!(over_occupied(12, 4));
    }
}
