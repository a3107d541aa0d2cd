// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;

/// Number of elements a [CompactVec] stores inline before touching the
/// heap.
pub const INLINE_CAPACITY: usize = 5;

/// A resizable sequence that keeps its first five elements inline.
///
/// Call frames and argument lists are overwhelmingly short, so the first
/// [INLINE_CAPACITY] elements live directly in the struct; a heap-backed
/// spill array is allocated only when a sixth element arrives, seeded at
/// twice the inline capacity and doubling from there. The vector also
/// serves as a stack (`push`/`pop`/`peek`) and can be sealed into a
/// permanently read-only view, e.g. for a cached argument list.
///
/// ## Example
///
/// ```rust
/// use compact_collections::CompactVec;
///
/// let mut args = CompactVec::new();
/// args.push("this").unwrap();
/// args.push("callee").unwrap();
/// assert_eq!(args.pop(), Ok("callee"));
/// args.seal();
/// assert!(args.push("later").is_err());
/// assert_eq!(args.get(0), Ok(&"this"));
/// ```
#[derive(Debug)]
pub struct CompactVec<T> {
    len: usize,
    sealed: bool,
    inline: [Option<T>; INLINE_CAPACITY],
    /// Elements at logical indices `>= INLINE_CAPACITY`. Stays
    /// unallocated until the inline slots overflow.
    spill: Vec<T>,
}

impl<T> Default for CompactVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CompactVec<T> {
    /// Create an empty vector. Allocates nothing.
    pub fn new() -> Self {
        Self {
            len: 0,
            sealed: false,
            inline: [const { None }; INLINE_CAPACITY],
            spill: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Irreversibly mark the vector read-only. Idempotent. Every mutating
    /// operation afterwards fails with [Error::Sealed]; reads keep
    /// working.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Reference to the element at `index`.
    pub fn get(&self, index: usize) -> Result<&T, Error> {
        self.check_index(index)?;
        Ok(self.slot(index))
    }

    /// Overwrite the element at `index`.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), Error> {
        self.check_mutable()?;
        self.check_index(index)?;
        if index < INLINE_CAPACITY {
            self.inline[index] = Some(value);
        } else {
            self.spill[index - INLINE_CAPACITY] = value;
        }
        Ok(())
    }

    /// Append at the tail.
    pub fn push(&mut self, value: T) -> Result<(), Error> {
        self.check_mutable()?;
        if self.len < INLINE_CAPACITY {
            self.inline[self.len] = Some(value);
        } else {
            self.seed_spill();
            self.spill.push(value);
        }
        self.len += 1;
        Ok(())
    }

    /// Insert at `index`, valid for `0..=len`, shifting every element at
    /// or after it one position toward the tail. When the insertion point
    /// is inline and the inline slots are full, the fifth element is
    /// carried over into the front of the spill array.
    pub fn insert(&mut self, index: usize, value: T) -> Result<(), Error> {
        self.check_mutable()?;
        if index > self.len {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        if index >= INLINE_CAPACITY {
            self.seed_spill();
            self.spill.insert(index - INLINE_CAPACITY, value);
        } else {
            let occupied_inline = self.len.min(INLINE_CAPACITY);
            let top = if occupied_inline == INLINE_CAPACITY {
                let carried = self.take_inline(INLINE_CAPACITY - 1);
                self.seed_spill();
                self.spill.insert(0, carried);
                INLINE_CAPACITY - 1
            } else {
                occupied_inline
            };
            for j in (index..top).rev() {
                self.inline[j + 1] = self.inline[j].take();
            }
            self.inline[index] = Some(value);
        }
        self.len += 1;
        Ok(())
    }

    /// Remove and return the element at `index`, shifting every later
    /// element one position toward the head (the inverse of `insert`).
    pub fn remove(&mut self, index: usize) -> Result<T, Error> {
        self.check_mutable()?;
        self.check_index(index)?;
        let removed = if index >= INLINE_CAPACITY {
            self.spill.remove(index - INLINE_CAPACITY)
        } else {
            let removed = self.take_inline(index);
            let top = self.len.min(INLINE_CAPACITY);
            for j in index + 1..top {
                self.inline[j - 1] = self.inline[j].take();
            }
            if self.len > INLINE_CAPACITY {
                // The first spill element becomes the new fifth.
                self.inline[INLINE_CAPACITY - 1] = Some(self.spill.remove(0));
            }
            removed
        };
        self.len -= 1;
        Ok(removed)
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Result<T, Error> {
        self.check_mutable()?;
        if self.len == 0 {
            return Err(Error::Empty);
        }
        let value = if self.len > INLINE_CAPACITY {
            match self.spill.pop() {
                Some(value) => value,
                None => unreachable!("spill storage out of sync with length"),
            }
        } else {
            self.take_inline(self.len - 1)
        };
        self.len -= 1;
        Ok(value)
    }

    /// Reference to the last element without removing it. Works on sealed
    /// vectors.
    pub fn peek(&self) -> Result<&T, Error> {
        if self.len == 0 {
            return Err(Error::Empty);
        }
        Ok(self.slot(self.len - 1))
    }

    /// Reset to zero length, dropping every held value so no references
    /// are retained. The spill allocation is kept for reuse.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.check_mutable()?;
        for slot in &mut self.inline {
            *slot = None;
        }
        self.spill.clear();
        self.len = 0;
        Ok(())
    }

    /// In-order iterator over the live elements.
    pub fn iter(&self) -> CompactVecIter<'_, T> {
        CompactVecIter {
            vec: self,
            front: 0,
        }
    }

    fn check_index(&self, index: usize) -> Result<(), Error> {
        if index >= self.len {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        Ok(())
    }

    fn check_mutable(&self) -> Result<(), Error> {
        if self.sealed {
            return Err(Error::Sealed);
        }
        Ok(())
    }

    /// Resolve a logical index the caller has already bounds-checked.
    fn slot(&self, index: usize) -> &T {
        if index < INLINE_CAPACITY {
            match &self.inline[index] {
                Some(value) => value,
                None => unreachable!("live inline slot is empty"),
            }
        } else {
            &self.spill[index - INLINE_CAPACITY]
        }
    }

    fn take_inline(&mut self, index: usize) -> T {
        match self.inline[index].take() {
            Some(value) => value,
            None => unreachable!("live inline slot is empty"),
        }
    }

    /// First spill allocation is seeded at twice the inline capacity;
    /// `Vec` doubles from there, keeping pushes amortized O(1).
    fn seed_spill(&mut self) {
        if self.spill.capacity() == 0 {
            self.spill.reserve_exact(2 * INLINE_CAPACITY);
        }
    }
}

impl<T: PartialEq> CompactVec<T> {
    /// Index of the first element equal to `value`, or `None`.
    pub fn index_of(&self, value: &T) -> Option<usize> {
        (0..self.len).find(|&i| self.slot(i) == value)
    }

    /// Index of the last element equal to `value`, or `None`.
    pub fn last_index_of(&self, value: &T) -> Option<usize> {
        (0..self.len).rev().find(|&i| self.slot(i) == value)
    }
}

impl<T: Clone> CompactVec<T> {
    /// Copy the live elements, in order, into a freshly allocated vector
    /// sized exactly `len`.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len);
        out.extend(self.iter().cloned());
        out
    }

    /// Copy the live elements, in order, into `dest` starting at
    /// `offset`. Fails without writing anything when the destination
    /// window does not fit.
    pub fn copy_into(&self, dest: &mut [T], offset: usize) -> Result<(), Error> {
        if offset > dest.len() || dest.len() - offset < self.len {
            return Err(Error::IndexOutOfBounds {
                index: offset,
                len: dest.len(),
            });
        }
        for (i, value) in self.iter().enumerate() {
            dest[offset + i] = value.clone();
        }
        Ok(())
    }
}

impl<'a, T> IntoIterator for &'a CompactVec<T> {
    type Item = &'a T;
    type IntoIter = CompactVecIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order borrowing iterator over a [CompactVec].
#[derive(Debug)]
pub struct CompactVecIter<'a, T> {
    vec: &'a CompactVec<T>,
    front: usize,
}

impl<'a, T> Iterator for CompactVecIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.vec.len {
            return None;
        }
        let value = self.vec.slot(self.front);
        self.front += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.vec.len - self.front;
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for CompactVecIter<'_, T> {}
