// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-frame collection primitives for an interpreter.
//!
//! These structures back symbol tables, property stores, and operand
//! stacks. They are instantiated per call frame and per scope, so the
//! common small case must allocate little or nothing:
//!
//! * [CompactVec] — a resizable sequence and stack that keeps its first
//!   five elements inline in the struct, and can be sealed read-only.
//! * [ValueIntMap] — an open-addressed map from arbitrary keys (with a
//!   distinguished null key) to `i32` values, with key interning.
//! * [UintMap] — an open-addressed map from non-negative `i32` keys to a
//!   value that is either an object or an `i32`, never both.
//!
//! None of them is internally synchronized; `&mut self` on every mutating
//! operation is the whole concurrency contract.

mod compact_vec;
mod error;
mod table;
mod uint_map;
mod value_int_map;

pub use compact_vec::{CompactVec, CompactVecIter, INLINE_CAPACITY};
pub use error::Error;
pub use uint_map::UintMap;
pub use value_int_map::{Iter, Keys, ValueIntMap};
