// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Argument-contract violations reported by [CompactVec](crate::CompactVec).
///
/// These are recoverable caller errors: bounds and seal checks run before
/// any state is touched, so a failed operation leaves the collection
/// exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Index outside the valid range for the operation. Carries the
    /// attempted index and the current length.
    IndexOutOfBounds { index: usize, len: usize },
    /// Mutation attempted on a sealed collection.
    Sealed,
    /// `pop` or `peek` on a zero-length collection.
    Empty,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            }
            Error::Sealed => write!(f, "collection is sealed"),
            Error::Empty => write!(f, "collection is empty"),
        }
    }
}

impl std::error::Error for Error {}
