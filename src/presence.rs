//! Presence Set: one bit per Address Key over the full `u32` space.
//!
//! Workers share the set by reference and call [`PresenceSet::mark`]
//! concurrently; each mark is a single atomic `fetch_or` on the owning word,
//! so writers touching different bits of the same word never lose updates.
//!
//! Counting takes `&mut self`. Once the worker scope has joined, the driver
//! regains exclusive access, which statically rules out a count racing an
//! in-flight mark.
//!
//! A fresh set is built for every counting run; nothing is shared between
//! runs.

use crate::address::AddressKey;
use crate::error::CountError;
use crate::stdx::AtomicBitSet;

/// Number of distinct Address Keys (2^32).
pub const KEY_SPACE_BITS: u64 = 1 << 32;

/// Dense concurrent set over every possible Address Key.
#[derive(Debug)]
pub struct PresenceSet {
    bits: AtomicBitSet,
}

impl PresenceSet {
    /// Allocates an empty set covering `[0, 2^32)`.
    ///
    /// Reserves 512 MiB of zeroed memory; pages are committed lazily as keys
    /// land in them.
    ///
    /// # Errors
    ///
    /// [`CountError::Alloc`] if the allocator refuses the reservation.
    pub fn new() -> Result<Self, CountError> {
        let bits = AtomicBitSet::try_empty(KEY_SPACE_BITS as usize).ok_or(CountError::Alloc {
            bytes: (KEY_SPACE_BITS / 8) as usize,
        })?;
        Ok(Self { bits })
    }

    /// Marks `key` present. Returns `true` if this call inserted it.
    #[inline(always)]
    pub fn mark(&self, key: AddressKey) -> bool {
        self.bits.test_and_set(key as usize)
    }

    /// Returns whether `key` has been marked.
    #[inline]
    pub fn contains(&self, key: AddressKey) -> bool {
        self.bits.is_set(key as usize)
    }

    /// Number of distinct keys marked so far.
    pub fn count(&mut self) -> u64 {
        self.bits.count()
    }
}
