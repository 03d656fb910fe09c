//! Lock-free [`AtomicBitSet`] with atomic test-and-set for concurrent dedup.
//!
//! # Invariants
//! - Bits are stored in `AtomicU64` words; padding bits beyond the logical
//!   capacity are zero (maintained by never setting them).
//! - `words.len() == words_for_bits(bit_length)`.
//!
//! # Ordering
//! All atomic operations use `Relaxed` ordering. `fetch_or` atomicity is what
//! prevents lost updates between bits sharing a word; readers that need a
//! complete view (`count`) must first join every writer, and the join itself
//! provides the happens-before edge.
//!
//! # Allocation
//! The backing words come from a zeroed allocation, so the OS only commits
//! pages that are actually written. A set spanning the full `u32` range
//! reserves 512 MiB of address space but touches a fraction of it for
//! clustered keys.

#[cfg(loom)]
use loom::sync::atomic::{AtomicU64, Ordering};
#[cfg(not(loom))]
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of `u64` words needed to hold `bits` bits.
#[inline]
pub const fn words_for_bits(bits: usize) -> usize {
    bits.div_ceil(64)
}

/// Lock-free bitset backed by a boxed slice of `AtomicU64`.
///
/// Designed for concurrent deduplication where multiple threads race to
/// claim bits via [`test_and_set`](Self::test_and_set). The atomic
/// `fetch_or` guarantees exactly one caller observes `true` (was-unset)
/// per bit, and that concurrent writers to neighbouring bits of the same
/// word never clobber each other.
///
/// # Examples
///
/// ```
/// use ipv4_counter::stdx::atomic_bitset::AtomicBitSet;
///
/// let bits = AtomicBitSet::empty(128);
/// assert!(bits.test_and_set(42));   // first caller wins
/// assert!(!bits.test_and_set(42));  // second caller loses
/// assert!(bits.is_set(42));
/// assert_eq!(bits.count(), 1);
/// ```
pub struct AtomicBitSet {
    words: Box<[AtomicU64]>,
    bit_length: usize,
}

impl std::fmt::Debug for AtomicBitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicBitSet")
            .field("bit_length", &self.bit_length)
            .field("words_len", &self.words.len())
            .finish()
    }
}

impl AtomicBitSet {
    /// Creates an empty bitset with capacity for `bit_length` bits, all
    /// initialized to zero.
    ///
    /// # Panics
    ///
    /// Panics if `bit_length` is zero (a zero-capacity bitset has no
    /// valid indices and is always a bug at the call site), or if the
    /// allocation fails. Use [`try_empty`](Self::try_empty) for sets large
    /// enough that failure is a runtime condition.
    pub fn empty(bit_length: usize) -> Self {
        match Self::try_empty(bit_length) {
            Some(bits) => bits,
            None => panic!("AtomicBitSet: allocation of {bit_length} bits failed"),
        }
    }

    /// Like [`empty`](Self::empty), returning `None` when the backing words
    /// cannot be allocated.
    ///
    /// # Panics
    ///
    /// Panics if `bit_length` is zero.
    pub fn try_empty(bit_length: usize) -> Option<Self> {
        assert!(bit_length > 0, "AtomicBitSet requires bit_length > 0");
        let words = zeroed_words(words_for_bits(bit_length))?;
        Some(Self { words, bit_length })
    }

    /// Atomically sets bit `idx` and returns `true` if it was previously unset.
    ///
    /// This is the core dedup primitive: exactly one concurrent caller per bit
    /// will observe `true`.
    ///
    /// # Panics
    ///
    /// Panics (debug) if `idx >= bit_length`.
    #[inline(always)]
    pub fn test_and_set(&self, idx: usize) -> bool {
        debug_assert!(idx < self.bit_length, "bit index out of bounds");
        let mask = 1u64 << (idx % 64);
        let word = &self.words[idx / 64];
        // Skip the RMW when the bit is already visible; duplicate-heavy
        // inputs otherwise bounce the cache line between writers.
        if word.load(Ordering::Relaxed) & mask != 0 {
            return false;
        }
        let prev = word.fetch_or(mask, Ordering::Relaxed);
        (prev & mask) == 0
    }

    /// Returns whether bit `idx` is set.
    ///
    /// # Panics
    ///
    /// Panics (debug) if `idx >= bit_length`.
    #[inline(always)]
    pub fn is_set(&self, idx: usize) -> bool {
        debug_assert!(idx < self.bit_length, "bit index out of bounds");
        let mask = 1u64 << (idx % 64);
        (self.words[idx / 64].load(Ordering::Relaxed) & mask) != 0
    }

    /// Returns the number of addressable bits.
    #[inline]
    pub fn bit_length(&self) -> usize {
        self.bit_length
    }

    /// Counts the number of set bits.
    ///
    /// Because loads are `Relaxed`, the result is a snapshot unless every
    /// writer has been joined.
    pub fn count(&self) -> u64 {
        let (last, body) = match self.words.split_last() {
            Some(split) => split,
            None => return 0,
        };

        let mut total: u64 = body
            .iter()
            .map(|w| u64::from(w.load(Ordering::Relaxed).count_ones()))
            .sum();

        let remaining_bits = self.bit_length % 64;
        let last_mask = if remaining_bits == 0 {
            u64::MAX
        } else {
            (1u64 << remaining_bits) - 1
        };
        total += u64::from((last.load(Ordering::Relaxed) & last_mask).count_ones());
        total
    }
}

#[cfg(not(loom))]
fn zeroed_words(num_words: usize) -> Option<Box<[AtomicU64]>> {
    // SAFETY: the all-zero pattern is a valid `AtomicU64` (value 0).
    unsafe { crate::stdx::zeroed::try_zeroed_slice::<AtomicU64>(num_words) }
}

#[cfg(loom)]
fn zeroed_words(num_words: usize) -> Option<Box<[AtomicU64]>> {
    Some((0..num_words).map(|_| AtomicU64::new(0)).collect())
}

// ---------------------------------------------------------------------------
// Test module includes
// ---------------------------------------------------------------------------

#[cfg(any(all(test, feature = "stdx-proptest"), kani))]
#[path = "atomic_bitset_tests.rs"]
mod atomic_bitset_tests;

// ---------------------------------------------------------------------------
// Loom concurrency tests
// ---------------------------------------------------------------------------

#[cfg(loom)]
mod loom_tests {
    use super::*;
    use loom::thread;

    /// Two threads race on the same bit; exactly one must win.
    #[test]
    fn concurrent_dedup() {
        loom::model(|| {
            let bs = std::sync::Arc::new(AtomicBitSet::empty(64));
            let bs2 = bs.clone();

            let h = thread::spawn(move || bs2.test_and_set(0));

            let won_main = bs.test_and_set(0);
            let won_thread = h.join().unwrap();

            assert!(
                won_main ^ won_thread,
                "exactly one caller must win: main={won_main}, thread={won_thread}"
            );
            assert!(bs.is_set(0));
        });
    }

    /// Two threads set different bits in the same word; both must be visible.
    #[test]
    fn no_lost_updates_same_word() {
        loom::model(|| {
            let bs = std::sync::Arc::new(AtomicBitSet::empty(64));
            let bs2 = bs.clone();

            let h = thread::spawn(move || {
                assert!(bs2.test_and_set(1));
            });

            assert!(bs.test_and_set(0));
            h.join().unwrap();

            assert!(bs.is_set(0));
            assert!(bs.is_set(1));
            assert_eq!(bs.count(), 2);
        });
    }
}
