//! Small, self-contained data structures used across the project.

pub mod atomic_bitset;
pub mod zeroed;

pub use atomic_bitset::{words_for_bits, AtomicBitSet};
pub use zeroed::try_zeroed_slice;
