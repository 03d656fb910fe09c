//! Parallel counter of distinct IPv4 addresses in large line-delimited files.
//!
//! ## Scope
//! The input is a text file with one dotted-quad address per line, possibly
//! much larger than memory. The crate returns the exact number of distinct
//! addresses, reading the file once, in parallel, without ever splitting a
//! line between two work units.
//!
//! ## Key invariants
//! - The splitter emits chunks holding whole lines only, in file order;
//!   concatenating them reproduces the input byte for byte.
//! - Presence is recorded with an atomic `fetch_or` per 64-bit word, so
//!   concurrent workers never lose each other's bits.
//! - Each run owns a fresh Presence Set; nothing leaks between runs.
//! - The final count is taken only after every worker has joined.
//! - A run returns either a count or the first fatal error, never both.
//!
//! ## Pipeline flow
//! `Path -> ChunkSource -> LineSplitter -> bounded queue -> workers -> PresenceSet -> count`
//!
//! ## Notable entry points
//! - [`count_unique`]: the plain `(path, workers, buffer_mib, use_mmap)` call.
//! - [`count_unique_with`] / [`CountConfig`]: full configuration with a
//!   [`CountReport`].
//! - [`count_source`]: run the pipeline over any [`ChunkSource`].
//! - [`LineSplitter`], [`PresenceSet`], [`parse_address_key`]: the stages on
//!   their own.

#[cfg(not(target_pointer_width = "64"))]
compile_error!("ipv4-counter indexes the full u32 key space and requires a 64-bit target");

pub mod address;
pub mod block_pool;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod presence;
pub mod source;
pub mod splitter;
pub mod stdx;
#[cfg(test)]
pub mod test_utils;
pub mod worker;

pub use address::{fold_address_key, key_for_line, parse_address_key, AddressKey};
pub use block_pool::{BlockHandle, BlockPool, BlockPoolConfig};
pub use config::{CountConfig, IoMode, MalformedPolicy};
pub use error::CountError;
pub use pipeline::{
    count_source, count_unique, count_unique_cancellable, count_unique_with, CancelFlag,
    CountReport,
};
pub use presence::PresenceSet;
pub use source::{BufferedSource, ChunkSource, MappedSource};
pub use splitter::{LineChunk, LineSplitter, SplitStats};
pub use worker::{LineRules, WorkerMetrics};
