//! Run configuration for the counting pipeline.
//!
//! All sizing decisions (block length, queue depth, pool capacity) are
//! derived here so the pipeline itself only consumes resolved numbers.

use crate::error::CountError;

/// Bytes per MiB.
pub const MIB: usize = 1024 * 1024;

/// Default Raw Block size for buffered reads (MiB).
pub const DEFAULT_BUFFER_MIB: usize = 4;
/// Default cap on a single line carried across blocks (bytes).
///
/// A dotted quad is at most 15 bytes plus a `\r`; the slack covers noisy
/// inputs without letting a binary file grow the remainder unbounded.
pub const DEFAULT_MAX_RECORD_LEN: usize = 4096;
/// Smallest block used in mapped mode.
pub const MAPPED_BLOCK_MIN: usize = 64 * 1024;
/// Largest block used in mapped mode.
///
/// Every pooled buffer is one block plus `max_record_len`, and the pool
/// holds `queue_depth + workers + 1` of them. With the default queue depth
/// a large mapped file therefore pins up to `(2 * workers + 1) * 64 MiB` of
/// buffers (about 8 GiB at 64 workers). Set `block_len` or `queue_depth`
/// to bound it; [`CountConfig::peak_buffer_bytes`] reports the figure.
pub const MAPPED_BLOCK_MAX: usize = 64 * MIB;

const _: () = {
    assert!(MAPPED_BLOCK_MIN > 0);
    assert!(MAPPED_BLOCK_MIN <= MAPPED_BLOCK_MAX);
    assert!(DEFAULT_MAX_RECORD_LEN > 0);
};

/// File access strategy for the Chunk Source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IoMode {
    /// Sequential `read` calls into pooled buffers.
    #[default]
    Buffered,
    /// Memory-mapped file, copied block-wise with positional reads.
    Mapped,
}

/// What to do with lines that are not well-formed dotted quads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Validate each line and skip malformed ones (counted in the report).
    #[default]
    Skip,
    /// Fold every line without validation; malformed lines produce
    /// arbitrary keys.
    Fold,
}

/// Configuration for one counting run.
#[derive(Clone, Debug)]
pub struct CountConfig {
    /// Number of worker threads scanning chunks. Must be >= 1.
    pub workers: usize,
    /// Chunk Source variant.
    pub io_mode: IoMode,
    /// Raw Block size in MiB (buffered mode only).
    pub buffer_mib: usize,
    /// Explicit Raw Block size in bytes; overrides `buffer_mib` and the
    /// mapped-mode derivation when set.
    pub block_len: Option<usize>,
    /// Bounded queue capacity between splitter and workers (0 = `workers`).
    pub queue_depth: usize,
    /// Longest line the splitter may carry across block boundaries.
    pub max_record_len: usize,
    /// Malformed-line handling.
    pub malformed: MalformedPolicy,
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            io_mode: IoMode::default(),
            buffer_mib: DEFAULT_BUFFER_MIB,
            block_len: None,
            queue_depth: 0,
            max_record_len: DEFAULT_MAX_RECORD_LEN,
            malformed: MalformedPolicy::default(),
        }
    }
}

impl CountConfig {
    /// Rejects configurations that cannot run.
    pub fn validate(&self) -> Result<(), CountError> {
        if self.workers == 0 {
            return Err(CountError::invalid_config("workers must be >= 1"));
        }
        if self.block_len == Some(0) {
            return Err(CountError::invalid_config("block_len must be > 0"));
        }
        if self.block_len.is_none() && self.io_mode == IoMode::Buffered && self.buffer_mib == 0 {
            return Err(CountError::invalid_config("buffer_mib must be > 0"));
        }
        if self.max_record_len == 0 {
            return Err(CountError::invalid_config("max_record_len must be > 0"));
        }
        Ok(())
    }

    /// Effective bounded queue capacity.
    #[inline]
    pub fn effective_queue_depth(&self) -> usize {
        if self.queue_depth == 0 {
            self.workers
        } else {
            self.queue_depth
        }
    }

    /// Raw Block length for a run over a file of `file_len` bytes.
    ///
    /// Buffered mode uses the configured MiB size. Mapped mode splits the
    /// file into roughly one block per worker, clamped to
    /// `[MAPPED_BLOCK_MIN, MAPPED_BLOCK_MAX]`.
    pub fn resolve_block_len(&self, file_len: u64) -> usize {
        if let Some(len) = self.block_len {
            return len;
        }
        match self.io_mode {
            IoMode::Buffered => self.buffer_mib.saturating_mul(MIB),
            IoMode::Mapped => {
                let share = file_len.div_ceil(self.workers.max(1) as u64);
                let share = usize::try_from(share).unwrap_or(usize::MAX);
                share.clamp(MAPPED_BLOCK_MIN, MAPPED_BLOCK_MAX)
            }
        }
    }

    /// Pooled buffer count: queued chunks, chunks being scanned, and the
    /// block currently being filled.
    ///
    /// Memory scales with this count times the buffer size; see
    /// [`peak_buffer_bytes`](Self::peak_buffer_bytes).
    #[inline]
    pub fn pool_capacity(&self) -> usize {
        self.effective_queue_depth()
            .saturating_add(self.workers)
            .saturating_add(1)
    }

    /// Bytes held by the block pool for a run over `file_len` bytes.
    pub fn peak_buffer_bytes(&self, file_len: u64) -> usize {
        self.resolve_block_len(file_len)
            .saturating_add(self.max_record_len)
            .saturating_mul(self.pool_capacity())
    }
}
