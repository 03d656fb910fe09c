//! Line-Boundary Splitter: Raw Blocks in, whole-line chunks out.
//!
//! Each emitted [`LineChunk`] is a pooled buffer laid out as
//!
//! ```text
//! [ remainder from previous block | new bytes up to and including last '\n' ]
//! ```
//!
//! so downstream workers never see a record split across two chunks.
//!
//! # Algorithm (per block, strictly sequential)
//! 1. Acquire a pooled buffer, copy the carried remainder to its front.
//! 2. Read up to `block_len` new bytes behind it.
//! 3. Find the last `'\n'` among the new bytes (the remainder never holds
//!    one). If found, emit everything up to and including it and copy the
//!    tail into the splitter-owned remainder.
//! 4. If the block has no terminator at all, the whole buffer becomes the
//!    remainder and nothing is emitted; the line keeps growing across
//!    blocks until it ends or exceeds `max_record_len`.
//! 5. At end of stream a non-empty remainder is emitted as a final chunk
//!    holding one unterminated line.
//!
//! # Invariants
//! - Concatenating emitted chunks in order reproduces the stream exactly.
//! - Every chunk except possibly the last ends with `'\n'`.
//! - The remainder never contains `'\n'` and never exceeds `max_record_len`.
//! - The splitter only rejects lines it would have to carry. Over-long lines
//!   that fit inside one block are emitted and rejected by the workers
//!   ([`scan_lines`](crate::worker::scan_lines)) against the same cap, so
//!   the outcome does not depend on where block edges fall.
//! - The remainder is an owned copy; the pooled buffer it came from can be
//!   recycled as soon as its chunk is dropped.

use std::ops::ControlFlow;

use memchr::memrchr;

use crate::block_pool::{BlockHandle, BlockPool};
use crate::error::CountError;
use crate::pipeline::CancelFlag;
use crate::source::ChunkSource;

/// A pooled buffer holding zero or more complete lines.
///
/// Dropping the chunk returns its buffer to the pool.
pub struct LineChunk {
    buf: BlockHandle,
    len: usize,
    offset: u64,
}

impl LineChunk {
    /// The filled bytes: whole lines only (the final chunk of a stream may
    /// end in one unterminated line).
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buf.as_slice()[..self.len]
    }

    /// Filled length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the chunk carries no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stream offset of `data()[0]`.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Counters for one splitter run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SplitStats {
    /// Raw Blocks read from the source (excluding the final empty read).
    pub blocks: u64,
    /// Line Chunks emitted.
    pub chunks: u64,
    /// Bytes read from the source.
    pub bytes: u64,
}

/// Stateful splitter; owns the Leftover Remainder between reads.
#[derive(Debug)]
pub struct LineSplitter {
    block_len: usize,
    max_record_len: usize,
    remainder: Vec<u8>,
    remainder_offset: u64,
}

impl LineSplitter {
    /// Creates a splitter reading `block_len` bytes per block and carrying
    /// at most `max_record_len` bytes of an unfinished line.
    ///
    /// # Panics
    ///
    /// Panics if either length is zero.
    pub fn new(block_len: usize, max_record_len: usize) -> Self {
        assert!(block_len > 0, "block_len must be > 0");
        assert!(max_record_len > 0, "max_record_len must be > 0");
        Self {
            block_len,
            max_record_len,
            remainder: Vec::new(),
            remainder_offset: 0,
        }
    }

    /// Pool buffer length required by this splitter: room for a full
    /// remainder plus a full block.
    #[inline]
    pub fn buffer_len(&self) -> usize {
        self.block_len.saturating_add(self.max_record_len)
    }

    /// Bytes currently carried for the next chunk.
    #[inline]
    pub fn remainder(&self) -> &[u8] {
        &self.remainder
    }

    /// Drains `source` into line chunks, handing each to `emit` in stream
    /// order.
    ///
    /// Returns early with `Ok` if `emit` breaks. Read failures, oversized
    /// records, pool exhaustion and cancellation are returned as errors; the
    /// caller is responsible for closing whatever `emit` feeds.
    pub fn run<S: ChunkSource + ?Sized>(
        &mut self,
        source: &mut S,
        pool: &BlockPool,
        cancel: &CancelFlag,
        mut emit: impl FnMut(LineChunk) -> ControlFlow<()>,
    ) -> Result<SplitStats, CountError> {
        assert!(
            pool.buffer_len() >= self.buffer_len(),
            "pool buffers ({}) smaller than block_len + max_record_len ({})",
            pool.buffer_len(),
            self.buffer_len()
        );

        let mut stats = SplitStats::default();
        self.remainder.clear();
        self.remainder_offset = source.position();

        loop {
            if cancel.is_cancelled() {
                return Err(CountError::Cancelled);
            }

            let mut handle = pool.acquire()?;
            let carried = self.remainder.len();
            let buf = handle.as_mut_slice();
            buf[..carried].copy_from_slice(&self.remainder);

            let read_offset = source.position();
            let n = source
                .read_block(&mut buf[carried..carried + self.block_len])
                .map_err(|err| CountError::read(read_offset, err))?;

            if n == 0 {
                if carried > 0 {
                    let chunk = LineChunk {
                        buf: handle,
                        len: carried,
                        offset: self.remainder_offset,
                    };
                    self.remainder.clear();
                    stats.chunks += 1;
                    // End of stream either way.
                    let _ = emit(chunk);
                }
                return Ok(stats);
            }

            stats.blocks += 1;
            stats.bytes += n as u64;
            let total = carried + n;
            let chunk_offset = self.remainder_offset;

            match memrchr(b'\n', &buf[carried..total]) {
                Some(rel) => {
                    let end = carried + rel + 1;
                    let tail_offset = chunk_offset + end as u64;
                    self.check_record(tail_offset, total - end)?;
                    self.remainder.clear();
                    self.remainder.extend_from_slice(&buf[end..total]);
                    self.remainder_offset = tail_offset;

                    stats.chunks += 1;
                    let chunk = LineChunk {
                        buf: handle,
                        len: end,
                        offset: chunk_offset,
                    };
                    if emit(chunk).is_break() {
                        return Ok(stats);
                    }
                }
                None => {
                    // No terminator: the whole buffer is one unfinished line.
                    self.check_record(chunk_offset, total)?;
                    self.remainder.clear();
                    self.remainder.extend_from_slice(&buf[..total]);
                }
            }
        }
    }

    // Checked before copying, so the remainder never grows past the cap.
    fn check_record(&self, offset: u64, len: usize) -> Result<(), CountError> {
        if len > self.max_record_len {
            return Err(CountError::RecordTooLarge {
                offset,
                len,
                max: self.max_record_len,
            });
        }
        Ok(())
    }
}
