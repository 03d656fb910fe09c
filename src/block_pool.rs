//! Thread-safe fixed-capacity pool of Raw Block buffers.
//!
//! # Design
//!
//! - **Fixed capacity**: all buffers are allocated upfront; acquire and
//!   release never allocate.
//! - **Single lock-free queue**: the splitter is the only acquirer and
//!   workers are the releasers, so there is no per-thread affinity worth
//!   exploiting. `ArrayQueue` gives CAS-based push/pop.
//! - **RAII handles**: a [`BlockHandle`] returns its buffer on drop, so a
//!   buffer can only be reused after the worker that scanned it lets go.
//! - **Typed**: handles hand out `&[u8]`/`&mut [u8]` directly; there is no
//!   opaque storage or downcast.
//!
//! # Correctness Invariants
//!
//! - **Leak-free**: every handle drop returns its buffer.
//! - **No double-release**: a push that overflows the queue panics, because
//!   it can only mean accounting is broken.
//! - `available() == capacity()` whenever no handle is alive.

use std::sync::Arc;

use crossbeam_queue::ArrayQueue;

use crate::error::CountError;
use crate::stdx::try_zeroed_slice;

/// Configuration for a [`BlockPool`].
#[derive(Clone, Copy, Debug)]
pub struct BlockPoolConfig {
    /// Size of each buffer in bytes.
    pub buffer_len: usize,
    /// Number of buffers; bounds peak memory at `total_buffers * buffer_len`.
    pub total_buffers: usize,
}

impl BlockPoolConfig {
    /// Validate configuration. Panics on invalid values.
    pub fn validate(&self) {
        assert!(self.buffer_len > 0, "buffer_len must be > 0");
        assert!(self.total_buffers > 0, "total_buffers must be > 0");
    }

    /// Total peak memory usage in bytes.
    #[inline]
    pub fn peak_memory_bytes(&self) -> usize {
        self.total_buffers.saturating_mul(self.buffer_len)
    }
}

struct Inner {
    buffer_len: usize,
    capacity: usize,
    free: ArrayQueue<Box<[u8]>>,
}

/// Fixed-capacity pool of equally sized byte buffers.
///
/// `Clone` creates another handle to the same inventory.
#[derive(Clone)]
pub struct BlockPool {
    inner: Arc<Inner>,
}

impl BlockPool {
    /// Creates a pool and allocates every buffer immediately.
    ///
    /// # Errors
    ///
    /// [`CountError::Alloc`] if any buffer cannot be allocated; buffers
    /// already allocated are freed.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid (see [`BlockPoolConfig::validate`]).
    pub fn new(cfg: BlockPoolConfig) -> Result<Self, CountError> {
        cfg.validate();

        let free = ArrayQueue::new(cfg.total_buffers);
        for _ in 0..cfg.total_buffers {
            // SAFETY: zero is a valid `u8`.
            let buf = unsafe { try_zeroed_slice::<u8>(cfg.buffer_len) }.ok_or(
                CountError::Alloc {
                    bytes: cfg.buffer_len,
                },
            )?;
            if free.push(buf).is_err() {
                unreachable!("free queue sized to total_buffers");
            }
        }

        Ok(Self {
            inner: Arc::new(Inner {
                buffer_len: cfg.buffer_len,
                capacity: cfg.total_buffers,
                free,
            }),
        })
    }

    /// Size of each buffer in bytes.
    #[inline]
    pub fn buffer_len(&self) -> usize {
        self.inner.buffer_len
    }

    /// Total number of buffers owned by the pool.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Buffers currently sitting in the pool. A snapshot; may be stale.
    #[inline]
    pub fn available(&self) -> usize {
        self.inner.free.len()
    }

    /// Non-blocking acquire. Returns `None` only when every buffer is out.
    #[inline]
    pub fn try_acquire(&self) -> Option<BlockHandle> {
        self.inner.free.pop().map(|buf| BlockHandle {
            pool: self.clone(),
            buf: Some(buf),
        })
    }

    /// Acquire, reporting exhaustion as an error.
    ///
    /// Callers size the pool so that upstream backpressure makes exhaustion
    /// impossible; hitting it means the sizing contract was broken.
    #[inline]
    pub fn acquire(&self) -> Result<BlockHandle, CountError> {
        self.try_acquire().ok_or(CountError::PoolExhausted {
            capacity: self.inner.capacity,
        })
    }

    fn release(&self, buf: Box<[u8]>) {
        debug_assert_eq!(buf.len(), self.inner.buffer_len);
        if self.inner.free.push(buf).is_err() {
            panic!("block pool overflow (double release or accounting bug)");
        }
    }
}

/// RAII handle to a pooled buffer, returned to the pool on drop.
///
/// The handle exposes the whole buffer; callers track how much of it is
/// filled (see [`LineChunk`](crate::splitter::LineChunk)). Stale bytes from
/// a previous use are visible past the filled length.
pub struct BlockHandle {
    pool: BlockPool,
    buf: Option<Box<[u8]>>,
}

impl BlockHandle {
    /// Shared view of the entire buffer.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or_default()
    }

    /// Mutable view of the entire buffer.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or_default()
    }

    /// Buffer length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// True only for a zero-length buffer, which the pool never creates.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Address of the backing allocation, for reuse checks.
    #[inline]
    pub fn ptr_usize(&self) -> usize {
        self.as_slice().as_ptr() as usize
    }
}

impl Drop for BlockHandle {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}
